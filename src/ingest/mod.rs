//! Frame sources.
//!
//! - Camera devices (feature: ingest-v4l2)
//! - Synthetic `stub://` source (testing, demo runs)
//!
//! Sources hand over RGB24 `Frame`s. A source that has nothing decoded yet
//! returns `Ok(None)`; the monitor treats that as "not ready" and retries on the
//! next tick.
//!
//! Sources MUST NOT store frames to disk or log pixel content.

pub mod camera;
#[cfg(feature = "ingest-v4l2")]
mod normalize;

use anyhow::Result;

use crate::frame::Frame;

pub use camera::{CameraConfig, CameraSource, CameraStats};

/// Anything that can produce frames for the monitor.
pub trait FrameSource {
    /// Next frame, or `None` when the source has no decoded frame yet.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Check if the source is healthy.
    fn is_healthy(&self) -> bool {
        true
    }
}

//! Captured video frames.
//!
//! - `Frame`: RGB24 pixel buffer with its dimensions. Pixels are private; pose
//!   estimators read them through [`Frame::pixels`] for the duration of one call.
//!
//! Frames are never written to disk or logged. A frame is dropped as soon as the
//! tick that produced it has been classified.

use anyhow::{anyhow, Result};
use std::time::Instant;

/// Bytes per RGB24 pixel.
pub const RGB_CHANNELS: usize = 3;

/// A single decoded frame.
///
/// No `Clone`: a frame belongs to exactly one tick.
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Monotonic sequence number assigned by the source.
    pub sequence: u64,
    captured_at: Instant,
}

impl Frame {
    /// Wrap RGB24 pixels. The buffer length must match the dimensions.
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self> {
        let expected = rgb_len(width, height)?;
        if data.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            sequence,
            captured_at: Instant::now(),
        })
    }

    /// A frame whose decoder has not reported dimensions yet.
    pub fn pending(sequence: u64) -> Self {
        Self {
            data: Vec::new(),
            width: 0,
            height: 0,
            sequence,
            captured_at: Instant::now(),
        }
    }

    /// True once the frame has non-zero dimensions.
    pub fn has_dimensions(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Read-only pixel access for estimators.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Milliseconds since capture.
    pub fn age_ms(&self) -> u128 {
        self.captured_at.elapsed().as_millis()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Pixel content is never printed.
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

/// Expected RGB24 buffer length for the given dimensions.
pub fn rgb_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(RGB_CHANNELS))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

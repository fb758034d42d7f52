//! pullwatch
//!
//! Watches a webcam feed, estimates body pose on every frame and raises a
//! desktop alert when one hand stays near the head for a sustained run of
//! frames.
//!
//! # Architecture
//!
//! Data flows linearly, one frame per tick:
//!
//! 1. **Frame source** (`ingest`): camera device or synthetic frames.
//! 2. **Pose estimator** (`detect`): black-box keypoint oracle.
//! 3. **Proximity classifier** (`proximity`): pure per-frame geometry.
//! 4. **Debounce** (`debounce`): the only cross-frame detection state.
//! 5. **Alert delivery** (`alert`): fire-and-forget channel to the host notifier.
//!
//! `monitor` drives the loop; `overlay` is an optional drawing side channel.

pub mod alert;
pub mod config;
pub mod debounce;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod monitor;
pub mod overlay;
pub mod pose;
pub mod proximity;
pub mod ui;

pub use alert::{AlertChannel, AlertSink, Notifier, RecordedAlerts, WindowHandle};
pub use debounce::{AlertEvent, DebouncePhase, DebounceState, FRAMES_THRESHOLD};
pub use detect::{PoseEstimator, ScriptedEstimator, SyntheticConfig, SyntheticEstimator};
pub use frame::Frame;
pub use ingest::{CameraConfig, CameraSource, FrameSource};
pub use monitor::{FixedTicks, Monitor, MonitorStats, PacedScheduler, TickOutcome, TickScheduler};
pub use pose::{Keypoint, KeypointName, Pose};
pub use proximity::{classify, is_hand_near_head, ProximityReport};

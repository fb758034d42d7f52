//! Pose estimation backends.
//!
//! The estimator is a black box from the monitor's point of view: a frame goes
//! in, zero or more poses come out. Backends:
//! - `scripted`: replays a fixed pose sequence (tests, `pose_replay`)
//! - `synthetic`: seeded random walk of a subject raising a hand (demo runs)
//! - `tract`: MoveNet single-pose ONNX model (feature: backend-tract)

mod backend;
mod backends;

pub use backend::PoseEstimator;
pub use backends::{ScriptedEstimator, SyntheticConfig, SyntheticEstimator};

#[cfg(feature = "backend-tract")]
pub use backends::TractMoveNet;

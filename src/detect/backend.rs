use anyhow::Result;

use crate::frame::Frame;
use crate::pose::Pose;

/// Pose estimator trait.
///
/// Implementations receive the frame's pixels for the duration of one
/// `estimate` call and must not retain them.
pub trait PoseEstimator {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// False while the model is still loading. The monitor skips the tick
    /// without touching detection state.
    fn is_ready(&self) -> bool {
        true
    }

    /// Estimate poses on a frame. Zero poses is a valid answer.
    ///
    /// Keypoint coordinates are pixels in the frame's coordinate space.
    fn estimate(&mut self, frame: &Frame) -> Result<Vec<Pose>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: PoseEstimator + ?Sized> PoseEstimator for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn estimate(&mut self, frame: &Frame) -> Result<Vec<Pose>> {
        (**self).estimate(frame)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detect::backend::PoseEstimator;
use crate::frame::Frame;
use crate::pose::{Keypoint, KeypointName, Pose};

/// Half the horizontal distance between the synthetic subject's eyes.
const HALF_EYE_GAP: f32 = 20.0;
const SHOULDER_HALF_WIDTH: f32 = 90.0;
const KEYPOINT_SCORE: f32 = 0.85;

#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub seed: u64,
    /// Frames with both hands resting.
    pub rest_frames: u32,
    /// Frames with one hand held at the head.
    pub raise_frames: u32,
    /// Uniform positional noise in pixels.
    pub jitter_px: f32,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            rest_frames: 45,
            raise_frames: 60,
            jitter_px: 2.0,
        }
    }
}

/// Generates a subject that alternately rests and raises one hand to the head.
///
/// The raised hand alternates between left and right on each cycle. Output is
/// fully determined by the seed and the frame dimensions.
pub struct SyntheticEstimator {
    config: SyntheticConfig,
    rng: StdRng,
    frame_count: u64,
}

impl SyntheticEstimator {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            frame_count: 0,
        }
    }

    fn cycle_len(&self) -> u64 {
        (self.config.rest_frames as u64 + self.config.raise_frames as u64).max(1)
    }

    /// Which wrist is raised on the given frame, if any.
    fn raised_wrist(&self, frame_index: u64) -> Option<KeypointName> {
        let cycle = frame_index / self.cycle_len();
        let offset = frame_index % self.cycle_len();
        if offset < self.config.rest_frames as u64 {
            return None;
        }
        Some(if cycle % 2 == 0 {
            KeypointName::LeftWrist
        } else {
            KeypointName::RightWrist
        })
    }

    fn jitter(&mut self) -> f32 {
        if self.config.jitter_px > 0.0 {
            self.rng
                .gen_range(-self.config.jitter_px..=self.config.jitter_px)
        } else {
            0.0
        }
    }

    fn point(&mut self, name: KeypointName, x: f32, y: f32) -> Keypoint {
        let x = x + self.jitter();
        let y = y + self.jitter();
        Keypoint::new(name, x, y, KEYPOINT_SCORE)
    }

    fn generate(&mut self, width: u32, height: u32, raised: Option<KeypointName>) -> Pose {
        let cx = width as f32 / 2.0;
        let eye_y = height as f32 * 0.4;
        let shoulder_y = height as f32 * 0.7;
        let rest_y = height as f32 * 0.95;

        let wrist = |name: KeypointName, side: f32| {
            if raised == Some(name) {
                (cx + side * 2.0 * HALF_EYE_GAP, eye_y + 10.0)
            } else {
                (cx + side * SHOULDER_HALF_WIDTH, rest_y)
            }
        };
        // Source coordinates: the subject's left side is on the image's right.
        let (lwx, lwy) = wrist(KeypointName::LeftWrist, 1.0);
        let (rwx, rwy) = wrist(KeypointName::RightWrist, -1.0);

        let keypoints = vec![
            self.point(KeypointName::Nose, cx, eye_y + 15.0),
            self.point(KeypointName::LeftEye, cx + HALF_EYE_GAP, eye_y),
            self.point(KeypointName::RightEye, cx - HALF_EYE_GAP, eye_y),
            self.point(KeypointName::LeftEar, cx + 2.0 * HALF_EYE_GAP, eye_y + 5.0),
            self.point(KeypointName::RightEar, cx - 2.0 * HALF_EYE_GAP, eye_y + 5.0),
            self.point(KeypointName::LeftShoulder, cx + SHOULDER_HALF_WIDTH, shoulder_y),
            self.point(KeypointName::RightShoulder, cx - SHOULDER_HALF_WIDTH, shoulder_y),
            self.point(KeypointName::LeftWrist, lwx, lwy),
            self.point(KeypointName::RightWrist, rwx, rwy),
        ];
        Pose::new(keypoints, KEYPOINT_SCORE)
    }
}

impl Default for SyntheticEstimator {
    fn default() -> Self {
        Self::new(SyntheticConfig::default())
    }
}

impl PoseEstimator for SyntheticEstimator {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn estimate(&mut self, frame: &Frame) -> Result<Vec<Pose>> {
        let raised = self.raised_wrist(self.frame_count);
        self.frame_count += 1;
        Ok(vec![self.generate(frame.width, frame.height, raised)])
    }
}

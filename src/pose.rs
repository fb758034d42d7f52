//! Pose estimator output types.
//!
//! Keypoints are expressed in pixel coordinates of the source frame, exactly as
//! the estimator reports them. Mirroring for the selfie-style display happens in
//! the proximity classifier, never here.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// The 17 MoveNet keypoint names, in model output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeypointName {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl KeypointName {
    pub const COUNT: usize = 17;

    pub const ALL: [KeypointName; KeypointName::COUNT] = [
        KeypointName::Nose,
        KeypointName::LeftEye,
        KeypointName::RightEye,
        KeypointName::LeftEar,
        KeypointName::RightEar,
        KeypointName::LeftShoulder,
        KeypointName::RightShoulder,
        KeypointName::LeftElbow,
        KeypointName::RightElbow,
        KeypointName::LeftWrist,
        KeypointName::RightWrist,
        KeypointName::LeftHip,
        KeypointName::RightHip,
        KeypointName::LeftKnee,
        KeypointName::RightKnee,
        KeypointName::LeftAnkle,
        KeypointName::RightAnkle,
    ];

    /// Keypoint name for a model output index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            KeypointName::Nose => "nose",
            KeypointName::LeftEye => "left_eye",
            KeypointName::RightEye => "right_eye",
            KeypointName::LeftEar => "left_ear",
            KeypointName::RightEar => "right_ear",
            KeypointName::LeftShoulder => "left_shoulder",
            KeypointName::RightShoulder => "right_shoulder",
            KeypointName::LeftElbow => "left_elbow",
            KeypointName::RightElbow => "right_elbow",
            KeypointName::LeftWrist => "left_wrist",
            KeypointName::RightWrist => "right_wrist",
            KeypointName::LeftHip => "left_hip",
            KeypointName::RightHip => "right_hip",
            KeypointName::LeftKnee => "left_knee",
            KeypointName::RightKnee => "right_knee",
            KeypointName::LeftAnkle => "left_ankle",
            KeypointName::RightAnkle => "right_ankle",
        }
    }

    pub fn is_wrist(self) -> bool {
        matches!(self, KeypointName::LeftWrist | KeypointName::RightWrist)
    }
}

impl fmt::Display for KeypointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeypointName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == normalized)
            .ok_or_else(|| anyhow!("unknown keypoint name '{}'", s))
    }
}

/// A single named landmark with its confidence.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub name: KeypointName,
    pub x: f32,
    pub y: f32,
    pub score: f32,
}

impl Keypoint {
    pub fn new(name: KeypointName, x: f32, y: f32, score: f32) -> Self {
        Self { name, x, y, score }
    }

    /// True when the score is strictly above `threshold`.
    pub fn is_confident(&self, threshold: f32) -> bool {
        self.score > threshold
    }
}

/// One detected subject.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub keypoints: Vec<Keypoint>,
    #[serde(default)]
    pub score: f32,
}

impl Pose {
    pub fn new(keypoints: Vec<Keypoint>, score: f32) -> Self {
        Self { keypoints, score }
    }

    /// First keypoint with the given name, if any.
    pub fn get(&self, name: KeypointName) -> Option<&Keypoint> {
        self.keypoints.iter().find(|kp| kp.name == name)
    }

    /// First keypoint with the given name whose score is above `threshold`.
    pub fn confident(&self, name: KeypointName, threshold: f32) -> Option<&Keypoint> {
        self.keypoints
            .iter()
            .find(|kp| kp.name == name && kp.is_confident(threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_strings() -> Result<()> {
        for (index, name) in KeypointName::ALL.iter().enumerate() {
            assert_eq!(KeypointName::from_index(index), Some(*name));
            assert_eq!(name.as_str().parse::<KeypointName>()?, *name);
        }
        assert_eq!(KeypointName::from_index(KeypointName::COUNT), None);
        Ok(())
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert!("left_thumb".parse::<KeypointName>().is_err());
    }

    #[test]
    fn keypoint_deserializes_from_snake_case() -> Result<()> {
        let kp: Keypoint =
            serde_json::from_str(r#"{"name":"left_wrist","x":1.0,"y":2.0,"score":0.9}"#)?;
        assert_eq!(kp.name, KeypointName::LeftWrist);
        assert!(kp.name.is_wrist());
        Ok(())
    }

    #[test]
    fn confident_lookup_skips_low_scores() {
        let pose = Pose::new(
            vec![
                Keypoint::new(KeypointName::Nose, 0.0, 0.0, 0.1),
                Keypoint::new(KeypointName::Nose, 5.0, 5.0, 0.8),
            ],
            0.5,
        );
        assert_eq!(pose.get(KeypointName::Nose).map(|kp| kp.x), Some(0.0));
        assert_eq!(
            pose.confident(KeypointName::Nose, 0.2).map(|kp| kp.x),
            Some(5.0)
        );
        assert!(pose.confident(KeypointName::LeftEye, 0.2).is_none());
    }

    #[test]
    fn score_threshold_is_strict() {
        let kp = Keypoint::new(KeypointName::Nose, 0.0, 0.0, 0.2);
        assert!(!kp.is_confident(0.2));
    }
}

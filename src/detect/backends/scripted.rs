use std::collections::VecDeque;
use std::io::BufRead;

use anyhow::{anyhow, Context, Result};

use crate::detect::backend::PoseEstimator;
use crate::frame::Frame;
use crate::pose::Pose;

enum Step {
    Poses(Vec<Pose>),
    Fail(String),
}

/// Replays a fixed sequence of estimator answers, one per call.
///
/// Once the script is exhausted every call returns zero poses.
pub struct ScriptedEstimator {
    steps: VecDeque<Step>,
    ready: bool,
    calls: u64,
}

impl ScriptedEstimator {
    pub fn new() -> Self {
        Self {
            steps: VecDeque::new(),
            ready: true,
            calls: 0,
        }
    }

    /// One pose per call.
    pub fn from_poses(poses: impl IntoIterator<Item = Pose>) -> Self {
        let mut estimator = Self::new();
        for pose in poses {
            estimator.push_pose(pose);
        }
        estimator
    }

    /// Parse a JSON-lines pose script.
    ///
    /// Each line is either a pose object or `null`; blank lines also mean
    /// "no pose on this frame".
    pub fn from_jsonl<R: BufRead>(reader: R) -> Result<Self> {
        let mut estimator = Self::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("read pose script line {}", index + 1))?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                estimator.push_empty();
                continue;
            }
            let pose: Option<Pose> = serde_json::from_str(trimmed)
                .map_err(|e| anyhow!("invalid pose on line {}: {}", index + 1, e))?;
            match pose {
                Some(pose) => estimator.push_pose(pose),
                None => estimator.push_empty(),
            }
        }
        Ok(estimator)
    }

    pub fn push_pose(&mut self, pose: Pose) {
        self.steps.push_back(Step::Poses(vec![pose]));
    }

    pub fn push_poses(&mut self, poses: Vec<Pose>) {
        self.steps.push_back(Step::Poses(poses));
    }

    pub fn push_empty(&mut self) {
        self.steps.push_back(Step::Poses(Vec::new()));
    }

    /// Queue an estimation failure.
    pub fn push_failure(&mut self, message: &str) {
        self.steps.push_back(Step::Fail(message.to_string()));
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Steps not yet replayed.
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }

    /// Number of `estimate` calls so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl Default for ScriptedEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseEstimator for ScriptedEstimator {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn estimate(&mut self, _frame: &Frame) -> Result<Vec<Pose>> {
        self.calls += 1;
        match self.steps.pop_front() {
            Some(Step::Poses(poses)) => Ok(poses),
            Some(Step::Fail(message)) => Err(anyhow!("scripted estimation failure: {}", message)),
            None => Ok(Vec::new()),
        }
    }
}

#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::PoseEstimator;
use crate::frame::{rgb_len, Frame, RGB_CHANNELS};
use crate::pose::{Keypoint, KeypointName, Pose};

/// MoveNet single-pose input edge (Lightning).
pub const MOVENET_INPUT_SIZE: u32 = 192;

/// Tract-based MoveNet single-pose estimator.
///
/// Loads a local ONNX export of MoveNet (NHWC input, pixel values 0..255 as
/// f32; output `[1, 1, 17, 3]` with normalized `y, x, score` rows). Frames are
/// resized to the model input with nearest-neighbour sampling and keypoints are
/// scaled back to frame pixels.
pub struct TractMoveNet {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    input_size: u32,
}

impl TractMoveNet {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let size = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, size, size, 3)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self { model, input_size })
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        if !frame.has_dimensions() {
            return Err(anyhow!("frame has no dimensions"));
        }
        let pixels = frame.pixels();
        let expected_len = rgb_len(frame.width, frame.height)?;
        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let size = self.input_size as usize;
        let src_w = frame.width as usize;
        let src_h = frame.height as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, size, size, 3), |(_, y, x, c)| {
            let sx = (x * src_w / size).min(src_w - 1);
            let sy = (y * src_h / size).min(src_h - 1);
            pixels[(sy * src_w + sx) * RGB_CHANNELS + c] as f32
        });

        Ok(input.into_tensor())
    }

    fn extract_pose(&self, outputs: TVec<TValue>, width: u32, height: u32) -> Result<Pose> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let rows: Vec<f32> = view.iter().copied().collect();
        if rows.len() < KeypointName::COUNT * 3 {
            return Err(anyhow!(
                "model output has {} values, expected at least {}",
                rows.len(),
                KeypointName::COUNT * 3
            ));
        }

        let keypoints: Vec<Keypoint> = KeypointName::ALL
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let y = rows[i * 3];
                let x = rows[i * 3 + 1];
                let score = rows[i * 3 + 2];
                Keypoint::new(*name, x * width as f32, y * height as f32, score)
            })
            .collect();
        let score =
            keypoints.iter().map(|kp| kp.score).sum::<f32>() / KeypointName::COUNT as f32;
        Ok(Pose::new(keypoints, score))
    }
}

impl PoseEstimator for TractMoveNet {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn estimate(&mut self, frame: &Frame) -> Result<Vec<Pose>> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let pose = self.extract_pose(outputs, frame.width, frame.height)?;
        Ok(vec![pose])
    }
}

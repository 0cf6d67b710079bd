#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{Detection, DetectionResult};
use crate::frame::{Frame, RGB_CHANNELS};
use crate::region::BoundingBox;

/// Values per output row: x1, y1, x2, y2, score, class.
const ROW_LEN: usize = 6;

/// Tract-based backend for ONNX box detectors.
///
/// The model takes a `1x3xHxW` float input in `0..1` and emits rows of
/// `[x1, y1, x2, y2, score, class]` in input pixel coordinates (the
/// post-NMS export format of common single-stage detectors). Frames are
/// resized nearest-neighbour to the model input and boxes scaled back.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    width: u32,
    height: u32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            width,
            height,
        })
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        if frame.width == 0 || frame.height == 0 {
            return Err(anyhow!("empty frame"));
        }
        let pixels = frame.pixels();
        let (src_w, src_h) = (frame.width as usize, frame.height as usize);
        let (dst_w, dst_h) = (self.width as usize, self.height as usize);

        let input = tract_ndarray::Array4::from_shape_fn((1, 3, dst_h, dst_w), |(_, c, y, x)| {
            let sx = x * src_w / dst_w;
            let sy = y * src_h / dst_h;
            pixels[(sy * src_w + sx) * RGB_CHANNELS + c] as f32 / 255.0
        });
        Ok(input.into_tensor())
    }

    fn parse_rows(
        &self,
        outputs: TVec<TValue>,
        frame: &Frame,
        threshold: f32,
    ) -> Result<DetectionResult> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        if view.shape().last().copied() != Some(ROW_LEN) {
            return Err(anyhow!(
                "expected detector rows of {} values, got shape {:?}",
                ROW_LEN,
                view.shape()
            ));
        }

        let sx = frame.width as f32 / self.width as f32;
        let sy = frame.height as f32 / self.height as f32;
        let values: Vec<f32> = view.iter().copied().collect();

        let mut detections = Vec::new();
        for row in values.chunks_exact(ROW_LEN) {
            let score = row[4];
            if !score.is_finite() || score < threshold {
                continue;
            }
            detections.push(Detection {
                bbox: BoundingBox::new(row[0] * sx, row[1] * sy, row[2] * sx, row[3] * sy),
                confidence: score,
                class_id: row[5].max(0.0) as u32,
            });
        }
        Ok(DetectionResult { detections })
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &Frame, confidence_threshold: f32) -> Result<DetectionResult> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.parse_rows(outputs, frame, confidence_threshold)
    }
}

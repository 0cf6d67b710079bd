use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{Detection, DetectionResult};
use crate::frame::Frame;
use crate::region::BoundingBox;

/// Stub backend for testing and synthetic runs.
///
/// Reports one box covering the central half of every frame, so every frame
/// reaches the recognizer.
pub struct StubBackend {
    confidence: f32,
}

impl StubBackend {
    pub fn new() -> Self {
        Self { confidence: 0.9 }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: &Frame, confidence_threshold: f32) -> Result<DetectionResult> {
        if frame.width == 0 || frame.height == 0 || self.confidence < confidence_threshold {
            return Ok(DetectionResult::empty());
        }
        let (w, h) = (frame.width as f32, frame.height as f32);
        Ok(DetectionResult::single(Detection::new(
            BoundingBox::new(w * 0.25, h * 0.25, w * 0.75, h * 0.75),
            self.confidence,
        )))
    }
}

use anyhow::{anyhow, Result};
use std::collections::VecDeque;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{Detection, DetectionResult};
use crate::frame::Frame;
use crate::region::BoundingBox;

/// One scripted detector response.
#[derive(Clone, Debug)]
pub enum ScriptedDetection {
    Boxes(Vec<Detection>),
    Fail(String),
}

/// Replays a fixed sequence of detector responses, one per call.
///
/// Once the script is exhausted every further frame reports no detections.
#[derive(Default)]
pub struct ScriptedBackend {
    script: VecDeque<ScriptedDetection>,
    calls: u64,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next frame reports a single box with confidence 1.0.
    pub fn then_box(mut self, bbox: BoundingBox) -> Self {
        self.script
            .push_back(ScriptedDetection::Boxes(vec![Detection::new(bbox, 1.0)]));
        self
    }

    pub fn then_boxes(mut self, detections: Vec<Detection>) -> Self {
        self.script.push_back(ScriptedDetection::Boxes(detections));
        self
    }

    /// Next frame reports nothing.
    pub fn then_nothing(mut self) -> Self {
        self.script.push_back(ScriptedDetection::Boxes(Vec::new()));
        self
    }

    pub fn then_fail(mut self, message: &str) -> Self {
        self.script
            .push_back(ScriptedDetection::Fail(message.to_string()));
        self
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _frame: &Frame, confidence_threshold: f32) -> Result<DetectionResult> {
        self.calls += 1;
        match self.script.pop_front() {
            Some(ScriptedDetection::Boxes(detections)) => {
                let mut result = DetectionResult { detections };
                result.retain_above(confidence_threshold);
                Ok(result)
            }
            Some(ScriptedDetection::Fail(message)) => Err(anyhow!(message)),
            None => Ok(DetectionResult::empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_script_in_order() {
        let frame = Frame::filled(4, 4, [0, 0, 0], 1).unwrap();
        let bbox = BoundingBox::new(0.0, 0.0, 2.0, 2.0);
        let mut backend = ScriptedBackend::new()
            .then_box(bbox)
            .then_nothing()
            .then_fail("model crashed");

        assert_eq!(backend.detect(&frame, 0.5).unwrap().detections.len(), 1);
        assert!(backend.detect(&frame, 0.5).unwrap().is_empty());
        assert!(backend.detect(&frame, 0.5).is_err());
        assert!(backend.detect(&frame, 0.5).unwrap().is_empty());
        assert_eq!(backend.calls(), 4);
    }

    #[test]
    fn filters_by_threshold() {
        let frame = Frame::filled(4, 4, [0, 0, 0], 1).unwrap();
        let bbox = BoundingBox::new(0.0, 0.0, 2.0, 2.0);
        let mut backend = ScriptedBackend::new().then_boxes(vec![
            Detection::new(bbox, 0.3),
            Detection::new(bbox, 0.7),
        ]);
        let result = backend.detect(&frame, 0.5).unwrap();
        assert_eq!(result.detections.len(), 1);
        assert_eq!(result.detections[0].confidence, 0.7);
    }
}

use serde::{Deserialize, Serialize};

use crate::region::BoundingBox;

/// Result of running detection on a frame.
#[derive(Clone, Debug, Default)]
pub struct DetectionResult {
    /// Boxes in the order the backend produced them.
    pub detections: Vec<Detection>,
}

impl DetectionResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(detection: Detection) -> Self {
        Self {
            detections: vec![detection],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    /// The one detection the scan loop acts on. Every other box is ignored.
    pub fn primary(&self, priority: DetectionPriority) -> Option<&Detection> {
        match priority {
            DetectionPriority::FirstInList => self.detections.first(),
            DetectionPriority::HighestConfidence => self
                .detections
                .iter()
                .reduce(|best, d| if d.confidence > best.confidence { d } else { best }),
        }
    }

    pub(crate) fn retain_above(&mut self, threshold: f32) {
        self.detections.retain(|d| d.confidence >= threshold);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class_id: u32,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            bbox,
            confidence,
            class_id: 0,
        }
    }
}

/// Which box wins when a frame contains several detections.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionPriority {
    /// Backend order: the first box reported.
    #[default]
    #[serde(alias = "first")]
    FirstInList,
    HighestConfidence,
}

impl std::str::FromStr for DetectionPriority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim() {
            "first" | "first_in_list" => Ok(Self::FirstInList),
            "highest_confidence" | "confidence" => Ok(Self::HighestConfidence),
            other => Err(anyhow::anyhow!("unknown detection priority {:?}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(left: f32, confidence: f32) -> Detection {
        Detection::new(BoundingBox::new(left, 0.0, left + 10.0, 10.0), confidence)
    }

    #[test]
    fn first_in_list_ignores_confidence() {
        let result = DetectionResult {
            detections: vec![det(1.0, 0.5), det(2.0, 0.9)],
        };
        let primary = result.primary(DetectionPriority::FirstInList).unwrap();
        assert_eq!(primary.bbox.left, 1.0);
    }

    #[test]
    fn highest_confidence_prefers_first_on_ties() {
        let result = DetectionResult {
            detections: vec![det(1.0, 0.5), det(2.0, 0.9), det(3.0, 0.9)],
        };
        let primary = result.primary(DetectionPriority::HighestConfidence).unwrap();
        assert_eq!(primary.bbox.left, 2.0);
    }

    #[test]
    fn empty_result_has_no_primary() {
        assert!(DetectionResult::empty()
            .primary(DetectionPriority::FirstInList)
            .is_none());
    }

    #[test]
    fn retain_above_drops_low_scores() {
        let mut result = DetectionResult {
            detections: vec![det(1.0, 0.2), det(2.0, 0.5), det(3.0, 0.8)],
        };
        result.retain_above(0.5);
        assert_eq!(result.detections.len(), 2);
    }

    #[test]
    fn parses_priority_names() {
        assert_eq!(
            "first".parse::<DetectionPriority>().unwrap(),
            DetectionPriority::FirstInList
        );
        assert_eq!(
            "highest_confidence".parse::<DetectionPriority>().unwrap(),
            DetectionPriority::HighestConfidence
        );
        assert!("largest".parse::<DetectionPriority>().is_err());
    }
}

//! Crop-region extraction around a detection box.

use serde::{Deserialize, Serialize};

/// Detector output box in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingBox {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn area(&self) -> f32 {
        (self.right - self.left).max(0.0) * (self.bottom - self.top).max(0.0)
    }
}

/// Pixel rectangle `[x1, x2) x [y1, y2)` clipped to a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl Region {
    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    /// Zero-area regions carry no usable pixels and must be skipped.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// Expand `bbox` outward by `padding` pixels and clamp to the frame.
///
/// Box coordinates are truncated to integers first. A degenerate box can
/// produce `x1 > x2` after clamping; such a region reports `is_empty()`.
pub fn expand(bbox: &BoundingBox, frame_width: u32, frame_height: u32, padding: u32) -> Region {
    let pad = i64::from(padding);
    let w = i64::from(frame_width);
    let h = i64::from(frame_height);

    let x1 = (bbox.left as i64 - pad).clamp(0, w);
    let y1 = (bbox.top as i64 - pad).clamp(0, h);
    let x2 = (bbox.right as i64 + pad).clamp(0, w);
    let y2 = (bbox.bottom as i64 + pad).clamp(0, h);

    Region {
        x1: x1 as u32,
        y1: y1 as u32,
        x2: x2 as u32,
        y2: y2 as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn within(region: &Region, width: u32, height: u32) -> bool {
        region.x1 <= width && region.x2 <= width && region.y1 <= height && region.y2 <= height
    }

    #[test]
    fn zero_padding_keeps_in_bounds_box() {
        let bbox = BoundingBox::new(10.0, 20.0, 110.0, 220.0);
        let region = expand(&bbox, 640, 480, 0);
        assert_eq!(
            region,
            Region {
                x1: 10,
                y1: 20,
                x2: 110,
                y2: 220
            }
        );
    }

    #[test]
    fn padding_is_clipped_to_frame() {
        let bbox = BoundingBox::new(5.0, 5.0, 630.0, 470.0);
        let region = expand(&bbox, 640, 480, 20);
        assert_eq!(
            region,
            Region {
                x1: 0,
                y1: 0,
                x2: 640,
                y2: 480
            }
        );
    }

    #[test]
    fn fractional_coordinates_truncate() {
        let bbox = BoundingBox::new(10.9, 20.2, 30.7, 40.99);
        let region = expand(&bbox, 100, 100, 1);
        assert_eq!(
            region,
            Region {
                x1: 9,
                y1: 19,
                x2: 31,
                y2: 41
            }
        );
    }

    #[test]
    fn output_always_inside_frame() {
        let boxes = [
            BoundingBox::new(-50.0, -50.0, 10.0, 10.0),
            BoundingBox::new(600.0, 400.0, 900.0, 900.0),
            BoundingBox::new(-1000.0, 100.0, 5000.0, 200.0),
            BoundingBox::new(320.0, 240.0, 320.0, 240.0),
        ];
        for bbox in &boxes {
            for padding in [0, 1, 20, 10_000] {
                let region = expand(bbox, 640, 480, padding);
                assert!(within(&region, 640, 480), "{:?} {}", bbox, padding);
            }
        }
    }

    #[test]
    fn box_outside_frame_is_empty() {
        let bbox = BoundingBox::new(700.0, 500.0, 800.0, 600.0);
        let region = expand(&bbox, 640, 480, 0);
        assert!(region.is_empty());
    }

    #[test]
    fn inverted_box_is_empty() {
        let bbox = BoundingBox::new(300.0, 200.0, 100.0, 100.0);
        let region = expand(&bbox, 640, 480, 10);
        assert!(region.is_empty());
    }
}

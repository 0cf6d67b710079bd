use anyhow::Result;

use crate::detect::result::DetectionResult;
use crate::frame::Frame;

/// Detector backend trait.
///
/// A backend turns one frame into zero or more bounding boxes. It is called
/// synchronously from the scan loop, once per processed frame, and may block
/// for as long as inference takes.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame, dropping boxes scored below
    /// `confidence_threshold`.
    fn detect(&mut self, frame: &Frame, confidence_threshold: f32) -> Result<DetectionResult>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

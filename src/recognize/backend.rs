use anyhow::Result;

use crate::frame::ImageRegion;

/// Text recognizer trait.
///
/// Given a crop of the detected item, return whatever text the engine read.
/// Empty text is a normal result. An `Err` is a recognition failure: the scan
/// loop logs it and treats the frame as having produced no observation.
pub trait TextRecognizer: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    fn recognize(&mut self, region: &ImageRegion) -> Result<String>;
}

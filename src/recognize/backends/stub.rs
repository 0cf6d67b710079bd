use anyhow::Result;

use crate::frame::ImageRegion;
use crate::recognize::backend::TextRecognizer;

/// Returns the same text for every region.
pub struct StubRecognizer {
    text: String,
}

impl StubRecognizer {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }
}

impl TextRecognizer for StubRecognizer {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn recognize(&mut self, _region: &ImageRegion) -> Result<String> {
        Ok(self.text.clone())
    }
}

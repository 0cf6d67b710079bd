use anyhow::{anyhow, Result};
use std::collections::VecDeque;

use crate::frame::ImageRegion;
use crate::recognize::backend::TextRecognizer;

/// Replays queued readings, one per call. Exhausted scripts read empty text.
#[derive(Default)]
pub struct ScriptedRecognizer {
    script: VecDeque<Result<String, String>>,
    calls: u64,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_text(mut self, text: &str) -> Self {
        self.script.push_back(Ok(text.to_string()));
        self
    }

    /// Queue the same text `count` times.
    pub fn then_repeat(mut self, text: &str, count: usize) -> Self {
        for _ in 0..count {
            self.script.push_back(Ok(text.to_string()));
        }
        self
    }

    pub fn then_fail(mut self, message: &str) -> Self {
        self.script.push_back(Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl TextRecognizer for ScriptedRecognizer {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn recognize(&mut self, _region: &ImageRegion) -> Result<String> {
        self.calls += 1;
        match self.script.pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(String::new()),
        }
    }
}

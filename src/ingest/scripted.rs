//! Scripted frame source for tests and demos.
//!
//! Replays a fixed list of frames, optionally interleaved with read failures,
//! then reports end of stream. A `SourceProbe` lets the caller observe open
//! and release calls after the source has been handed to the controller.

use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use super::{CaptureDevice, CaptureStats};
use crate::frame::Frame;

enum Step {
    Frame(Frame),
    Fail(String),
}

#[derive(Default)]
struct ProbeState {
    open: AtomicBool,
    opens: AtomicU64,
    releases: AtomicU64,
}

/// Read-only view of a scripted source's lifecycle.
#[derive(Clone)]
pub struct SourceProbe {
    state: Arc<ProbeState>,
}

impl SourceProbe {
    pub fn is_open(&self) -> bool {
        self.state.open.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> u64 {
        self.state.opens.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> u64 {
        self.state.releases.load(Ordering::SeqCst)
    }
}

pub struct ScriptedSource {
    name: String,
    steps: VecDeque<Step>,
    fail_open: Option<String>,
    frames_captured: u64,
    state: Arc<ProbeState>,
}

impl ScriptedSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            steps: VecDeque::new(),
            fail_open: None,
            frames_captured: 0,
            state: Arc::new(ProbeState::default()),
        }
    }

    pub fn then_frame(mut self, frame: Frame) -> Self {
        self.steps.push_back(Step::Frame(frame));
        self
    }

    /// Queue `count` uniform frames of the given size.
    pub fn then_blank_frames(mut self, count: usize, width: u32, height: u32) -> Result<Self> {
        for _ in 0..count {
            let sequence = self.steps.len() as u64 + 1;
            let frame = Frame::filled(width, height, [255, 255, 255], sequence)?;
            self.steps.push_back(Step::Frame(frame));
        }
        Ok(self)
    }

    pub fn then_read_error(mut self, message: &str) -> Self {
        self.steps.push_back(Step::Fail(message.to_string()));
        self
    }

    pub fn failing_open(mut self, message: &str) -> Self {
        self.fail_open = Some(message.to_string());
        self
    }

    pub fn probe(&self) -> SourceProbe {
        SourceProbe {
            state: self.state.clone(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl CaptureDevice for ScriptedSource {
    fn label(&self) -> String {
        format!("scripted://{}", self.name)
    }

    fn open(&mut self) -> Result<()> {
        if let Some(message) = &self.fail_open {
            return Err(anyhow!("failed to open {}: {}", self.label(), message));
        }
        self.state.open.store(true, Ordering::SeqCst);
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        if !self.is_open() {
            return Err(anyhow!("{} is not open", self.label()));
        }
        match self.steps.pop_front() {
            Some(Step::Frame(frame)) => {
                self.frames_captured += 1;
                Ok(Some(frame))
            }
            Some(Step::Fail(message)) => Err(anyhow!(message)),
            None => Ok(None),
        }
    }

    fn release(&mut self) {
        if self.state.open.swap(false, Ordering::SeqCst) {
            self.state.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_open(&self) -> bool {
        self.state.open.load(Ordering::SeqCst)
    }

    fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames_captured: self.frames_captured,
            device: self.label(),
        }
    }
}

//! Synthetic frame source (`stub://`).
//!
//! Produces a moving gradient so consecutive frames differ. Unbounded unless a
//! frame limit is set, after which it reports end of stream.

use anyhow::{anyhow, Result};

use super::{CaptureDevice, CaptureStats};
use crate::frame::{Frame, RGB_CHANNELS};

pub struct SyntheticSource {
    name: String,
    width: u32,
    height: u32,
    frame_limit: Option<u64>,
    frame_count: u64,
    scene_state: u8,
    open: bool,
}

impl SyntheticSource {
    pub fn new(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            frame_limit: None,
            frame_count: 0,
            scene_state: 0,
            open: false,
        }
    }

    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    fn generate_synthetic_pixels(&mut self) -> Vec<u8> {
        let pixel_count = self.width as usize * self.height as usize * RGB_CHANNELS;
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count + self.scene_state as u64) % 256) as u8;
        }
        pixels
    }
}

impl CaptureDevice for SyntheticSource {
    fn label(&self) -> String {
        format!("stub://{}", self.name)
    }

    fn open(&mut self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(anyhow!(
                "synthetic source {} has empty dimensions",
                self.name
            ));
        }
        self.open = true;
        log::info!(
            "SyntheticSource: opened stub://{} ({}x{})",
            self.name,
            self.width,
            self.height
        );
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        if !self.open {
            return Err(anyhow!("synthetic source {} is not open", self.name));
        }
        if self.frame_limit.is_some_and(|limit| self.frame_count >= limit) {
            return Ok(None);
        }
        self.frame_count += 1;
        let pixels = self.generate_synthetic_pixels();
        Frame::new(pixels, self.width, self.height, self.frame_count).map(Some)
    }

    fn release(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames_captured: self.frame_count,
            device: self.label(),
        }
    }
}

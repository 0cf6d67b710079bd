//! Still-image directory source (`dir://`).
//!
//! Replays the JPEG/PNG files of a local directory in filename order, one
//! frame per file, then reports end of stream. Useful for replaying a
//! recorded scan without a camera attached.

use anyhow::{anyhow, Context, Result};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use super::{CaptureDevice, CaptureStats};
use crate::frame::Frame;

const EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub struct ImageDirSource {
    dir: PathBuf,
    pending: VecDeque<PathBuf>,
    frame_count: u64,
    open: bool,
}

impl ImageDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            pending: VecDeque::new(),
            frame_count: 0,
            open: false,
        }
    }
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("read image dir {}", dir.display()))?
    {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if path.is_file() && is_image {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

impl CaptureDevice for ImageDirSource {
    fn label(&self) -> String {
        format!("dir://{}", self.dir.display())
    }

    fn open(&mut self) -> Result<()> {
        let files = list_images(&self.dir)?;
        if files.is_empty() {
            return Err(anyhow!("no images found in {}", self.dir.display()));
        }
        log::info!(
            "ImageDirSource: opened {} ({} images)",
            self.dir.display(),
            files.len()
        );
        self.pending = files.into();
        self.open = true;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        if !self.open {
            return Err(anyhow!("{} is not open", self.label()));
        }
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };
        let image = image::open(&path)
            .with_context(|| format!("decode {}", path.display()))?
            .to_rgb8();
        let (width, height) = image.dimensions();
        self.frame_count += 1;
        Frame::new(image.into_raw(), width, height, self.frame_count).map(Some)
    }

    fn release(&mut self) {
        self.pending.clear();
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

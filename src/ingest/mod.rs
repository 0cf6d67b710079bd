//! Frame capture devices.
//!
//! This module provides the sources the scan loop reads frames from:
//! - Synthetic frames (`stub://...`), always available
//! - USB/V4L2 cameras (feature: capture-v4l2)
//! - Directories of still images (feature: ingest-image)
//! - Scripted frame lists (tests and demos)
//!
//! A capture device is exclusively owned by one scan loop at a time. The loop
//! opens it on start and releases it on every exit path.

#[cfg(feature = "ingest-image")]
pub mod image_dir;
#[cfg(feature = "capture-v4l2")]
mod pixel_format;
pub mod scripted;
pub mod synthetic;
#[cfg(feature = "capture-v4l2")]
pub mod v4l2;

use anyhow::{anyhow, Result};

use crate::frame::Frame;

#[cfg(feature = "ingest-image")]
pub use image_dir::ImageDirSource;
pub use scripted::ScriptedSource;
pub use synthetic::SyntheticSource;
#[cfg(feature = "capture-v4l2")]
pub use v4l2::V4l2Source;

/// A frame source the scan controller can open, read and release.
pub trait CaptureDevice: Send {
    /// Human-readable device label for logs.
    fn label(&self) -> String;

    /// Open the device. Failure is a device error; the controller stays idle.
    fn open(&mut self) -> Result<()>;

    /// Read the next frame. `Ok(None)` is end of stream, `Err` a read failure.
    fn read_frame(&mut self) -> Result<Option<Frame>>;

    /// Release the device. Must be safe to call more than once.
    fn release(&mut self);

    fn is_open(&self) -> bool;

    fn stats(&self) -> CaptureStats;
}

/// Statistics for a capture device.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub frames_captured: u64,
    pub device: String,
}

/// Configuration for a capture device.
#[derive(Clone, Debug)]
pub struct CaptureConfig {
    /// Device string: `stub://name`, `/dev/videoN`, `v4l2:///dev/videoN`,
    /// `dir:///path/to/frames`, or a bare camera index (`0`, `1`, ...).
    pub device: String,
    /// Requested frame width.
    pub width: u32,
    /// Requested frame height.
    pub height: u32,
    /// Requested frame rate; 0 leaves the device default.
    pub target_fps: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: "stub://camera".to_string(),
            width: 1280,
            height: 720,
            target_fps: 30,
        }
    }
}

/// Device kinds recognised in a device string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceKind {
    Synthetic(String),
    V4l2(String),
    ImageDir(String),
}

/// Parse a device string. Bare integers map to `/dev/video<N>`.
pub fn parse_device(device: &str) -> Result<DeviceKind> {
    let device = device.trim();
    if device.is_empty() {
        return Err(anyhow!("capture device must not be empty"));
    }
    if let Some(name) = device.strip_prefix("stub://") {
        return Ok(DeviceKind::Synthetic(name.to_string()));
    }
    if let Some(path) = device.strip_prefix("dir://") {
        return Ok(DeviceKind::ImageDir(path.to_string()));
    }
    if let Some(path) = device.strip_prefix("v4l2://") {
        return Ok(DeviceKind::V4l2(path.to_string()));
    }
    if let Ok(index) = device.parse::<u32>() {
        return Ok(DeviceKind::V4l2(format!("/dev/video{}", index)));
    }
    if device.starts_with("/dev/video") {
        return Ok(DeviceKind::V4l2(device.to_string()));
    }
    Err(anyhow!("unsupported capture device {:?}", device))
}

/// Build the capture device named by `config.device`.
pub fn open_source(config: &CaptureConfig) -> Result<Box<dyn CaptureDevice>> {
    match parse_device(&config.device)? {
        DeviceKind::Synthetic(name) => Ok(Box::new(SyntheticSource::new(
            &name,
            config.width,
            config.height,
        ))),
        DeviceKind::V4l2(path) => {
            #[cfg(feature = "capture-v4l2")]
            {
                Ok(Box::new(V4l2Source::new(v4l2::V4l2Config {
                    device: path,
                    target_fps: config.target_fps,
                    width: config.width,
                    height: config.height,
                })))
            }
            #[cfg(not(feature = "capture-v4l2"))]
            {
                Err(anyhow!(
                    "camera {} requires the capture-v4l2 feature",
                    path
                ))
            }
        }
        DeviceKind::ImageDir(path) => {
            #[cfg(feature = "ingest-image")]
            {
                Ok(Box::new(ImageDirSource::new(path)))
            }
            #[cfg(not(feature = "ingest-image"))]
            {
                Err(anyhow!(
                    "image directory {} requires the ingest-image feature",
                    path
                ))
            }
        }
    }
}

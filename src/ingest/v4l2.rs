//! V4L2 camera source.
//!
//! Opens a local device node (e.g. `/dev/video0`), negotiates an RGB or YUYV
//! format and streams frames through a memory-mapped buffer queue. Frames are
//! converted to packed RGB8 before they leave this module.

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;

use super::pixel_format::{self, PixelFormat};
use super::{CaptureDevice, CaptureStats};
use crate::frame::Frame;

/// Configuration for a V4L2 source.
#[derive(Clone, Debug)]
pub struct V4l2Config {
    /// Device path (e.g., "/dev/video0")
    pub device: String,
    /// Requested frame rate; 0 leaves the driver default.
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl Default for V4l2Config {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            target_fps: 30,
            width: 1280,
            height: 720,
        }
    }
}

pub struct V4l2Source {
    config: V4l2Config,
    state: Option<DeviceV4l2State>,
    frame_count: u64,
    active_width: u32,
    active_height: u32,
    active_format: PixelFormat,
}

#[self_referencing]
struct DeviceV4l2State {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Source {
    pub fn new(config: V4l2Config) -> Self {
        Self {
            active_width: config.width,
            active_height: config.height,
            config,
            state: None,
            frame_count: 0,
            active_format: PixelFormat::Rgb24,
        }
    }
}

impl CaptureDevice for V4l2Source {
    fn label(&self) -> String {
        self.config.device.clone()
    }

    fn open(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&self.config.device)
            .with_context(|| format!("open v4l2 device {}", self.config.device))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "V4l2Source: failed to set format on {}: {}",
                    self.config.device,
                    err
                );
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };

        let pixel_format = PixelFormat::from_fourcc(&format.fourcc.repr).ok_or_else(|| {
            anyhow!(
                "v4l2 device {} negotiated unsupported format {}",
                self.config.device,
                format.fourcc
            )
        })?;

        if self.config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "V4l2Source: failed to set fps on {}: {}",
                    self.config.device,
                    err
                );
            }
        }

        self.active_width = format.width;
        self.active_height = format.height;
        self.active_format = pixel_format;

        let state = DeviceV4l2StateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;
        self.state = Some(state);

        log::info!(
            "V4l2Source: opened {} ({}x{} {:?})",
            self.config.device,
            self.active_width,
            self.active_height,
            self.active_format
        );
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().context("v4l2 device not open")?;
        let (width, height, format) = (self.active_width, self.active_height, self.active_format);
        let rgb = state
            .with_mut(|fields| {
                fields
                    .stream
                    .next()
                    .map(|(buf, _meta)| pixel_format::to_rgb(buf, width, height, format))
            })
            .context("capture v4l2 frame")??;

        self.frame_count += 1;
        Frame::new(rgb, width, height, self.frame_count).map(Some)
    }

    fn release(&mut self) {
        if self.state.take().is_some() {
            log::info!("V4l2Source: released {}", self.config.device);
        }
    }

    fn is_open(&self) -> bool {
        self.state.is_some()
    }

    fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}

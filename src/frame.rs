//! Frame and image-region containers.
//!
//! - `Frame`: one captured camera image, packed RGB8, owned by the scan loop
//!   for the duration of a single iteration.
//! - `ImageRegion`: an owned crop of a frame. Regions outlive their frame: they
//!   travel with an observation through the consensus buffer and the winning
//!   one is kept by the session ledger for the receipt.

use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};

use crate::region::Region;

/// Bytes per pixel for packed RGB8.
pub const RGB_CHANNELS: usize = 3;

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

/// One captured frame. Pixels are packed RGB8, row-major.
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Monotonic per-device sequence number (1-based).
    pub sequence: u64,
}

impl Frame {
    /// Build a frame, checking the buffer length against the dimensions.
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self> {
        let expected = rgb_len(width, height)?;
        if data.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            sequence,
        })
    }

    /// Uniform frame filled with a single RGB value.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], sequence: u64) -> Result<Self> {
        let len = rgb_len(width, height)?;
        let mut data = Vec::with_capacity(len);
        for _ in 0..(len / RGB_CHANNELS) {
            data.extend_from_slice(&rgb);
        }
        Self::new(data, width, height, sequence)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Copy `region` out of this frame. The region must already be clipped to
    /// the frame bounds (see `region::expand`).
    pub fn crop(&self, region: &Region) -> Result<ImageRegion> {
        if region.x2 > self.width || region.y2 > self.height {
            return Err(anyhow!(
                "region {:?} exceeds frame bounds {}x{}",
                region,
                self.width,
                self.height
            ));
        }
        let crop_w = region.width();
        let crop_h = region.height();
        let stride = self.width as usize * RGB_CHANNELS;
        let row_len = crop_w as usize * RGB_CHANNELS;

        let mut out = Vec::with_capacity(row_len * crop_h as usize);
        for y in region.y1..region.y2 {
            let start = y as usize * stride + region.x1 as usize * RGB_CHANNELS;
            out.extend_from_slice(&self.data[start..start + row_len]);
        }
        Ok(ImageRegion::new(out, crop_w, crop_h))
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------------
// ImageRegion
// ----------------------------------------------------------------------------

/// Owned RGB8 crop of a frame.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageRegion {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    digest: [u8; 32],
}

impl ImageRegion {
    pub(crate) fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        let digest = Sha256::digest(&data).into();
        Self {
            data,
            width,
            height,
            digest,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// SHA-256 of the pixel bytes. Receipts reference images by this digest.
    pub fn digest(&self) -> [u8; 32] {
        self.digest
    }

    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// Luma (BT.601) of every pixel, row-major.
    pub fn to_grayscale(&self) -> Vec<u8> {
        self.data
            .chunks_exact(RGB_CHANNELS)
            .map(|px| {
                let luma =
                    (299 * px[0] as u32 + 587 * px[1] as u32 + 114 * px[2] as u32 + 500) / 1000;
                luma.min(255) as u8
            })
            .collect()
    }
}

impl std::fmt::Debug for ImageRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageRegion")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("digest", &self.digest_hex())
            .finish()
    }
}

fn rgb_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(RGB_CHANNELS))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

use anyhow::{anyhow, Result};

/// Camera pixel layouts we can convert to packed RGB8.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PixelFormat {
    Rgb24,
    /// Packed 4:2:2, `Y0 U Y1 V` per pixel pair. Most USB webcams default to it.
    Yuyv,
}

impl PixelFormat {
    pub(crate) fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"RGB3" => Some(Self::Rgb24),
            b"YUYV" => Some(Self::Yuyv),
            _ => None,
        }
    }
}

pub(crate) fn to_rgb(pixels: &[u8], width: u32, height: u32, format: PixelFormat) -> Result<Vec<u8>> {
    let pixel_count = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
    match format {
        PixelFormat::Rgb24 => {
            let expected = pixel_count * 3;
            if pixels.len() < expected {
                return Err(anyhow!(
                    "RGB frame length mismatch: expected {}, got {}",
                    expected,
                    pixels.len()
                ));
            }
            Ok(pixels[..expected].to_vec())
        }
        PixelFormat::Yuyv => yuyv_to_rgb(pixels, pixel_count),
    }
}

fn yuyv_to_rgb(pixels: &[u8], pixel_count: usize) -> Result<Vec<u8>> {
    if pixel_count % 2 != 0 {
        return Err(anyhow!("YUYV frames need an even pixel count"));
    }
    let expected = pixel_count * 2;
    if pixels.len() < expected {
        return Err(anyhow!(
            "YUYV frame length mismatch: expected {}, got {}",
            expected,
            pixels.len()
        ));
    }

    let mut rgb = Vec::with_capacity(pixel_count * 3);
    for quad in pixels[..expected].chunks_exact(4) {
        let u = quad[1] as f32 - 128.0;
        let v = quad[3] as f32 - 128.0;
        for y in [quad[0] as f32, quad[2] as f32] {
            rgb.push(clamp_to_u8(y + 1.402_f32 * v));
            rgb.push(clamp_to_u8(y - 0.344_136_f32 * u - 0.714_136_f32 * v));
            rgb.push(clamp_to_u8(y + 1.772_f32 * u));
        }
    }
    Ok(rgb)
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

//! OCR preprocessing: grayscale + Otsu binarization.

use crate::frame::ImageRegion;

/// Single-channel 8-bit image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl GrayImage {
    /// Binary PGM (`P5`) encoding, readable by Tesseract on stdin.
    pub fn to_pgm(&self) -> Vec<u8> {
        let mut out = format!("P5\n{} {}\n255\n", self.width, self.height).into_bytes();
        out.extend_from_slice(&self.pixels);
        out
    }
}

/// Threshold maximizing between-class variance of the histogram.
pub fn otsu_threshold(gray: &[u8]) -> u8 {
    if gray.is_empty() {
        return 0;
    }
    let mut histogram = [0u64; 256];
    for &p in gray {
        histogram[p as usize] += 1;
    }

    let total = gray.len() as f64;
    let weighted_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut background_weight = 0.0;
    let mut background_sum = 0.0;
    let mut best_variance = 0.0;
    let mut best_threshold = 0u8;

    for (level, &count) in histogram.iter().enumerate() {
        background_weight += count as f64;
        if background_weight == 0.0 {
            continue;
        }
        let foreground_weight = total - background_weight;
        if foreground_weight == 0.0 {
            break;
        }
        background_sum += level as f64 * count as f64;
        let background_mean = background_sum / background_weight;
        let foreground_mean = (weighted_sum - background_sum) / foreground_weight;
        let variance =
            background_weight * foreground_weight * (background_mean - foreground_mean).powi(2);
        if variance > best_variance {
            best_variance = variance;
            best_threshold = level as u8;
        }
    }
    best_threshold
}

/// Grayscale then binarize at the Otsu threshold: above -> 255, else 0.
pub fn binarize(region: &ImageRegion) -> GrayImage {
    let gray = region.to_grayscale();
    let threshold = otsu_threshold(&gray);
    GrayImage {
        width: region.width,
        height: region.height,
        pixels: gray
            .into_iter()
            .map(|p| if p > threshold { 255 } else { 0 })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::region::Region;

    #[test]
    fn otsu_splits_bimodal_histogram() {
        let mut gray = vec![20u8; 50];
        gray.extend(vec![200u8; 50]);
        let threshold = otsu_threshold(&gray);
        assert!((20..200).contains(&threshold), "threshold {}", threshold);
    }

    #[test]
    fn otsu_of_uniform_image_is_zero() {
        assert_eq!(otsu_threshold(&[128u8; 16]), 0);
        assert_eq!(otsu_threshold(&[]), 0);
    }

    #[test]
    fn binarize_produces_two_levels() {
        let mut data = Vec::new();
        for i in 0..16u32 {
            let v = if i % 2 == 0 { 30 } else { 220 };
            data.extend_from_slice(&[v, v, v]);
        }
        let frame = Frame::new(data, 4, 4, 1).unwrap();
        let region = frame
            .crop(&Region {
                x1: 0,
                y1: 0,
                x2: 4,
                y2: 4,
            })
            .unwrap();

        let binary = binarize(&region);
        assert_eq!(binary.pixels.len(), 16);
        assert!(binary.pixels.iter().all(|&p| p == 0 || p == 255));
        assert_eq!(binary.pixels[0], 0);
        assert_eq!(binary.pixels[1], 255);
    }

    #[test]
    fn pgm_header_matches_dimensions() {
        let image = GrayImage {
            width: 3,
            height: 2,
            pixels: vec![0; 6],
        };
        let pgm = image.to_pgm();
        assert!(pgm.starts_with(b"P5\n3 2\n255\n"));
        assert_eq!(pgm.len(), 11 + 6);
    }
}

//! Mask refinement and transparency cleanup
//!
//! Two post-processing steps run after inference:
//!
//! - [`refine_alpha`] snaps near-certain mask values to solid foreground or
//!   background and erodes the result, so compositing keeps a soft edge band
//!   instead of a hard halo.
//! - [`clean_transparency`] scrubs the composited RGBA output: near-white
//!   pixels and barely-visible pixels become fully transparent, and bright
//!   semi-transparent edge pixels are dropped.

use crate::config::MattingOptions;
use crate::types::SegmentationMask;
use image::RgbaImage;

// Cleanup constants carried over from the original processing tool
const WHITE_THRESHOLD: u8 = 240;
const MIN_VISIBLE_ALPHA: u8 = 50;
const EDGE_ALPHA_THRESHOLD: u8 = 200;
const EDGE_BRIGHTNESS_THRESHOLD: u32 = 200;

/// Refine a segmentation mask with threshold snapping and erosion
#[must_use]
pub fn refine_alpha(mask: &SegmentationMask, options: &MattingOptions) -> SegmentationMask {
    let snapped: Vec<u8> = mask
        .data
        .iter()
        .map(|&v| {
            if v >= options.foreground_threshold {
                255
            } else if v <= options.background_threshold {
                0
            } else {
                v
            }
        })
        .collect();

    let eroded = erode(&snapped, mask.dimensions, options.erode_size);
    SegmentationMask::new(eroded, mask.dimensions)
}

/// Separable minimum filter with a square structuring element of the given
/// radius; clipped at the image border
fn erode(data: &[u8], dimensions: (u32, u32), radius: u32) -> Vec<u8> {
    if radius == 0 || data.is_empty() {
        return data.to_vec();
    }

    let (width, height) = (dimensions.0 as usize, dimensions.1 as usize);
    let radius = radius as usize;

    // Horizontal pass
    let mut horizontal = vec![0u8; data.len()];
    for y in 0..height {
        let row_start = y * width;
        for x in 0..width {
            let lo = x.saturating_sub(radius);
            let hi = (x + radius).min(width - 1);
            let mut min = u8::MAX;
            for cx in lo..=hi {
                min = min.min(data.get(row_start + cx).copied().unwrap_or(0));
            }
            if let Some(out) = horizontal.get_mut(row_start + x) {
                *out = min;
            }
        }
    }

    // Vertical pass
    let mut result = vec![0u8; data.len()];
    for x in 0..width {
        for y in 0..height {
            let lo = y.saturating_sub(radius);
            let hi = (y + radius).min(height - 1);
            let mut min = u8::MAX;
            for cy in lo..=hi {
                min = min.min(horizontal.get(cy * width + x).copied().unwrap_or(0));
            }
            if let Some(out) = result.get_mut(y * width + x) {
                *out = min;
            }
        }
    }

    result
}

/// Scrub residual background out of a composited RGBA image
///
/// Near-white pixels become fully transparent white, barely-visible pixels
/// lose their remaining alpha, and bright semi-transparent edge pixels are
/// dropped entirely.
pub fn clean_transparency(image: &mut RgbaImage) {
    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;

        if r > WHITE_THRESHOLD && g > WHITE_THRESHOLD && b > WHITE_THRESHOLD {
            *pixel = image::Rgba([255, 255, 255, 0]);
            continue;
        }

        let mut alpha = a;
        if alpha < MIN_VISIBLE_ALPHA {
            alpha = 0;
        }

        if alpha > 0
            && alpha < EDGE_ALPHA_THRESHOLD
            && (u32::from(r) + u32::from(g) + u32::from(b)) / 3 > EDGE_BRIGHTNESS_THRESHOLD
        {
            alpha = 0;
        }

        pixel.0[3] = alpha;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn options() -> MattingOptions {
        MattingOptions::default()
    }

    #[test]
    fn test_refine_snaps_thresholds() {
        let mask = SegmentationMask::new(vec![250, 5, 128, 255], (2, 2));
        let refined = refine_alpha(
            &mask,
            &MattingOptions {
                foreground_threshold: 240,
                background_threshold: 10,
                erode_size: 0,
            },
        );
        assert_eq!(refined.data, vec![255, 0, 128, 255]);
    }

    #[test]
    fn test_refine_uniform_foreground_unchanged() {
        // A solid mask has no edges to erode; the border windows are clipped
        let mask = SegmentationMask::new(vec![255; 25], (5, 5));
        let refined = refine_alpha(&mask, &options());
        assert!(refined.data.iter().all(|&v| v == 255));
    }

    #[test]
    fn test_refine_erodes_isolated_spike() {
        // A single foreground pixel in a background field disappears
        let mut data = vec![0u8; 25];
        data[12] = 255; // center of 5x5
        let mask = SegmentationMask::new(data, (5, 5));
        let refined = refine_alpha(
            &mask,
            &MattingOptions {
                foreground_threshold: 240,
                background_threshold: 10,
                erode_size: 1,
            },
        );
        assert!(refined.data.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_refine_erosion_shrinks_edges() {
        // 6x6 solid block in a 10x10 field: erosion by 1 leaves a 4x4 core
        let (w, h) = (10usize, 10usize);
        let mut data = vec![0u8; w * h];
        for y in 2..8 {
            for x in 2..8 {
                data[y * w + x] = 255;
            }
        }
        let mask = SegmentationMask::new(data, (10, 10));
        let refined = refine_alpha(
            &mask,
            &MattingOptions {
                foreground_threshold: 240,
                background_threshold: 10,
                erode_size: 1,
            },
        );
        // Former boundary pixel is gone, core survives
        assert_eq!(refined.value_at(2, 2), 0);
        assert_eq!(refined.value_at(4, 4), 255);
    }

    #[test]
    fn test_clean_near_white_becomes_transparent() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([250, 250, 250, 255]));
        img.put_pixel(1, 0, Rgba([30, 30, 30, 255]));

        clean_transparency(&mut img);

        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255, 0]);
        // Dark opaque pixel untouched
        assert_eq!(img.get_pixel(1, 0).0, [30, 30, 30, 255]);
    }

    #[test]
    fn test_clean_drops_faint_alpha() {
        let mut img = RgbaImage::from_pixel(1, 1, Rgba([100, 100, 100, 40]));
        clean_transparency(&mut img);
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn test_clean_drops_bright_edge_pixels() {
        // Semi-transparent and bright: treated as background bleed
        let mut img = RgbaImage::from_pixel(1, 1, Rgba([220, 210, 205, 150]));
        clean_transparency(&mut img);
        assert_eq!(img.get_pixel(0, 0).0[3], 0);

        // Semi-transparent but dark: kept
        let mut img = RgbaImage::from_pixel(1, 1, Rgba([50, 50, 50, 150]));
        clean_transparency(&mut img);
        assert_eq!(img.get_pixel(0, 0).0[3], 150);
    }
}

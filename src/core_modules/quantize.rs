// THEORY:
// A fast alternative to clustering for devices that cannot afford k-means. The
// crop is shrunk to a fixed 50x50 grid by nearest-neighbour sampling, each pixel
// is snapped down to a multiple of 10 per channel, and the most frequent snapped
// color wins. Snapping merges near-identical shades so sensor noise does not
// split one fabric color into many single-pixel bins.
//
// The result is named by hue bucket rather than by palette: coarse words suit a
// coarse estimate. Ties between equally frequent colors go to the one seen first
// in row-major order, so the answer never depends on hash iteration order.

use crate::core_modules::color::color::Color;
use crate::core_modules::color_engine::ColorReport;
use crate::core_modules::namer::hue_name;
use crate::core_modules::region::Region;
use crate::error::{Error, Result};
use image::imageops::{FilterType, resize};
use log::debug;
use std::collections::HashMap;

/// Side of the square grid a crop is sampled down to.
pub const SAMPLE_SIDE: u32 = 50;
/// Channel step colors are snapped to.
pub const QUANTUM: u8 = 10;

/// Snaps every channel down to a multiple of `QUANTUM`.
pub fn quantize(color: &Color) -> Color {
    let snap = |channel: u8| (channel / QUANTUM) * QUANTUM;
    Color::new(snap(color.red), snap(color.green), snap(color.blue))
}

/// The most frequent quantized color of a region sampled on a 50x50 grid.
pub fn quantized_mode(region: &Region) -> Result<Color> {
    let sampled = resize(
        &region.to_rgb_image(),
        SAMPLE_SIDE,
        SAMPLE_SIDE,
        FilterType::Nearest,
    );

    let mut counts: HashMap<Color, usize> = HashMap::new();
    let mut first_seen: Vec<Color> = Vec::new();
    for pixel in sampled.pixels() {
        let color = quantize(&Color::from(*pixel));
        let count = counts.entry(color).or_insert_with(|| {
            first_seen.push(color);
            0
        });
        *count += 1;
    }

    let mut best: Option<(Color, usize)> = None;
    for color in first_seen {
        let count = counts.get(&color).copied().unwrap_or(0);
        match best {
            Some((_, best_count)) if best_count >= count => {}
            _ => best = Some((color, count)),
        }
    }

    let (mode, count) = best.ok_or_else(|| {
        Error::InvalidInput("cannot take the mode of an empty region".to_string())
    })?;
    debug!(
        "quantized mode {} covers {}/{} samples",
        mode,
        count,
        SAMPLE_SIDE * SAMPLE_SIDE
    );
    Ok(mode)
}

/// Quantized mode of a region, named by hue bucket. No preprocessing or
/// calibration is applied.
pub fn detect_dominant_color_name(region: &Region) -> Result<ColorReport> {
    let color = quantized_mode(region)?;
    Ok(ColorReport {
        rgb: color.as_tuple(),
        name: hue_name(&color),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::region::PixelLayout;
    use image::{Rgb, RgbImage};

    #[test]
    fn channels_snap_down_to_multiples_of_ten() {
        assert_eq!(quantize(&Color::new(0, 9, 10)), Color::new(0, 0, 10));
        assert_eq!(quantize(&Color::new(119, 250, 255)), Color::new(110, 250, 250));
    }

    #[test]
    fn near_shades_merge_into_one_bin() {
        // Left 60%: noisy blue shades in one bin. Right 40%: one exact yellow.
        let image = RgbImage::from_fn(100, 40, |x, y| {
            if x < 60 {
                Rgb([(x % 3) as u8, 10 + (y % 7) as u8, 201 + (x % 9) as u8])
            } else {
                Rgb([240, 220, 30])
            }
        });
        let region = Region::from_rgb_image(&image).unwrap();
        assert_eq!(quantized_mode(&region).unwrap(), Color::new(0, 10, 200));
    }

    #[test]
    fn small_regions_are_upsampled_to_the_grid() {
        let data = [200u8, 30, 30];
        let region = Region::new(&data, 1, 1, PixelLayout::Rgb).unwrap();
        let report = detect_dominant_color_name(&region).unwrap();
        assert_eq!(report.rgb, (200, 30, 30));
        assert_eq!(report.name, "vermelho claro");
    }

    #[test]
    fn equal_counts_go_to_the_first_color_seen() {
        // Already on the grid: top half green, bottom half blue, 1250 samples each.
        let image = RgbImage::from_fn(SAMPLE_SIDE, SAMPLE_SIDE, |_, y| {
            if y < SAMPLE_SIDE / 2 {
                Rgb([20, 160, 40])
            } else {
                Rgb([20, 40, 160])
            }
        });
        let region = Region::from_rgb_image(&image).unwrap();
        let report = detect_dominant_color_name(&region).unwrap();
        assert_eq!(report.rgb, (20, 160, 40));
        assert_eq!(report.name, "verde");
    }

    #[test]
    fn bgr_input_is_read_in_rgb_order() {
        let bgr = [30u8, 30, 200].repeat(4);
        let region = Region::new(&bgr, 2, 2, PixelLayout::Bgr).unwrap();
        assert_eq!(quantized_mode(&region).unwrap(), Color::new(200, 30, 30));
    }
}

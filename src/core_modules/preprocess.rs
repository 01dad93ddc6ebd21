// THEORY:
// Preprocessing stabilises a garment crop before any statistics are taken from it.
// Three fixed steps, always in this order:
// 1.  **Canonical order**: whatever the caller's layout, the engine works in RGB.
// 2.  **Smoothing**: a small Gaussian blur removes sensor and compression noise so
//     that isolated speckles cannot seed their own cluster.
// 3.  **Exposure**: a linear gain/offset (`saturate(round(gain * x + offset))`)
//     spreads the channel values and lifts dark captures. The same constants are
//     used for every crop, so two captures of one garment land close together.
//
// All steps are pure; the input region is never modified.

use crate::core_modules::color::color::saturate_channel;
use crate::core_modules::region::Region;
use image::RgbImage;

/// The three tunable preprocessing constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessSettings {
    /// Gaussian sigma in pixels. `0.0` disables smoothing.
    pub blur_sigma: f32,
    /// Linear contrast gain.
    pub contrast_gain: f64,
    /// Linear brightness offset, in channel units.
    pub brightness_offset: f64,
}

impl PreprocessSettings {
    /// Leaves pixel values untouched.
    pub const IDENTITY: PreprocessSettings = PreprocessSettings {
        blur_sigma: 0.0,
        contrast_gain: 1.0,
        brightness_offset: 0.0,
    };
}

pub fn preprocess(region: &Region, settings: &PreprocessSettings) -> RgbImage {
    let canonical = region.to_rgb_image();
    let smoothed = smooth(&canonical, settings.blur_sigma);
    adjust_exposure(smoothed, settings.contrast_gain, settings.brightness_offset)
}

/// Gaussian blur; a non-positive sigma returns the image unchanged.
pub fn smooth(image: &RgbImage, sigma: f32) -> RgbImage {
    if sigma <= 0.0 {
        return image.clone();
    }
    image::imageops::blur(image, sigma)
}

/// Applies `saturate(round(gain * x + offset))` to every channel of every pixel.
pub fn adjust_exposure(mut image: RgbImage, gain: f64, offset: f64) -> RgbImage {
    if gain == 1.0 && offset == 0.0 {
        return image;
    }
    // 256-entry table: every byte maps through the same affine transform.
    let mut table = [0u8; 256];
    for (value, mapped) in table.iter_mut().enumerate() {
        *mapped = saturate_channel(gain * value as f64 + offset);
    }
    for sample in image.iter_mut() {
        *sample = table[*sample as usize];
    }
    image
}

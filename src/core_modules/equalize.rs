// THEORY:
// Garments photographed under uneven light (a shadow across one sleeve, a bright
// window on one side) produce clusters split by brightness rather than by color.
// The lighting correction flattens those brightness differences while leaving
// the color itself alone:
//
// 1.  Convert every pixel to HSV. Hue and saturation carry the color; value
//     carries the brightness.
// 2.  Run contrast-limited adaptive histogram equalisation (CLAHE) on the value
//     channel only. The crop is split into a grid of tiles, each tile gets its own
//     clipped-histogram lookup table, and every pixel is mapped through a bilinear
//     blend of the four nearest tile tables so tile borders never show.
// 3.  Rebuild RGB from the untouched hue/saturation and the equalised value.
//
// Crops smaller than the tile grid use one tile per pixel row/column instead of
// padding, so tiny regions still equalise without reading outside the crop.

use crate::core_modules::color::color::{Color, saturate_channel};
use crate::error::{Error, Result};
use image::{GrayImage, Luma, Rgb, RgbImage};

const HISTOGRAM_BINS: usize = 256;

type Lut = [u8; HISTOGRAM_BINS];

/// Contrast-limited adaptive histogram equalisation for one 8-bit channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clahe {
    clip_limit: f64,
    tile_grid: u32,
}

impl Clahe {
    pub fn new(clip_limit: f64, tile_grid: u32) -> Result<Self> {
        if !(clip_limit > 0.0) {
            return Err(Error::Configuration(format!(
                "CLAHE clip limit must be positive, got {clip_limit}"
            )));
        }
        if tile_grid == 0 {
            return Err(Error::Configuration(
                "CLAHE tile grid must have at least one tile per axis".to_string(),
            ));
        }
        Ok(Self {
            clip_limit,
            tile_grid,
        })
    }

    pub fn apply(&self, channel: &GrayImage) -> GrayImage {
        let (width, height) = channel.dimensions();
        if width == 0 || height == 0 {
            return channel.clone();
        }

        let tile_width = width.div_ceil(self.tile_grid.min(width));
        let tile_height = height.div_ceil(self.tile_grid.min(height));
        let tiles_x = width.div_ceil(tile_width);
        let tiles_y = height.div_ceil(tile_height);

        let mut luts: Vec<Lut> = Vec::with_capacity((tiles_x * tiles_y) as usize);
        for tile_y in 0..tiles_y {
            for tile_x in 0..tiles_x {
                let x0 = tile_x * tile_width;
                let y0 = tile_y * tile_height;
                let x1 = (x0 + tile_width).min(width);
                let y1 = (y0 + tile_height).min(height);
                luts.push(self.tile_lut(channel, x0, y0, x1, y1));
            }
        }

        let lut_index = |tx: u32, ty: u32| (ty * tiles_x + tx) as usize;
        let inverse_tile_width = 1.0 / tile_width as f32;
        let inverse_tile_height = 1.0 / tile_height as f32;

        GrayImage::from_fn(width, height, |x, y| {
            let value = channel.get_pixel(x, y).0[0] as usize;

            let tyf = y as f32 * inverse_tile_height - 0.5;
            let ty1 = tyf.floor();
            let ya = tyf - ty1;
            let ty2 = ((ty1 as i64 + 1).min(tiles_y as i64 - 1)).max(0) as u32;
            let ty1 = (ty1 as i64).max(0) as u32;

            let txf = x as f32 * inverse_tile_width - 0.5;
            let tx1 = txf.floor();
            let xa = txf - tx1;
            let tx2 = ((tx1 as i64 + 1).min(tiles_x as i64 - 1)).max(0) as u32;
            let tx1 = (tx1 as i64).max(0) as u32;

            let top = luts[lut_index(tx1, ty1)][value] as f32 * (1.0 - xa)
                + luts[lut_index(tx2, ty1)][value] as f32 * xa;
            let bottom = luts[lut_index(tx1, ty2)][value] as f32 * (1.0 - xa)
                + luts[lut_index(tx2, ty2)][value] as f32 * xa;
            Luma([saturate_channel((top * (1.0 - ya) + bottom * ya) as f64)])
        })
    }

    /// Clipped, redistributed, cumulative histogram of one tile.
    fn tile_lut(&self, channel: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) -> Lut {
        let mut histogram = [0u32; HISTOGRAM_BINS];
        for y in y0..y1 {
            for x in x0..x1 {
                histogram[channel.get_pixel(x, y).0[0] as usize] += 1;
            }
        }
        let area = (x1 - x0) * (y1 - y0);

        let clip = ((self.clip_limit * area as f64 / HISTOGRAM_BINS as f64) as u32).max(1);
        let mut clipped = 0u32;
        for bin in histogram.iter_mut() {
            if *bin > clip {
                clipped += *bin - clip;
                *bin = clip;
            }
        }

        let batch = clipped / HISTOGRAM_BINS as u32;
        let mut residual = clipped - batch * HISTOGRAM_BINS as u32;
        for bin in histogram.iter_mut() {
            *bin += batch;
        }
        if residual > 0 {
            let step = (HISTOGRAM_BINS / residual as usize).max(1);
            for bin in histogram.iter_mut().step_by(step) {
                if residual == 0 {
                    break;
                }
                *bin += 1;
                residual -= 1;
            }
        }

        let scale = (HISTOGRAM_BINS - 1) as f64 / area as f64;
        let mut lut = [0u8; HISTOGRAM_BINS];
        let mut cumulative = 0u32;
        for (entry, count) in lut.iter_mut().zip(histogram.iter()) {
            cumulative += count;
            *entry = saturate_channel(cumulative as f64 * scale);
        }
        lut
    }
}

/// Equalises brightness through the HSV value channel, keeping hue and saturation.
pub fn equalize_value_channel(image: &RgbImage, clahe: &Clahe) -> RgbImage {
    let (width, height) = image.dimensions();
    let hsv: Vec<_> = image.pixels().map(|pixel| Color::from(*pixel).to_hsv()).collect();

    let value_channel = GrayImage::from_fn(width, height, |x, y| {
        Luma([hsv[(y * width + x) as usize].value])
    });
    let equalized = clahe.apply(&value_channel);

    RgbImage::from_fn(width, height, |x, y| {
        let index = (y * width + x) as usize;
        let new_value = equalized.get_pixel(x, y).0[0];
        Rgb(hsv[index].with_value(new_value).to_color().channels())
    })
}

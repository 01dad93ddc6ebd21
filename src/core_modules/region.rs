// THEORY:
// The `Region` module is the bridge between caller-owned pixel buffers and the
// color engine. A `Region` is a borrowed, read-only view over one cropped garment:
// the engine never retains it past a single call, and never copies it until the
// preprocessing stage has to produce a canonical RGB buffer anyway.
//
// Key architectural principles:
// 1.  **Validated Shape**: A region knows its width, height, and channel layout,
//     and refuses to exist if the buffer length disagrees with them or if it
//     holds no pixels at all. Every later stage can rely on that invariant.
// 2.  **Layout Awareness**: Cameras and decoders disagree on channel order. The
//     layout travels with the bytes, so canonicalisation to RGB happens exactly
//     once, in `to_rgb_image`, and nothing downstream has to guess.
// 3.  **Detector Glue**: Detectors report boxes in normalised image coordinates.
//     `crop_normalized` turns such a box into a pixel crop, clamping it to the
//     frame the same way for every caller.

use crate::core_modules::color::color::Color;
use crate::error::{Error, Result};
use image::{GrayImage, Rgb, RgbImage, RgbaImage};

/// Channel order and count of a raw pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PixelLayout {
    Gray,
    Rgb,
    Bgr,
    Rgba,
    Bgra,
}

impl PixelLayout {
    pub fn channels(&self) -> usize {
        match self {
            PixelLayout::Gray => 1,
            PixelLayout::Rgb | PixelLayout::Bgr => 3,
            PixelLayout::Rgba | PixelLayout::Bgra => 4,
        }
    }

    /// True for the plain 3-channel color layouts the lighting correction accepts.
    pub fn is_three_channel(&self) -> bool {
        self.channels() == 3
    }

    /// Byte offsets of the red, green and blue samples within one pixel.
    fn rgb_offsets(&self) -> [usize; 3] {
        match self {
            PixelLayout::Gray => [0, 0, 0],
            PixelLayout::Rgb | PixelLayout::Rgba => [0, 1, 2],
            PixelLayout::Bgr | PixelLayout::Bgra => [2, 1, 0],
        }
    }
}

/// A borrowed, validated view over a cropped block of pixels.
#[derive(Debug, Clone, Copy)]
pub struct Region<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    layout: PixelLayout,
}

impl<'a> Region<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32, layout: PixelLayout) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidInput(format!(
                "region has no pixels ({width}x{height})"
            )));
        }
        let expected = width as usize * height as usize * layout.channels();
        if data.len() != expected {
            return Err(Error::InvalidInput(format!(
                "buffer holds {} bytes but a {width}x{height} {layout:?} region needs {expected}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            layout,
        })
    }

    /// Builds a region from raw bytes and a channel count, the way array-based
    /// callers describe their buffers. 3-channel data is taken as RGB.
    pub fn from_channels(data: &'a [u8], width: u32, height: u32, channels: usize) -> Result<Self> {
        let layout = match channels {
            1 => PixelLayout::Gray,
            3 => PixelLayout::Rgb,
            4 => PixelLayout::Rgba,
            other => {
                return Err(Error::InvalidInput(format!(
                    "unsupported channel count {other}; expected 1, 3 or 4"
                )));
            }
        };
        Self::new(data, width, height, layout)
    }

    pub fn from_rgb_image(image: &'a RgbImage) -> Result<Self> {
        Self::new(image.as_raw(), image.width(), image.height(), PixelLayout::Rgb)
    }

    pub fn from_rgba_image(image: &'a RgbaImage) -> Result<Self> {
        Self::new(image.as_raw(), image.width(), image.height(), PixelLayout::Rgba)
    }

    pub fn from_gray_image(image: &'a GrayImage) -> Result<Self> {
        Self::new(image.as_raw(), image.width(), image.height(), PixelLayout::Gray)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Reads one pixel in canonical RGB order. Gray is replicated, alpha is dropped.
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        let channels = self.layout.channels();
        let byte_index = ((y as usize * self.width as usize) + x as usize) * channels;
        let [r, g, b] = self.layout.rgb_offsets();
        Color::new(
            self.data[byte_index + r],
            self.data[byte_index + g],
            self.data[byte_index + b],
        )
    }

    /// Copies the region into an owned, canonical RGB buffer.
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            Rgb(self.pixel(x, y).channels())
        })
    }

    pub fn to_owned_region(&self) -> OwnedRegion {
        OwnedRegion {
            data: self.data.to_vec(),
            width: self.width,
            height: self.height,
            layout: self.layout,
        }
    }
}

/// An owned pixel buffer that can cross task boundaries. Validated again each
/// time it is borrowed as a `Region`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedRegion {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
}

impl OwnedRegion {
    pub fn new(data: Vec<u8>, width: u32, height: u32, layout: PixelLayout) -> Self {
        Self {
            data,
            width,
            height,
            layout,
        }
    }

    pub fn as_region(&self) -> Result<Region<'_>> {
        Region::new(&self.data, self.width, self.height, self.layout)
    }
}

impl From<RgbImage> for OwnedRegion {
    fn from(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, PixelLayout::Rgb)
    }
}

/// A detector box in normalised [0, 1] image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingBox {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// Crops a normalised detector box out of a frame.
///
/// The origin is clamped into the frame and the size into `[1, remaining]`, so a
/// box that pokes past the border still yields the visible part. A box whose
/// origin lies on or past the far edge has no visible part and is rejected.
pub fn crop_normalized(image: &RgbImage, bbox: &BoundingBox) -> Result<RgbImage> {
    let (image_width, image_height) = image.dimensions();
    let corners = [bbox.left, bbox.top, bbox.right, bbox.bottom];
    if !corners.iter().all(|v| v.is_finite()) {
        return Err(Error::InvalidInput(format!("bounding box is not finite: {bbox:?}")));
    }

    let x = ((bbox.left * image_width as f32) as i64).clamp(0, image_width as i64) as u32;
    let y = ((bbox.top * image_height as f32) as i64).clamp(0, image_height as i64) as u32;
    if x >= image_width || y >= image_height {
        return Err(Error::InvalidInput(format!(
            "bounding box {bbox:?} starts outside the {image_width}x{image_height} frame"
        )));
    }

    let width = ((bbox.width() * image_width as f32) as i64)
        .clamp(1, (image_width - x) as i64) as u32;
    let height = ((bbox.height() * image_height as f32) as i64)
        .clamp(1, (image_height - y) as i64) as u32;

    Ok(image::imageops::crop_imm(image, x, y, width, height).to_image())
}

/// Crops a pixel-space box `[x1, x2) x [y1, y2)` out of a frame, clamped to its bounds.
pub fn crop_pixels(image: &RgbImage, x1: u32, y1: u32, x2: u32, y2: u32) -> Result<RgbImage> {
    let (image_width, image_height) = image.dimensions();
    let x2 = x2.min(image_width);
    let y2 = y2.min(image_height);
    if x2 <= x1 || y2 <= y1 {
        return Err(Error::InvalidInput(format!(
            "crop ({x1}, {y1})-({x2}, {y2}) is empty inside the \
             {image_width}x{image_height} frame"
        )));
    }
    Ok(image::imageops::crop_imm(image, x1, y1, x2 - x1, y2 - y1).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_mismatched_buffers() {
        assert!(matches!(
            Region::new(&[], 0, 0, PixelLayout::Rgb),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            Region::new(&[1, 2, 3, 4], 1, 1, PixelLayout::Rgb),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            Region::from_channels(&[1, 2], 1, 1, 2),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn reads_every_layout_as_rgb() {
        let bgr = [30u8, 20, 10];
        let region = Region::new(&bgr, 1, 1, PixelLayout::Bgr).unwrap();
        assert_eq!(region.pixel(0, 0), Color::new(10, 20, 30));

        let bgra = [30u8, 20, 10, 255];
        let region = Region::new(&bgra, 1, 1, PixelLayout::Bgra).unwrap();
        assert_eq!(region.pixel(0, 0), Color::new(10, 20, 30));

        let rgba = [10u8, 20, 30, 0];
        let region = Region::from_channels(&rgba, 1, 1, 4).unwrap();
        assert_eq!(region.pixel(0, 0), Color::new(10, 20, 30));

        let gray = [77u8];
        let region = Region::from_channels(&gray, 1, 1, 1).unwrap();
        assert_eq!(region.pixel(0, 0), Color::new(77, 77, 77));
    }

    #[test]
    fn image_buffers_borrow_with_their_layout() {
        let rgba = RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 128]));
        let region = Region::from_rgba_image(&rgba).unwrap();
        assert_eq!(region.layout(), PixelLayout::Rgba);
        assert_eq!((region.width(), region.height()), (3, 2));
        assert_eq!(region.pixel(2, 1), Color::new(10, 20, 30));

        let gray = GrayImage::from_fn(2, 2, |x, y| image::Luma([(x + 2 * y) as u8 * 50]));
        let region = Region::from_gray_image(&gray).unwrap();
        assert_eq!(region.layout(), PixelLayout::Gray);
        assert_eq!(region.pixel(1, 1), Color::new(150, 150, 150));
        assert_eq!(region.to_rgb_image().get_pixel(0, 1).0, [100, 100, 100]);
    }

    #[test]
    fn canonical_copy_keeps_pixel_positions() {
        // 2x2 BGR: top-left blue, bottom-right red.
        let data = [255u8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 255];
        let region = Region::new(&data, 2, 2, PixelLayout::Bgr).unwrap();
        let rgb = region.to_rgb_image();
        assert_eq!(rgb.get_pixel(0, 0).0, [0, 0, 255]);
        assert_eq!(rgb.get_pixel(1, 1).0, [255, 0, 0]);
        assert_eq!(rgb.get_pixel(1, 0).0, [0, 0, 0]);
    }

    #[test]
    fn owned_copy_borrows_back_as_the_same_region() {
        let data = [1u8, 2, 3, 4, 5, 6];
        let region = Region::new(&data, 2, 1, PixelLayout::Bgr).unwrap();
        let owned = region.to_owned_region();
        let borrowed = owned.as_region().unwrap();
        assert_eq!(borrowed.pixel(1, 0), region.pixel(1, 0));

        let broken = OwnedRegion::new(vec![0; 5], 2, 1, PixelLayout::Rgb);
        assert!(matches!(broken.as_region(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn normalized_crop_is_clamped_to_the_frame() {
        let frame = RgbImage::from_fn(8, 8, |x, y| Rgb([x as u8, y as u8, 0]));

        let crop = crop_normalized(&frame, &BoundingBox::new(0.25, 0.375, 0.5, 1.0)).unwrap();
        assert_eq!(crop.dimensions(), (2, 5));
        assert_eq!(crop.get_pixel(0, 0).0, [2, 3, 0]);

        let overflow = crop_normalized(&frame, &BoundingBox::new(0.75, -0.5, 1.75, 0.5)).unwrap();
        assert_eq!(overflow.dimensions(), (2, 8));
        assert_eq!(overflow.get_pixel(0, 0).0, [6, 0, 0]);

        let degenerate = crop_normalized(&frame, &BoundingBox::new(0.5, 0.5, 0.5, 0.5)).unwrap();
        assert_eq!(degenerate.dimensions(), (1, 1));

        assert!(crop_normalized(&frame, &BoundingBox::new(1.0, 0.0, 1.25, 1.0)).is_err());
        assert!(crop_normalized(&frame, &BoundingBox::new(f32::NAN, 0.0, 1.0, 1.0)).is_err());
    }

    #[test]
    fn pixel_crop_rejects_empty_boxes() {
        let frame = RgbImage::new(4, 4);
        assert_eq!(crop_pixels(&frame, 1, 1, 3, 9).unwrap().dimensions(), (2, 3));
        assert!(crop_pixels(&frame, 3, 0, 3, 4).is_err());
        assert!(crop_pixels(&frame, 5, 0, 8, 4).is_err());
    }
}

//! The owned in-memory raster that every operation works on.
//!
//! A [`Bitmap`] is always 8 bits per channel and either opaque RGB or RGBA.
//! Decoders normalize whatever the source container held into one of those
//! two layouts; transforms keep the layout unless they have to add an alpha
//! channel. The pixel buffer is freed when the bitmap is dropped.

use super::error::{ImagingError, Result};
use image::{DynamicImage, ExtendedColorType, RgbImage, RgbaImage};

/// Per-pixel layout of a [`Bitmap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorModel {
    Rgb,
    Rgba,
}

impl ColorModel {
    pub fn name(self) -> &'static str {
        match self {
            Self::Rgb => "rgb",
            Self::Rgba => "rgba",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Pixels {
    Rgb(RgbImage),
    Rgba(RgbaImage),
}

/// A decoded, pixel-addressable image with non-zero width and height.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    pub(super) pixels: Pixels,
}

fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(ImagingError::InvalidDimensions(format!(
            "bitmap must be at least 1x1, got {width}x{height}"
        )));
    }
    Ok(())
}

impl Bitmap {
    pub fn from_rgb(image: RgbImage) -> Result<Self> {
        check_dimensions(image.width(), image.height())?;
        Ok(Self {
            pixels: Pixels::Rgb(image),
        })
    }

    pub fn from_rgba(image: RgbaImage) -> Result<Self> {
        check_dimensions(image.width(), image.height())?;
        Ok(Self {
            pixels: Pixels::Rgba(image),
        })
    }

    /// Normalize any decoded image to 8-bit RGB or RGBA.
    ///
    /// Sources with an alpha channel (including palette transparency the
    /// decoder expanded) keep it; everything else becomes opaque RGB.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self> {
        match image {
            DynamicImage::ImageRgb8(rgb) => Self::from_rgb(rgb),
            DynamicImage::ImageRgba8(rgba) => Self::from_rgba(rgba),
            other if other.color().has_alpha() => Self::from_rgba(other.to_rgba8()),
            other => Self::from_rgb(other.to_rgb8()),
        }
    }

    pub fn width(&self) -> u32 {
        match &self.pixels {
            Pixels::Rgb(img) => img.width(),
            Pixels::Rgba(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match &self.pixels {
            Pixels::Rgb(img) => img.height(),
            Pixels::Rgba(img) => img.height(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn color_model(&self) -> ColorModel {
        match &self.pixels {
            Pixels::Rgb(_) => ColorModel::Rgb,
            Pixels::Rgba(_) => ColorModel::Rgba,
        }
    }

    pub fn has_alpha(&self) -> bool {
        self.color_model() == ColorModel::Rgba
    }

    /// Read one pixel as RGBA; opaque bitmaps report alpha 255.
    ///
    /// Returns `None` outside the bitmap.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        Some(match &self.pixels {
            Pixels::Rgb(img) => {
                let [r, g, b] = img.get_pixel(x, y).0;
                [r, g, b, 255]
            }
            Pixels::Rgba(img) => img.get_pixel(x, y).0,
        })
    }

    /// Raw interleaved channel bytes, row-major.
    pub fn as_raw(&self) -> &[u8] {
        match &self.pixels {
            Pixels::Rgb(img) => img.as_raw(),
            Pixels::Rgba(img) => img.as_raw(),
        }
    }

    pub(crate) fn extended_color_type(&self) -> ExtendedColorType {
        match &self.pixels {
            Pixels::Rgb(_) => ExtendedColorType::Rgb8,
            Pixels::Rgba(_) => ExtendedColorType::Rgba8,
        }
    }

    /// Copy of the pixels as RGBA, adding an opaque alpha channel if needed.
    pub fn to_rgba8(&self) -> RgbaImage {
        match &self.pixels {
            Pixels::Rgb(img) => DynamicImage::ImageRgb8(img.clone()).into_rgba8(),
            Pixels::Rgba(img) => img.clone(),
        }
    }

    pub fn into_dynamic(self) -> DynamicImage {
        match self.pixels {
            Pixels::Rgb(img) => DynamicImage::ImageRgb8(img),
            Pixels::Rgba(img) => DynamicImage::ImageRgba8(img),
        }
    }

    /// Switch an opaque bitmap to RGBA in place. No-op if already RGBA.
    pub(super) fn promote_to_rgba(&mut self) {
        if let Pixels::Rgb(img) = &self.pixels {
            let rgba = DynamicImage::ImageRgb8(img.clone()).into_rgba8();
            self.pixels = Pixels::Rgba(rgba);
        }
    }
}

//! Geometric and color transforms on a [`Bitmap`].
//!
//! | Operation | Effect |
//! |---|---|
//! | [`Bitmap::resize`] | Proportional fit into a box (Lanczos3), optional upscaling |
//! | [`Bitmap::crop`] | Fill-resize then center-crop to exact dimensions |
//! | [`Bitmap::trim_borders`] | Strip uniform margins of a given color |
//! | [`Bitmap::recolor_near`] | Replace every pixel near a reference color |
//! | [`Bitmap::flatten`] | Composite onto an opaque background (new bitmap) |
//!
//! Mutating transforms compute the replacement buffer first and swap it in
//! only on success, so a failed call leaves the bitmap exactly as it was.

use super::bitmap::{Bitmap, Pixels};
use super::calculations::{calculate_fill_dimensions, calculate_fit_dimensions, center_offset};
use super::error::{ImagingError, Result};
use super::params::Color;
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Pixel, Rgb, RgbImage, Rgba};
use tracing::{debug, instrument};

/// Interpolating filter for every resample step.
const RESAMPLE_FILTER: FilterType = FilterType::Lanczos3;

/// Channel value of a fully transparent replacement pixel.
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

type Buffer<P> = ImageBuffer<P, Vec<u8>>;

fn resample<P>(img: &Buffer<P>, width: u32, height: u32) -> Buffer<P>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    imageops::resize(img, width, height, RESAMPLE_FILTER)
}

fn fill_and_crop<P>(img: &Buffer<P>, fill: (u32, u32), target: (u32, u32)) -> Buffer<P>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let x = center_offset(fill.0, target.0);
    let y = center_offset(fill.1, target.1);
    if img.dimensions() == fill {
        return imageops::crop_imm(img, x, y, target.0, target.1).to_image();
    }
    let filled = resample(img, fill.0, fill.1);
    imageops::crop_imm(&filled, x, y, target.0, target.1).to_image()
}

fn blend_channel(source: u8, background: u8, alpha: u8) -> u8 {
    let (s, b, a) = (source as u32, background as u32, alpha as u32);
    ((s * a + b * (255 - a) + 127) / 255) as u8
}

impl Bitmap {
    fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        match &self.pixels {
            Pixels::Rgb(img) => img.get_pixel(x, y).0,
            Pixels::Rgba(img) => {
                let [r, g, b, _] = img.get_pixel(x, y).0;
                [r, g, b]
            }
        }
    }

    /// Scale proportionally to fit inside `max_width` x `max_height`.
    ///
    /// Only shrinks, unless `allow_enlarge` is set and the image is smaller
    /// than the box. When no resize is needed the bitmap is left untouched
    /// (no copy is made). See [`calculate_fit_dimensions`] for the math.
    #[instrument(level = "debug", skip(self), fields(source = ?self.dimensions()))]
    pub fn resize(&mut self, max_width: u32, max_height: u32, allow_enlarge: bool) -> Result<()> {
        if max_width == 0 || max_height == 0 {
            return Err(ImagingError::InvalidDimensions(format!(
                "resize box must be non-zero, got {max_width}x{max_height}"
            )));
        }
        let Some((width, height)) =
            calculate_fit_dimensions(self.dimensions(), (max_width, max_height), allow_enlarge)
        else {
            debug!("already fits, skipping resize");
            return Ok(());
        };
        if width == 0 || height == 0 {
            return Err(ImagingError::InvalidDimensions(format!(
                "resizing {}x{} into {max_width}x{max_height} collapses to {width}x{height}",
                self.width(),
                self.height()
            )));
        }

        self.pixels = match &self.pixels {
            Pixels::Rgb(img) => Pixels::Rgb(resample(img, width, height)),
            Pixels::Rgba(img) => Pixels::Rgba(resample(img, width, height)),
        };
        debug!(width, height, "resized");
        Ok(())
    }

    /// Resize and center-crop to exactly `target_width` x `target_height`.
    ///
    /// The image is first scaled so it covers the target (one edge matches,
    /// the other overshoots), then the overshoot is trimmed equally from both
    /// sides. Sources smaller than the target are scaled up.
    #[instrument(level = "debug", skip(self), fields(source = ?self.dimensions()))]
    pub fn crop(&mut self, target_width: u32, target_height: u32) -> Result<()> {
        if target_width == 0 || target_height == 0 {
            return Err(ImagingError::InvalidDimensions(format!(
                "crop target must be non-zero, got {target_width}x{target_height}"
            )));
        }
        let target = (target_width, target_height);
        if self.dimensions() == target {
            return Ok(());
        }

        let Some(fill) = calculate_fill_dimensions(self.dimensions(), target) else {
            return Err(ImagingError::InvalidDimensions(format!(
                "cropping {}x{} to {target_width}x{target_height} needs an edge beyond {}",
                self.width(),
                self.height(),
                u32::MAX
            )));
        };
        self.pixels = match &self.pixels {
            Pixels::Rgb(img) => Pixels::Rgb(fill_and_crop(img, fill, target)),
            Pixels::Rgba(img) => Pixels::Rgba(fill_and_crop(img, fill, target)),
        };
        debug!(fill = ?fill, "cropped");
        Ok(())
    }

    /// Remove margins whose every pixel matches `border_color`.
    ///
    /// Each edge is scanned inward on the original pixels independently of
    /// the others, stopping at the first row or column that contains a pixel
    /// with any channel further than `tolerance` from `border_color`. Fails
    /// with [`ImagingError::InvalidCropResult`] when nothing would remain.
    #[instrument(level = "debug", skip(self), fields(source = ?self.dimensions()))]
    pub fn trim_borders(&mut self, border_color: Color, tolerance: u8) -> Result<()> {
        let (width, height) = self.dimensions();
        let is_border = |x: u32, y: u32| border_color.matches(self.rgb_at(x, y), tolerance);
        let border_row = |y: u32| (0..width).all(|x| is_border(x, y));
        let border_col = |x: u32| (0..height).all(|y| is_border(x, y));

        let top = (0..height).take_while(|&y| border_row(y)).count() as i64;
        let bottom = (0..height).rev().take_while(|&y| border_row(y)).count() as i64;
        let left = (0..width).take_while(|&x| border_col(x)).count() as i64;
        let right = (0..width).rev().take_while(|&x| border_col(x)).count() as i64;

        let new_width = width as i64 - left - right;
        let new_height = height as i64 - top - bottom;
        if new_width <= 0 || new_height <= 0 {
            return Err(ImagingError::InvalidCropResult {
                width: new_width,
                height: new_height,
            });
        }
        if (new_width, new_height) == (width as i64, height as i64) {
            return Ok(());
        }

        let (x, y) = (left as u32, top as u32);
        let (w, h) = (new_width as u32, new_height as u32);
        self.pixels = match &self.pixels {
            Pixels::Rgb(img) => Pixels::Rgb(imageops::crop_imm(img, x, y, w, h).to_image()),
            Pixels::Rgba(img) => Pixels::Rgba(imageops::crop_imm(img, x, y, w, h).to_image()),
        };
        debug!(top, bottom, left, right, "trimmed borders");
        Ok(())
    }

    /// Replace every pixel within `tolerance` of `reference` (per channel).
    ///
    /// Matching pixels become `replacement` at full opacity, or fully
    /// transparent when `replacement` is `None`; an opaque bitmap gains an
    /// alpha channel in that case. All matching pixels are replaced, whether
    /// or not they are connected. Returns the number of pixels replaced.
    #[instrument(level = "debug", skip(self), fields(source = ?self.dimensions()))]
    pub fn recolor_near(
        &mut self,
        reference: Color,
        replacement: Option<Color>,
        tolerance: u8,
    ) -> usize {
        let near = |rgb: [u8; 3]| reference.matches(rgb, tolerance);

        if replacement.is_none() && !self.has_alpha() {
            let (width, height) = self.dimensions();
            let any = (0..height).any(|y| (0..width).any(|x| near(self.rgb_at(x, y))));
            if !any {
                return 0;
            }
            self.promote_to_rgba();
        }

        let mut replaced = 0;
        match (&mut self.pixels, replacement) {
            (Pixels::Rgb(img), Some(color)) => {
                for pixel in img.pixels_mut().filter(|p| near(p.0)) {
                    *pixel = Rgb(color.channels());
                    replaced += 1;
                }
            }
            (Pixels::Rgba(img), replacement) => {
                let new_pixel = replacement
                    .map(|c| Rgba([c.red, c.green, c.blue, 255]))
                    .unwrap_or(TRANSPARENT);
                for pixel in img.pixels_mut() {
                    let [r, g, b, _] = pixel.0;
                    if near([r, g, b]) {
                        *pixel = new_pixel;
                        replaced += 1;
                    }
                }
            }
            // Promoted above
            (Pixels::Rgb(_), None) => {}
        }
        debug!(replaced, "recolored");
        replaced
    }

    /// Composite onto an opaque `background`, returning a new RGB bitmap.
    ///
    /// Partially transparent pixels blend proportionally to their alpha.
    /// The receiver is not modified.
    pub fn flatten(&self, background: Color) -> Bitmap {
        let pixels = match &self.pixels {
            Pixels::Rgb(img) => img.clone(),
            Pixels::Rgba(img) => {
                let bg = background.channels();
                RgbImage::from_fn(img.width(), img.height(), |x, y| {
                    let [r, g, b, a] = img.get_pixel(x, y).0;
                    Rgb([
                        blend_channel(r, bg[0], a),
                        blend_channel(g, bg[1], a),
                        blend_channel(b, bg[2], a),
                    ])
                })
            }
        };
        Bitmap {
            pixels: Pixels::Rgb(pixels),
        }
    }
}

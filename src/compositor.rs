//! Pure image operations applied to remote results
//!
//! Checkerboard synthesis, background substitution, thumbnailing and the
//! side-by-side join. Nothing here touches the network; the `_file` variants are
//! thin wrappers reading and writing the paths they are given.

use crate::{
    config::{BackgroundSpec, OutputFormat},
    error::{ClipdropError, Result},
    services::ImageIOService,
};
use image::{imageops::FilterType, DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use std::path::Path;

/// Parameters of the synthesized checkerboard
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckerboardParams {
    /// Output channels, 1 (grayscale) or 3 (RGB)
    pub channels: u8,
    /// Tiles along each axis; each tile holds a 2x2 block of squares
    pub tiles: u32,
    /// Intensity of the light squares in `[0, 1]`
    pub fg: f32,
    /// Intensity of the dark squares in `[0, 1]`
    pub bg: f32,
}

impl Default for CheckerboardParams {
    fn default() -> Self {
        Self {
            channels: 3,
            tiles: 16,
            fg: 0.95,
            bg: 0.6,
        }
    }
}

impl CheckerboardParams {
    /// Quantized light intensity
    #[must_use]
    pub fn fg_value(&self) -> u8 {
        quantize(self.fg)
    }

    /// Quantized dark intensity
    #[must_use]
    pub fn bg_value(&self) -> u8 {
        quantize(self.bg)
    }

    fn validate(&self) -> Result<()> {
        if self.tiles == 0 {
            return Err(ClipdropError::config_value_error("checkerboard tiles", 0, ">= 1", Some(16)));
        }
        if !matches!(self.channels, 1 | 3) {
            return Err(ClipdropError::config_value_error(
                "checkerboard channels",
                self.channels,
                "1 or 3",
                Some(3),
            ));
        }
        Ok(())
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn quantize(value: f32) -> u8 {
    // clamped to [0, 255] before the cast
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Side length of one square along an axis of `dim` pixels
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn square_size(dim: u32, tiles: u32) -> u32 {
    let size = (f64::from(dim) / f64::from(tiles) / 2.0).ceil() as u32;
    size.max(1)
}

/// Image compositing operations
pub struct ImageCompositor;

impl ImageCompositor {
    /// Checkerboard of exactly `height` x `width` with the default parameters
    ///
    /// # Examples
    /// ```rust
    /// use clipdrop_batch::compositor::ImageCompositor;
    ///
    /// let board = ImageCompositor::checkerboard(64, 48).to_rgb8();
    /// assert_eq!(board.dimensions(), (48, 64));
    /// assert_eq!(board.get_pixel(0, 0).0, [242, 242, 242]);
    /// ```
    #[must_use]
    pub fn checkerboard(height: u32, width: u32) -> DynamicImage {
        let params = CheckerboardParams::default();
        DynamicImage::ImageRgb8(Self::board_rgb(height, width, &params))
    }

    /// Checkerboard with explicit parameters
    ///
    /// # Errors
    /// - `tiles` is zero or `channels` is not 1 or 3
    pub fn checkerboard_with(
        height: u32,
        width: u32,
        params: &CheckerboardParams,
    ) -> Result<DynamicImage> {
        params.validate()?;

        if params.channels == 1 {
            let rgb = Self::board_rgb(height, width, params);
            let gray = GrayImage::from_fn(width, height, |x, y| Luma([rgb.get_pixel(x, y)[0]]));
            Ok(DynamicImage::ImageLuma8(gray))
        } else {
            Ok(DynamicImage::ImageRgb8(Self::board_rgb(height, width, params)))
        }
    }

    fn board_rgb(height: u32, width: u32, params: &CheckerboardParams) -> RgbImage {
        let sq_h = square_size(height, params.tiles);
        let sq_w = square_size(width, params.tiles);
        let fg = params.fg_value();
        let bg = params.bg_value();

        RgbImage::from_fn(width, height, |x, y| {
            let value = if (y / sq_h + x / sq_w) % 2 == 0 { fg } else { bg };
            Rgb([value, value, value])
        })
    }

    /// Flatten `foreground` onto a new background using its alpha channel
    ///
    /// The result has the foreground's size and no alpha channel.
    #[must_use]
    pub fn composite(foreground: &DynamicImage, background: &BackgroundSpec) -> RgbImage {
        let fg = foreground.to_rgba8();
        let (width, height) = fg.dimensions();

        let mut canvas = match background {
            BackgroundSpec::Checkerboard => {
                Self::board_rgb(height, width, &CheckerboardParams::default())
            },
            BackgroundSpec::Solid(color) => RgbImage::from_pixel(width, height, *color),
        };

        for (x, y, pixel) in fg.enumerate_pixels() {
            let alpha = u32::from(pixel[3]);
            if alpha == 0 {
                continue;
            }
            let under = canvas.get_pixel_mut(x, y);
            for channel in 0..3 {
                under[channel] = blend(pixel[channel], under[channel], alpha);
            }
        }

        canvas
    }

    /// Read `input`, composite it, write the result to `output` as PNG
    pub fn composite_file(input: &Path, output: &Path, background: &BackgroundSpec) -> Result<()> {
        let foreground = ImageIOService::load_image(input)?;
        let flattened = DynamicImage::ImageRgb8(Self::composite(&foreground, background));
        ImageIOService::save_image(&flattened, output, OutputFormat::Png)
    }

    /// Shrink to fit within `max_size` keeping the aspect ratio
    ///
    /// Images already within bounds keep their size. The result is opaque RGB.
    #[must_use]
    pub fn resize(image: &DynamicImage, max_size: (u32, u32)) -> RgbImage {
        let (max_w, max_h) = max_size;
        if image.width() <= max_w && image.height() <= max_h {
            return image.to_rgb8();
        }
        image
            .resize(max_w.max(1), max_h.max(1), FilterType::Lanczos3)
            .to_rgb8()
    }

    /// Lay images left to right on a black canvas
    ///
    /// # Errors
    /// - `images` is empty
    pub fn join(images: &[DynamicImage]) -> Result<RgbImage> {
        if images.is_empty() {
            return Err(ClipdropError::processing("Cannot join an empty list of images"));
        }

        let total_width: u32 = images.iter().map(DynamicImage::width).sum();
        let max_height = images.iter().map(DynamicImage::height).max().unwrap_or(0);

        let mut canvas = RgbImage::new(total_width, max_height);
        let mut x_offset = 0i64;
        for image in images {
            image::imageops::replace(&mut canvas, &image.to_rgb8(), x_offset, 0);
            x_offset += i64::from(image.width());
        }

        Ok(canvas)
    }

    /// Join image files and write the result to `output`
    ///
    /// `output` may be one of the inputs; all inputs are decoded before writing.
    pub fn join_files(inputs: &[&Path], output: &Path, format: OutputFormat) -> Result<()> {
        let images = inputs
            .iter()
            .map(|path| ImageIOService::load_image(path))
            .collect::<Result<Vec<_>>>()?;
        let joined = DynamicImage::ImageRgb8(Self::join(&images)?);
        ImageIOService::save_image(&joined, output, format)
    }
}

/// `fg * a + bg * (255 - a)` over 255, rounded
#[allow(clippy::cast_possible_truncation)]
fn blend(fg: u8, bg: u8, alpha: u32) -> u8 {
    // at most (255 * 255 + 127) / 255 = 255
    ((u32::from(fg) * alpha + u32::from(bg) * (255 - alpha) + 127) / 255) as u8
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor applies grayscale, smoothing, border padding, contrast and the
// heavier filters from `crate::filters`, chained over one in-memory image
// using the `image` and `imageproc` crates.

use std::path::Path;

use image::{DynamicImage, GrayImage, ImageBuffer, ImageReader, Luma, Rgba, RgbaImage};
use imageproc::filter::bilateral_filter;
use lesewerk_core::error::LesewerkError;
use tracing::{debug, info, instrument};

use crate::filters;

/// Bilateral filter settings used by [`ImageProcessor::smooth`]: a 9 px
/// window, and colour and spatial sigmas of 75.
pub const BILATERAL_WINDOW: u32 = 9;
pub const BILATERAL_SIGMA_COLOR: f32 = 75.0;
pub const BILATERAL_SIGMA_SPATIAL: f32 = 75.0;

/// Image processing chain operating on a single in-memory image.
///
/// All operations consume `self` and return a new `ImageProcessor` wrapping
/// the transformed image, so the working buffer has exactly one owner at a
/// time.
///
/// ```ignore
/// let img = ImageProcessor::open("receipt.png")?
///     .grayscale()
///     .add_border(6)
///     .into_dynamic();
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Decode an image file. The format is sniffed from the file content,
    /// so the extension does not have to match it.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LesewerkError> {
        let path = path.as_ref();
        let read_err = |reason: String| LesewerkError::ImageRead {
            path: path.to_path_buf(),
            reason,
        };
        let img = ImageReader::open(path)
            .map_err(|err| read_err(err.to_string()))?
            .with_guessed_format()
            .map_err(|err| read_err(err.to_string()))?
            .decode()
            .map_err(|err| read_err(err.to_string()))?;
        debug!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations ------------------------------------------------------

    /// Convert the image to 8-bit luma.
    #[instrument(skip(self))]
    pub fn grayscale(self) -> Self {
        info!("Converting to grayscale");
        Self {
            image: DynamicImage::ImageLuma8(self.image.to_luma8()),
        }
    }

    /// Global Otsu binarization; the result is pure black and white luma.
    #[instrument(skip(self))]
    pub fn binarize(self) -> Self {
        info!("Binarizing");
        let gray = self.image.to_luma8();
        Self {
            image: DynamicImage::ImageLuma8(filters::binarize_otsu(&gray)),
        }
    }

    /// Edge-preserving bilateral smoothing. Grayscale input stays
    /// grayscale; colour input is filtered per channel and keeps its alpha.
    #[instrument(skip(self))]
    pub fn smooth(self) -> Self {
        info!(window = BILATERAL_WINDOW, "Smoothing (bilateral filter)");
        if self.image.width() == 0 || self.image.height() == 0 {
            return self;
        }
        let image = if is_gray(&self.image) {
            DynamicImage::ImageLuma8(bilateral(&self.image.to_luma8()))
        } else {
            DynamicImage::ImageRgba8(bilateral_rgba(&self.image.to_rgba8()))
        };
        Self { image }
    }

    /// Pad the image with a white frame `px` pixels wide on every side.
    #[instrument(skip(self))]
    pub fn add_border(self, px: u32) -> Self {
        info!(px, "Adding border");
        if px == 0 {
            return self;
        }
        let width = self.image.width() + 2 * px;
        let height = self.image.height() + 2 * px;
        let offset = i64::from(px);

        let image = if is_gray(&self.image) {
            let mut canvas = GrayImage::from_pixel(width, height, Luma([255u8]));
            image::imageops::overlay(&mut canvas, &self.image.to_luma8(), offset, offset);
            DynamicImage::ImageLuma8(canvas)
        } else {
            let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255u8, 255, 255, 255]));
            image::imageops::overlay(&mut canvas, &self.image.to_rgba8(), offset, offset);
            DynamicImage::ImageRgba8(canvas)
        };
        debug!(width, height, "Border added");
        Self { image }
    }

    /// Stroke width transform: keeps pixels that sit on a consistent-width
    /// stroke (black) and clears everything else (white).
    #[instrument(skip(self))]
    pub fn stroke_width_transform(self) -> Self {
        info!("Running stroke width transform");
        let gray = self.image.to_luma8();
        Self {
            image: DynamicImage::ImageLuma8(filters::stroke_width_transform(&gray)),
        }
    }

    /// Adjust contrast by a factor. Values > 1.0 increase contrast; values
    /// < 1.0 decrease it. A value of 1.0 is a no-op.
    #[instrument(skip(self))]
    pub fn adjust_contrast(self, factor: f32) -> Self {
        info!(factor, "Adjusting contrast");
        let adjust = |channel: u8| -> u8 {
            let val = factor * (channel as f32 - 128.0) + 128.0;
            val.round().clamp(0.0, 255.0) as u8
        };

        let image = if is_gray(&self.image) {
            let gray = self.image.to_luma8();
            let out = ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
                Luma([adjust(gray.get_pixel(x, y).0[0])])
            });
            DynamicImage::ImageLuma8(out)
        } else {
            let rgba = self.image.to_rgba8();
            let out = ImageBuffer::from_fn(rgba.width(), rgba.height(), |x, y| {
                let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
                Rgba([adjust(r), adjust(g), adjust(b), a])
            });
            DynamicImage::ImageRgba8(out)
        };
        Self { image }
    }
}

fn bilateral(plane: &GrayImage) -> GrayImage {
    bilateral_filter(
        plane,
        BILATERAL_WINDOW,
        BILATERAL_SIGMA_COLOR,
        BILATERAL_SIGMA_SPATIAL,
    )
}

fn bilateral_rgba(rgba: &RgbaImage) -> RgbaImage {
    let (width, height) = rgba.dimensions();
    let channel = |c: usize| {
        bilateral(&GrayImage::from_fn(width, height, |x, y| {
            Luma([rgba.get_pixel(x, y).0[c]])
        }))
    };
    let (r, g, b) = (channel(0), channel(1), channel(2));
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            r.get_pixel(x, y).0[0],
            g.get_pixel(x, y).0[0],
            b.get_pixel(x, y).0[0],
            rgba.get_pixel(x, y).0[3],
        ])
    })
}

/// Whether the image carries a single luma channel (with or without alpha).
pub(crate) fn is_gray(image: &DynamicImage) -> bool {
    !image.color().has_color()
}

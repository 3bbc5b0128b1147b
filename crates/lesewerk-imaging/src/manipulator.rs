// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The image-manipulation capability consumed by the preprocessing pipeline,
// and its standard implementation on top of `ImageProcessor`.

use image::DynamicImage;
use lesewerk_core::error::LesewerkError;

use crate::image::processor::{ImageProcessor, is_gray};
use crate::native::NativeBuffer;

/// Pixel-level transforms the pipeline sequences.
///
/// Each transform takes ownership of the working image and hands back the
/// next one. Implementations must be shareable between concurrent scans.
pub trait ImageManipulator: Send + Sync {
    fn to_grayscale(&self, image: DynamicImage) -> DynamicImage;
    fn to_binary(&self, image: DynamicImage) -> DynamicImage;
    fn smooth(&self, image: DynamicImage) -> DynamicImage;
    fn add_border(&self, image: DynamicImage, px: u32) -> DynamicImage;
    fn perform_swt(&self, image: DynamicImage) -> DynamicImage;
    /// `delta` is added to a unit contrast factor (0.1 means 110%).
    fn change_contrast(&self, image: DynamicImage, delta: f32) -> DynamicImage;
    /// Convert into the engine's frame layout. Resolution is left unset.
    fn to_native_buffer(&self, image: &DynamicImage) -> Result<NativeBuffer, LesewerkError>;
}

/// [`ImageManipulator`] backed by the `image`/`imageproc` filters in this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardManipulator;

impl ImageManipulator for StandardManipulator {
    fn to_grayscale(&self, image: DynamicImage) -> DynamicImage {
        ImageProcessor::from_dynamic(image).grayscale().into_dynamic()
    }

    fn to_binary(&self, image: DynamicImage) -> DynamicImage {
        ImageProcessor::from_dynamic(image).binarize().into_dynamic()
    }

    fn smooth(&self, image: DynamicImage) -> DynamicImage {
        ImageProcessor::from_dynamic(image).smooth().into_dynamic()
    }

    fn add_border(&self, image: DynamicImage, px: u32) -> DynamicImage {
        ImageProcessor::from_dynamic(image).add_border(px).into_dynamic()
    }

    fn perform_swt(&self, image: DynamicImage) -> DynamicImage {
        ImageProcessor::from_dynamic(image)
            .stroke_width_transform()
            .into_dynamic()
    }

    fn change_contrast(&self, image: DynamicImage, delta: f32) -> DynamicImage {
        ImageProcessor::from_dynamic(image)
            .adjust_contrast(1.0 + delta)
            .into_dynamic()
    }

    fn to_native_buffer(&self, image: &DynamicImage) -> Result<NativeBuffer, LesewerkError> {
        if is_gray(image) {
            let gray = image.to_luma8();
            let (width, height) = gray.dimensions();
            NativeBuffer::new(gray.into_raw(), width, height, 1)
        } else {
            let rgb = image.to_rgb8();
            let (width, height) = rgb.dimensions();
            NativeBuffer::new(rgb.into_raw(), width, height, 3)
        }
    }
}

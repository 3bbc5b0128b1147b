// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Preprocessing pipeline runs the enabled subset of filters in a fixed
// order and converts the result into an engine frame.

use image::DynamicImage;
use lesewerk_core::PreprocessFlags;
use lesewerk_core::error::LesewerkError;
use tracing::{debug, instrument};

use crate::manipulator::ImageManipulator;
use crate::native::NativeBuffer;

/// Width of the white frame added by [`PreprocessStep::Border`].
pub const BORDER_PX: u32 = 6;

/// Contrast delta applied by [`PreprocessStep::Contrast`].
pub const CONTRAST_DELTA: f32 = 0.1;

/// One preprocessing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreprocessStep {
    Grayscale,
    Binarize,
    Smooth,
    Border,
    StrokeWidth,
    Contrast,
}

impl PreprocessStep {
    /// The order steps always run in. Disabling a step drops it from the
    /// sequence without moving the others.
    pub const ORDER: [PreprocessStep; 6] = [
        PreprocessStep::Grayscale,
        PreprocessStep::Binarize,
        PreprocessStep::Smooth,
        PreprocessStep::Border,
        PreprocessStep::StrokeWidth,
        PreprocessStep::Contrast,
    ];

    pub fn is_enabled(self, flags: &PreprocessFlags) -> bool {
        match self {
            Self::Grayscale => flags.grayscale,
            Self::Binarize => flags.binary,
            Self::Smooth => flags.smooth,
            Self::Border => flags.border,
            Self::StrokeWidth => flags.swt,
            Self::Contrast => flags.contrast,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Grayscale => "grayscale",
            Self::Binarize => "binary",
            Self::Smooth => "smooth",
            Self::Border => "border",
            Self::StrokeWidth => "swt",
            Self::Contrast => "contrast",
        }
    }
}

impl std::fmt::Display for PreprocessStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Flag-gated sequencing of [`ImageManipulator`] calls.
///
/// The pipeline does no pixel math of its own. It decides which filters run,
/// passes the working image from one to the next, and fixes up the frame
/// metadata after native conversion.
pub struct PreprocessingPipeline<'a> {
    manipulator: &'a dyn ImageManipulator,
    flags: PreprocessFlags,
}

impl<'a> PreprocessingPipeline<'a> {
    pub fn new(manipulator: &'a dyn ImageManipulator, flags: PreprocessFlags) -> Self {
        Self { manipulator, flags }
    }

    /// Steps that will run, in order.
    pub fn steps(&self) -> Vec<PreprocessStep> {
        PreprocessStep::ORDER
            .into_iter()
            .filter(|step| step.is_enabled(&self.flags))
            .collect()
    }

    /// Apply every enabled step.
    pub fn apply(&self, image: DynamicImage) -> DynamicImage {
        self.apply_with(image, |_, _| {})
    }

    /// Apply every enabled step, calling `after_step` with each finished
    /// step and its output.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn apply_with<F>(&self, image: DynamicImage, mut after_step: F) -> DynamicImage
    where
        F: FnMut(PreprocessStep, &DynamicImage),
    {
        let mut working = image;
        for step in self.steps() {
            working = self.run_step(step, working);
            debug!(%step, width = working.width(), height = working.height(), "Step applied");
            after_step(step, &working);
        }
        working
    }

    /// Convert the final image into an engine frame.
    ///
    /// Native conversion does not carry resolution over, so the frame's
    /// horizontal resolution is set from the image height and the vertical
    /// resolution from the image width.
    pub fn finalize(&self, image: &DynamicImage) -> Result<NativeBuffer, LesewerkError> {
        let mut buffer = self.manipulator.to_native_buffer(image)?;
        buffer.x_res = image.height();
        buffer.y_res = image.width();
        Ok(buffer)
    }

    /// [`apply`](Self::apply) followed by [`finalize`](Self::finalize).
    pub fn prepare(&self, image: DynamicImage) -> Result<NativeBuffer, LesewerkError> {
        let processed = self.apply(image);
        self.finalize(&processed)
    }

    fn run_step(&self, step: PreprocessStep, image: DynamicImage) -> DynamicImage {
        let m = self.manipulator;
        match step {
            PreprocessStep::Grayscale => m.to_grayscale(image),
            PreprocessStep::Binarize => m.to_binary(image),
            PreprocessStep::Smooth => m.smooth(image),
            PreprocessStep::Border => m.add_border(image, BORDER_PX),
            PreprocessStep::StrokeWidth => m.perform_swt(image),
            PreprocessStep::Contrast => m.change_contrast(image, CONTRAST_DELTA),
        }
    }
}

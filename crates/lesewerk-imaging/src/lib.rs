// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lesewerk-imaging: image preprocessing for the Lesewerk scanner.
//
// Provides the filter set applied ahead of recognition (grayscale,
// binarization, smoothing, border, stroke width transform, contrast), the
// conversion into the engine's native frame format, and the pipeline that
// sequences the enabled filters in their fixed order.

pub mod filters;
pub mod image;
pub mod manipulator;
pub mod native;
pub mod pipeline;

pub use crate::image::processor::ImageProcessor;
pub use manipulator::{ImageManipulator, StandardManipulator};
pub use native::NativeBuffer;
pub use pipeline::{PreprocessStep, PreprocessingPipeline};

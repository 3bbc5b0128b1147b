// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pixel-level filters that need more than a one-line `image` call.

pub mod binarize;
pub mod swt;

pub use binarize::{binarize_otsu, otsu_threshold};
pub use swt::stroke_width_transform;

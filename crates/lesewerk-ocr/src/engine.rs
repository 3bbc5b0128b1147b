// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capability traits for an OCR engine handle and the factory that creates one.

use std::path::Path;

use lesewerk_core::error::Result;
use lesewerk_imaging::NativeBuffer;

use crate::params::EngineMode;

/// One initialised engine handle.
///
/// Every method takes `&mut self`: the handle carries the current image and
/// configuration, so it can only serve one caller at a time.
pub trait OcrEngine {
    /// Set a named engine variable.
    fn set_variable(&mut self, name: &str, value: &str) -> Result<()>;

    /// Make `frame` the current image and run recognition on it.
    fn set_image(&mut self, frame: &NativeBuffer) -> Result<()>;

    /// UTF-8 text recognised in the current image.
    fn utf8_text(&mut self) -> Result<String>;

    /// Mean word confidence for the current image, nominally 0..=100.
    fn mean_confidence(&mut self) -> Result<i32>;

    /// Release the native handle. Later calls fail with
    /// `LesewerkError::EngineUnavailable`.
    fn end(&mut self);

    /// Whether the handle can still take another image. A handle that
    /// returns `false` after a failed call is replaced by the session.
    fn is_usable(&self) -> bool {
        true
    }
}

/// Creates and initialises engine handles.
///
/// Factories move onto the scan worker, so they must be `Send`; the handles
/// they create never leave that worker.
pub trait EngineFactory: Send {
    type Engine: OcrEngine;

    /// Create a handle bound to `languages` (`+`-joined codes) using the
    /// language data in `data_path`.
    fn init(&self, data_path: &Path, languages: &str, mode: EngineMode) -> Result<Self::Engine>;
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine selection uses Tesseract when compiled in, otherwise a factory that
// refuses to start so scans fail with a clear message.

#[cfg(feature = "tesseract")]
pub use lesewerk_ocr::TesseractFactory as DefaultFactory;

#[cfg(not(feature = "tesseract"))]
pub use self::unavailable::UnavailableFactory as DefaultFactory;

#[cfg(not(feature = "tesseract"))]
mod unavailable {
    use std::path::Path;

    use lesewerk_core::error::{LesewerkError, Result};
    use lesewerk_imaging::NativeBuffer;
    use lesewerk_ocr::{EngineFactory, EngineMode, OcrEngine};

    /// Stands in for a real backend in builds without one.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct UnavailableFactory;

    /// Uninhabited; no handle is ever created.
    pub enum NoEngine {}

    impl EngineFactory for UnavailableFactory {
        type Engine = NoEngine;

        fn init(&self, _data_path: &Path, _languages: &str, _mode: EngineMode) -> Result<NoEngine> {
            Err(LesewerkError::EngineInit(
                "built without an OCR engine; rebuild with `--features tesseract`".into(),
            ))
        }
    }

    impl OcrEngine for NoEngine {
        fn set_variable(&mut self, _name: &str, _value: &str) -> Result<()> {
            match *self {}
        }

        fn set_image(&mut self, _frame: &NativeBuffer) -> Result<()> {
            match *self {}
        }

        fn utf8_text(&mut self) -> Result<String> {
            match *self {}
        }

        fn mean_confidence(&mut self) -> Result<i32> {
            match *self {}
        }

        fn end(&mut self) {
            match *self {}
        }
    }

}

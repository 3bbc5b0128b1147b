// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tesseract backend for the OCR engine capability.
//
// # Feature Gate
//
// Only compiled with the `tesseract` feature, which links against the
// system libtesseract/libleptonica:
//
// ```toml
// lesewerk-ocr = { path = "crates/lesewerk-ocr", features = ["tesseract"] }
// ```
//
// # Language data
//
// `data_path` must contain one `<lang>.traineddata` per requested language,
// e.g. `eng.traineddata` and `deu.traineddata` for `eng+deu`. Files are
// available from <https://github.com/tesseract-ocr/tessdata_fast>.

use std::ffi::CString;
use std::path::Path;

use ::tesseract::plumbing::TessBaseApi;
use ::tesseract::plumbing::tesseract_sys::{
    TessOcrEngineMode, TessOcrEngineMode_OEM_DEFAULT, TessOcrEngineMode_OEM_LSTM_ONLY,
    TessOcrEngineMode_OEM_TESSERACT_LSTM_COMBINED, TessOcrEngineMode_OEM_TESSERACT_ONLY,
};
use lesewerk_core::error::{LesewerkError, Result};
use lesewerk_imaging::NativeBuffer;
use tracing::{debug, instrument};

use crate::engine::{EngineFactory, OcrEngine};
use crate::params::EngineMode;

/// Creates [`TesseractEngine`] handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct TesseractFactory;

impl EngineFactory for TesseractFactory {
    type Engine = TesseractEngine;

    #[instrument(skip(self), fields(data_path = %data_path.display()))]
    fn init(&self, data_path: &Path, languages: &str, mode: EngineMode) -> Result<TesseractEngine> {
        let init_err = |reason: String| LesewerkError::EngineInit(reason);
        let data_path_c = data_path
            .to_str()
            .and_then(|p| CString::new(p).ok())
            .ok_or_else(|| init_err(format!("unusable data path: {}", data_path.display())))?;
        let languages_c = CString::new(languages)
            .map_err(|_| init_err(format!("unusable language list: {languages:?}")))?;

        let mut api = TessBaseApi::create();
        api.init_4(Some(data_path_c.as_c_str()), Some(languages_c.as_c_str()), oem(mode))
            .map_err(|err| {
                init_err(format!(
                    "cannot load '{languages}' from {}: {err}",
                    data_path.display()
                ))
            })?;
        debug!("Tesseract initialised");
        Ok(TesseractEngine { api: Some(api) })
    }
}

/// A live Tesseract handle.
///
/// Every call borrows the native API object in place, so a failure on one
/// image leaves the handle usable for the next. Only [`OcrEngine::end`]
/// releases it.
pub struct TesseractEngine {
    api: Option<TessBaseApi>,
}

impl TesseractEngine {
    fn api_mut(&mut self) -> Result<&mut TessBaseApi> {
        self.api.as_mut().ok_or(LesewerkError::EngineUnavailable)
    }
}

impl OcrEngine for TesseractEngine {
    fn set_variable(&mut self, name: &str, value: &str) -> Result<()> {
        let config_err = || LesewerkError::EngineConfig(format!("{name}: contains a NUL byte"));
        let name_c = CString::new(name).map_err(|_| config_err())?;
        let value_c = CString::new(value).map_err(|_| config_err())?;
        self.api_mut()?
            .set_variable(&name_c, &value_c)
            .map_err(|err| LesewerkError::EngineConfig(format!("{name}: {err}")))
    }

    fn set_image(&mut self, frame: &NativeBuffer) -> Result<()> {
        let api = self.api_mut()?;
        api.set_image(
            frame.data(),
            frame.width() as i32,
            frame.height() as i32,
            i32::from(frame.bytes_per_pixel()),
            frame.bytes_per_line() as i32,
        )
        .map_err(|err| LesewerkError::Recognition(format!("set frame: {err}")))?;
        api.set_source_resolution(frame.x_res as i32);
        api.recognize()
            .map_err(|err| LesewerkError::Recognition(format!("recognise: {err}")))
    }

    fn utf8_text(&mut self) -> Result<String> {
        let text = self
            .api_mut()?
            .get_utf8_text()
            .map_err(|err| LesewerkError::Recognition(format!("get text: {err}")))?;
        Ok(text.as_ref().to_string_lossy().into_owned())
    }

    fn mean_confidence(&mut self) -> Result<i32> {
        Ok(self.api_mut()?.mean_text_conf())
    }

    fn is_usable(&self) -> bool {
        self.api.is_some()
    }

    fn end(&mut self) {
        // Dropping the handle ends and deletes the native API object.
        self.api.take();
    }
}

fn oem(mode: EngineMode) -> TessOcrEngineMode {
    match mode {
        EngineMode::TesseractOnly => TessOcrEngineMode_OEM_TESSERACT_ONLY,
        EngineMode::LstmOnly => TessOcrEngineMode_OEM_LSTM_ONLY,
        EngineMode::TesseractLstmCombined => TessOcrEngineMode_OEM_TESSERACT_LSTM_COMBINED,
        EngineMode::Default => TessOcrEngineMode_OEM_DEFAULT,
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine session: one engine handle at a time for the length of one scan.

use lesewerk_core::EngineSettings;
use lesewerk_core::error::{LesewerkError, Result};
use lesewerk_imaging::NativeBuffer;
use tracing::{debug, info, instrument, warn};

use crate::engine::{EngineFactory, OcrEngine};
use crate::params::EngineParams;

/// Text and confidence read back for one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recognition {
    pub text: String,
    /// Clamped to 0..=100.
    pub confidence: u8,
}

/// Scoped owner of the engine handle for one scan.
///
/// Every handle the session creates is released exactly once: by
/// [`close`](Self::close), by `Drop` if the session is abandoned, or when a
/// handle that reports itself unusable after a failed image is replaced.
/// `recognize` takes `&mut self`, so one session can never serve two images
/// at the same time.
pub struct EngineSession<'f, F: EngineFactory> {
    factory: &'f F,
    settings: EngineSettings,
    params: EngineParams,
    engine: Option<F::Engine>,
    configured: bool,
    restarts: usize,
}

impl<'f, F: EngineFactory> EngineSession<'f, F> {
    /// Create and initialise a handle.
    ///
    /// # Errors
    ///
    /// [`LesewerkError::EngineInit`] if the language data cannot be loaded.
    #[instrument(skip_all, fields(data_path = %settings.data_path.display(), languages = %settings.languages))]
    pub fn open(factory: &'f F, settings: &EngineSettings, params: &EngineParams) -> Result<Self> {
        let engine = factory.init(&settings.data_path, &settings.languages, params.engine_mode)?;
        info!("OCR engine handle initialised");
        Ok(Self {
            factory,
            settings: settings.clone(),
            params: params.clone(),
            engine: Some(engine),
            configured: false,
            restarts: 0,
        })
    }

    /// Apply the session-wide parameters. Only the first call has an effect.
    pub fn configure(&mut self) -> Result<()> {
        if self.configured {
            debug!("engine already configured; skipping");
            return Ok(());
        }
        let params = &self.params;
        let engine = self.engine.as_mut().ok_or(LesewerkError::EngineUnavailable)?;
        apply_params(engine, params)?;
        self.configured = true;
        debug!("engine parameters applied");
        Ok(())
    }

    /// Recognise one frame.
    ///
    /// The frame is only borrowed; the caller keeps ownership and drops it
    /// whatever the outcome. If the call fails and leaves the handle
    /// unusable, the handle is replaced with a fresh, identically configured
    /// one before the image's error is returned, so the next image still has
    /// an engine.
    ///
    /// # Errors
    ///
    /// The image's own error, or the factory's error if the replacement
    /// handle cannot be created.
    pub fn recognize(&mut self, frame: &NativeBuffer) -> Result<Recognition> {
        let result = self.try_recognize(frame);
        if result.is_err() && self.engine.as_ref().is_some_and(|e| !e.is_usable()) {
            self.restart()?;
        }
        result
    }

    /// How many times a lost handle has been replaced.
    pub fn restarts(&self) -> usize {
        self.restarts
    }

    /// Release the handle.
    pub fn close(mut self) {
        self.release();
    }

    fn try_recognize(&mut self, frame: &NativeBuffer) -> Result<Recognition> {
        let engine = self.engine.as_mut().ok_or(LesewerkError::EngineUnavailable)?;
        engine.set_image(frame)?;
        let text = engine.utf8_text()?;
        let raw = engine.mean_confidence()?;
        if !(0..=100).contains(&raw) {
            warn!(raw, "engine confidence out of range; clamping");
        }
        Ok(Recognition {
            text,
            confidence: raw.clamp(0, 100) as u8,
        })
    }

    fn restart(&mut self) -> Result<()> {
        warn!("OCR engine handle unusable; re-initialising");
        self.release();
        let mut engine = self.factory.init(
            &self.settings.data_path,
            &self.settings.languages,
            self.params.engine_mode,
        )?;
        if self.configured {
            if let Err(err) = apply_params(&mut engine, &self.params) {
                engine.end();
                return Err(err);
            }
        }
        self.engine = Some(engine);
        self.restarts += 1;
        info!(restarts = self.restarts, "OCR engine handle re-initialised");
        Ok(())
    }

    fn release(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.end();
            info!("OCR engine handle released");
        }
    }
}

impl<F: EngineFactory> Drop for EngineSession<'_, F> {
    fn drop(&mut self) {
        self.release();
    }
}

fn apply_params<E: OcrEngine>(engine: &mut E, params: &EngineParams) -> Result<()> {
    for (name, value) in params.variables() {
        engine.set_variable(name, &value)?;
    }
    Ok(())
}

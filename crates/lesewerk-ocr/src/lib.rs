// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lesewerk-ocr: OCR engine capability and session lifecycle.
//
// The engine itself is a stateful native handle: created and initialised
// once, configured once, then fed one image at a time and finally released.
// `EngineSession` owns that handle for the length of a scan and guarantees
// the release on every exit path.

pub mod engine;
pub mod params;
pub mod session;

#[cfg(feature = "tesseract")]
pub mod tesseract;

pub use engine::{EngineFactory, OcrEngine};
pub use params::{EngineMode, EngineParams, PageSegMode, WHITELIST_CHARS};
pub use session::{EngineSession, Recognition};

#[cfg(feature = "tesseract")]
pub use self::tesseract::{TesseractEngine, TesseractFactory};

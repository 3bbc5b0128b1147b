// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Lesewerk.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for all Lesewerk operations.
///
/// Only [`PathNotFound`](Self::PathNotFound), [`DirectoryUnreadable`](Self::DirectoryUnreadable),
/// [`EngineInit`](Self::EngineInit), [`EngineConfig`](Self::EngineConfig) and
/// [`EngineUnavailable`](Self::EngineUnavailable) abort a scan. Everything else
/// is confined to the image it happened on.
#[derive(Debug, Error)]
pub enum LesewerkError {
    // -- Scan-level (fatal) --
    #[error("directory not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("cannot list directory {}: {source}", path.display())]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("OCR engine initialisation failed: {0}")]
    EngineInit(String),

    #[error("OCR engine configuration failed: {0}")]
    EngineConfig(String),

    #[error("OCR engine handle is no longer available")]
    EngineUnavailable,

    // -- Per-image --
    #[error("cannot read image {}: {reason}", path.display())]
    ImageRead { path: PathBuf, reason: String },

    #[error("image processing failed: {0}")]
    Image(String),

    #[error("text recognition failed: {0}")]
    Recognition(String),

    // -- Storage / persistence --
    #[error("database error: {0}")]
    Database(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LesewerkError {
    /// Whether this error terminates the whole scan rather than a single image.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::PathNotFound(_)
                | Self::DirectoryUnreadable { .. }
                | Self::EngineInit(_)
                | Self::EngineConfig(_)
                | Self::EngineUnavailable
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LesewerkError>;

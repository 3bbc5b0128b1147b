// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Lesewerk scanner.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ConfigSnapshot;

/// File name suffixes picked up by a directory scan.
///
/// Matching is a case-sensitive suffix test on the file name, so `IMG.PNG`
/// is not picked up.
pub const ALLOWED_EXTENSIONS: [&str; 9] =
    ["jpg", "png", "tiff", "bmp", "pnm", "gif", "ps", "pdf", "webp"];

/// Tesseract language set used when the configuration names none.
pub const DEFAULT_LANGUAGES: &str = "eng+deu+ita+spa";

/// Directory holding the `*.traineddata` files.
pub const DEFAULT_DATA_PATH: &str = "tessdata";

/// Upper bound on stored OCR text, in characters. Enforced by the `images`
/// table schema and by the scan sanitizer before insertion.
pub const MAX_IMG_TEXT_LEN: usize = 4096;

/// Unique identifier for one scan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanId(pub Uuid);

impl ScanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ScanId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Severity of a scan log event.
///
/// Numbered so that a configured level `n` lets through every event whose
/// number is `<= n`: the lower the number, the fewer messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum LogLevel {
    Fatal = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Fatal,
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fatal => "FATAL",
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        }
    }

    /// Whether an event at `self` passes a sink configured at `threshold`.
    pub fn enabled_at(self, threshold: LogLevel) -> bool {
        self <= threshold
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for LogLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, String> {
        LogLevel::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| format!("log level must be 0..=4, got {value}"))
    }
}

impl From<LogLevel> for u8 {
    fn from(level: LogLevel) -> Self {
        level as u8
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    /// Accepts either the number (`"2"`) or the name (`"warn"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(n) = s.parse::<u8>() {
            return LogLevel::try_from(n);
        }
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown log level: {s}"))
    }
}

/// A request to scan one directory with a fixed configuration.
///
/// Built by the front-end when the user starts a scan and never mutated
/// afterwards.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub id: ScanId,
    pub directory: PathBuf,
    pub config: ConfigSnapshot,
}

impl ScanRequest {
    pub fn new(directory: impl Into<PathBuf>, config: ConfigSnapshot) -> Self {
        Self {
            id: ScanId::new(),
            directory: directory.into(),
            config,
        }
    }
}

/// Result of recognising one image, handed straight to the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub scan_id: ScanId,
    /// File name without directory.
    pub file_name: String,
    pub absolute_path: PathBuf,
    /// Single-line text, at most [`MAX_IMG_TEXT_LEN`] characters.
    pub ocr_text: String,
    /// Mean engine confidence, 0..=100.
    pub confidence: u8,
    pub scanned_at: DateTime<Utc>,
}

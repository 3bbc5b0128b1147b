// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration and the per-scan snapshot taken from it.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{DEFAULT_DATA_PATH, DEFAULT_LANGUAGES, LogLevel};

/// Which preprocessing steps run before recognition.
///
/// Field order mirrors the fixed step order of the preprocessing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessFlags {
    pub grayscale: bool,
    pub binary: bool,
    pub smooth: bool,
    pub border: bool,
    pub swt: bool,
    pub contrast: bool,
}

impl Default for PreprocessFlags {
    fn default() -> Self {
        Self {
            grayscale: true,
            binary: false,
            smooth: false,
            border: true,
            swt: false,
            contrast: false,
        }
    }
}

impl PreprocessFlags {
    /// Every step disabled.
    pub fn none() -> Self {
        Self {
            grayscale: false,
            binary: false,
            smooth: false,
            border: false,
            swt: false,
            contrast: false,
        }
    }

    /// Every step enabled.
    pub fn all() -> Self {
        Self {
            grayscale: true,
            binary: true,
            smooth: true,
            border: true,
            swt: true,
            contrast: true,
        }
    }
}

/// Where the OCR engine finds its language data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Directory holding `*.traineddata` files.
    pub data_path: PathBuf,
    /// `+`-joined language codes, e.g. `eng+deu`.
    pub languages: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            languages: DEFAULT_LANGUAGES.to_string(),
        }
    }
}

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Highest log level shown (0 = FATAL only .. 4 = DEBUG).
    pub log_level: LogLevel,
    /// Emit per-step debug events during scans.
    pub debug: bool,
    /// Images recognised below this confidence raise a warning.
    pub critical_confidence: u8,
    pub preprocessing: PreprocessFlags,
    pub engine: EngineSettings,
    /// SQLite file name, relative to the data directory.
    pub database_file: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            debug: false,
            critical_confidence: 50,
            preprocessing: PreprocessFlags::default(),
            engine: EngineSettings::default(),
            database_file: "images.db".to_string(),
        }
    }
}

impl AppConfig {
    /// Freeze the scan-relevant settings for one scan.
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            log_level: self.log_level,
            debug: self.debug,
            critical_confidence: self.critical_confidence.min(100),
            preprocessing: self.preprocessing,
            engine: self.engine.clone(),
        }
    }
}

/// Read-only view of the configuration, taken once when a scan starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSnapshot {
    pub log_level: LogLevel,
    pub debug: bool,
    /// Always within 0..=100.
    pub critical_confidence: u8,
    pub preprocessing: PreprocessFlags,
    pub engine: EngineSettings,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        AppConfig::default().snapshot()
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core types, configuration and error definitions shared across all Lesewerk crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, ConfigSnapshot, EngineSettings, PreprocessFlags};
pub use error::LesewerkError;
pub use types::*;

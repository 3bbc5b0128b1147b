// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lesewerk-scan: directory scan orchestration.
//
// Enumerates the images in a directory, runs each through the preprocessing
// pipeline and one shared engine session, sanitizes the recognised text and
// hands one record per image to the record sink, reporting progress and
// quality warnings through a log sink.

pub mod enumerate;
pub mod log;
pub mod orchestrator;
pub mod sanitize;

pub use enumerate::FileEnumerator;
pub use log::{ChannelSink, LogLine, LogSink, MemorySink, TracingSink};
pub use orchestrator::{ScanOrchestrator, ScanState, ScanSummary};
pub use sanitize::{ResultSanitizer, Sanitized};

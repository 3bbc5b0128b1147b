// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Log sinks receiving scan progress and quality warnings.
//
// The orchestrator filters events against the scan's configured level before
// they reach a sink, so sinks see only what the user asked for. Sinks never
// fail: a lost log line must not abort a scan.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use lesewerk_core::LogLevel;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Capability to receive leveled log events.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

/// One captured event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub level: LogLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl LogLine {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Forwards events to `tracing`.
///
/// `tracing` has no fatal level; fatal events go out as errors carrying a
/// `fatal = true` field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Fatal => error!(target: "lesewerk::scan", fatal = true, "{message}"),
            LogLevel::Error => error!(target: "lesewerk::scan", "{message}"),
            LogLevel::Warn => warn!(target: "lesewerk::scan", "{message}"),
            LogLevel::Info => info!(target: "lesewerk::scan", "{message}"),
            LogLevel::Debug => debug!(target: "lesewerk::scan", "{message}"),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<LogLine>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<LogLine> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn at_level(&self, level: LogLevel) -> Vec<LogLine> {
        self.lines()
            .into_iter()
            .filter(|line| line.level == level)
            .collect()
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.at_level(level).len()
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: LogLevel, message: &str) {
        let line = LogLine::new(level, message);
        match self.lines.lock() {
            Ok(mut lines) => lines.push(line),
            Err(poisoned) => poisoned.into_inner().push(line),
        }
    }
}

/// Streams events over an unbounded channel, e.g. to a UI task that renders
/// scan progress while the scan runs on a blocking thread.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<LogLine>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LogLine>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl LogSink for ChannelSink {
    fn log(&self, level: LogLevel, message: &str) {
        // Receiver gone means nobody is listening any more.
        let _ = self.tx.send(LogLine::new(level, message));
    }
}

/// Level filter in front of a sink, fixed for one scan.
pub(crate) struct ScanLog<'a> {
    sink: &'a dyn LogSink,
    threshold: LogLevel,
}

impl<'a> ScanLog<'a> {
    pub(crate) fn new(sink: &'a dyn LogSink, threshold: LogLevel) -> Self {
        Self { sink, threshold }
    }

    pub(crate) fn emit(&self, level: LogLevel, message: impl AsRef<str>) {
        if level.enabled_at(self.threshold) {
            self.sink.log(level, message.as_ref());
        }
    }

    pub(crate) fn fatal(&self, message: impl AsRef<str>) {
        self.emit(LogLevel::Fatal, message);
    }

    pub(crate) fn error(&self, message: impl AsRef<str>) {
        self.emit(LogLevel::Error, message);
    }

    pub(crate) fn warn(&self, message: impl AsRef<str>) {
        self.emit(LogLevel::Warn, message);
    }

    pub(crate) fn info(&self, message: impl AsRef<str>) {
        self.emit(LogLevel::Info, message);
    }

    pub(crate) fn debug(&self, message: impl AsRef<str>) {
        self.emit(LogLevel::Debug, message);
    }
}

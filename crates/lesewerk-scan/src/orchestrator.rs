// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan orchestrator drives one directory scan from validation to the last
// stored record.
//
// Lifecycle of a scan:
//
//   Idle -> DirectoryValidated -> EngineOpened -> Iterating -> EngineClosed -> Done
//
// A fatal error moves the scan to Failed. The engine session is opened once
// per scan and closed once on every path that opened it, including failures
// part-way through the file list.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use lesewerk_core::error::{LesewerkError, Result};
use lesewerk_core::{ImageRecord, ScanId, ScanRequest};
use lesewerk_imaging::{ImageManipulator, ImageProcessor, PreprocessingPipeline};
use lesewerk_ocr::{EngineFactory, EngineParams, EngineSession};
use lesewerk_store::RecordSink;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use crate::enumerate::FileEnumerator;
use crate::log::{LogSink, ScanLog};
use crate::sanitize::ResultSanitizer;

/// Where a scan is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    DirectoryValidated,
    EngineOpened,
    Iterating,
    EngineClosed,
    Done,
    Failed,
}

impl ScanState {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_advance_to(self, next: ScanState) -> bool {
        use ScanState::*;
        matches!(
            (self, next),
            (Idle, DirectoryValidated)
                | (DirectoryValidated, EngineOpened)
                | (EngineOpened, Iterating)
                // Empty directory: nothing to iterate.
                | (EngineOpened, EngineClosed)
                | (Iterating, EngineClosed)
                | (EngineClosed, Done)
                | (Idle | DirectoryValidated | EngineOpened | Iterating | EngineClosed, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Counters reported when a scan finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub scan_id: ScanId,
    pub directory: PathBuf,
    pub files_found: usize,
    /// Images that made it through recognition.
    pub recognized: usize,
    /// Records accepted by the sink.
    pub stored: usize,
    /// Images skipped because they could not be read, processed or
    /// recognised.
    pub skipped: usize,
    pub low_confidence: usize,
    pub truncated: usize,
    pub persist_failures: usize,
    /// Engine handles replaced after a failed image left them unusable.
    pub engine_restarts: usize,
}

impl ScanSummary {
    fn new(request: &ScanRequest) -> Self {
        Self {
            scan_id: request.id,
            directory: request.directory.clone(),
            files_found: 0,
            recognized: 0,
            stored: 0,
            skipped: 0,
            low_confidence: 0,
            truncated: 0,
            persist_failures: 0,
            engine_restarts: 0,
        }
    }

    pub fn is_empty_directory(&self) -> bool {
        self.files_found == 0
    }
}

/// Per-scan bookkeeping: the filtered log, the counters and the state.
struct ScanRun<'a> {
    request: &'a ScanRequest,
    log: ScanLog<'a>,
    summary: ScanSummary,
    state: ScanState,
}

impl<'a> ScanRun<'a> {
    fn advance(&mut self, next: ScanState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal scan transition {:?} -> {next:?}",
            self.state
        );
        debug!(from = ?self.state, to = ?next, "scan state");
        if self.request.config.debug {
            self.log.debug(format!("Scan state {:?} -> {next:?}", self.state));
        }
        self.state = next;
    }

    fn fail(&mut self, err: LesewerkError) -> LesewerkError {
        self.advance(ScanState::Failed);
        err
    }
}

/// Runs directory scans against injected capabilities.
///
/// Cheap to clone; every capability sits behind an `Arc` so one orchestrator
/// can serve any number of concurrent scans, each with its own engine
/// session.
#[derive(Clone)]
pub struct ScanOrchestrator {
    manipulator: Arc<dyn ImageManipulator>,
    records: Arc<dyn RecordSink>,
    log: Arc<dyn LogSink>,
    enumerator: FileEnumerator,
    sanitizer: ResultSanitizer,
    params: EngineParams,
}

impl ScanOrchestrator {
    pub fn new(
        manipulator: Arc<dyn ImageManipulator>,
        records: Arc<dyn RecordSink>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            manipulator,
            records,
            log,
            enumerator: FileEnumerator::default(),
            sanitizer: ResultSanitizer::default(),
            params: EngineParams::default(),
        }
    }

    pub fn with_params(mut self, params: EngineParams) -> Self {
        self.params = params;
        self
    }

    /// Scan `request.directory` on the current thread.
    ///
    /// Returns once every file has been processed or a fatal error occurred.
    /// Per-image failures are logged, counted and skipped.
    ///
    /// # Errors
    ///
    /// Only errors for which [`LesewerkError::is_fatal`] holds.
    #[instrument(skip_all, fields(scan_id = %request.id, directory = %request.directory.display()))]
    pub fn run<F: EngineFactory>(&self, request: &ScanRequest, factory: &F) -> Result<ScanSummary> {
        let config = &request.config;
        let mut run = ScanRun {
            request,
            log: ScanLog::new(self.log.as_ref(), config.log_level),
            summary: ScanSummary::new(request),
            state: ScanState::Idle,
        };

        if !request.directory.is_dir() {
            run.log.error(format!(
                "The selected directory '{}' does not seem to exist",
                request.directory.display()
            ));
            return Err(run.fail(LesewerkError::PathNotFound(request.directory.clone())));
        }
        run.advance(ScanState::DirectoryValidated);

        run.log.info(format!(
            "Starting scan of '{}' with languages {} (language data in '{}')",
            request.directory.display(),
            config.engine.languages,
            config.engine.data_path.display()
        ));

        let mut session = match EngineSession::open(factory, &config.engine, &self.params) {
            Ok(session) => session,
            Err(err) => {
                run.log.fatal(format!("Could not initialise the OCR engine: {err}"));
                return Err(run.fail(err));
            }
        };
        run.advance(ScanState::EngineOpened);

        let outcome = self.drive(&mut run, &mut session);
        session.close();

        if let Err(err) = outcome {
            run.log.fatal(format!("Scan of '{}' aborted: {err}", request.directory.display()));
            return Err(run.fail(err));
        }
        run.advance(ScanState::EngineClosed);

        run.log.info(format!("Done scanning the directory '{}'", request.directory.display()));
        run.advance(ScanState::Done);
        Ok(run.summary)
    }

    /// Run a scan on the blocking pool and return immediately.
    ///
    /// Must be called from within a Tokio runtime. The caller owns the
    /// handle; dropping it detaches the scan without stopping it.
    pub fn spawn<F>(&self, request: ScanRequest, factory: F) -> JoinHandle<Result<ScanSummary>>
    where
        F: EngineFactory + 'static,
    {
        let orchestrator = self.clone();
        tokio::task::spawn_blocking(move || orchestrator.run(&request, &factory))
    }

    /// Everything between opening and closing the engine.
    fn drive<F: EngineFactory>(
        &self,
        run: &mut ScanRun<'_>,
        session: &mut EngineSession<'_, F>,
    ) -> Result<()> {
        session.configure()?;

        let files = self.enumerator.list(&run.request.directory)?;
        run.summary.files_found = files.len();
        if files.is_empty() {
            run.log.error(format!(
                "The directory '{}' contains no image files",
                run.request.directory.display()
            ));
            return Ok(());
        }

        run.advance(ScanState::Iterating);
        for path in &files {
            match self.scan_image(run, session, path) {
                Ok(()) => {}
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    run.log.error(format!("Skipping '{}': {err}", path.display()));
                    run.summary.skipped += 1;
                }
            }
            if session.restarts() > run.summary.engine_restarts {
                run.summary.engine_restarts = session.restarts();
                run.log.warn(format!(
                    "The OCR engine was re-initialised after '{}' failed",
                    path.display()
                ));
            }
        }
        Ok(())
    }

    /// Read, preprocess, recognise, sanitize and store one image.
    fn scan_image<F: EngineFactory>(
        &self,
        run: &mut ScanRun<'_>,
        session: &mut EngineSession<'_, F>,
        path: &Path,
    ) -> Result<()> {
        let request = run.request;
        let config = &request.config;
        let image = ImageProcessor::open(path)?.into_dynamic();

        let pipeline = PreprocessingPipeline::new(self.manipulator.as_ref(), config.preprocessing);
        let log = &run.log;
        let processed = pipeline.apply_with(image, |step, working| {
            if config.debug {
                log.debug(format!(
                    "Applied {step} to '{}' ({}x{})",
                    path.display(),
                    working.width(),
                    working.height()
                ));
            }
        });
        let frame = pipeline.finalize(&processed)?;
        drop(processed);

        let recognition = session.recognize(&frame)?;
        drop(frame);
        run.summary.recognized += 1;

        let sanitized = self.sanitizer.sanitize(&recognition.text);
        if sanitized.truncated {
            run.summary.truncated += 1;
            run.log.warn(format!(
                "Text from '{}' was {} characters long and has been trimmed to {}",
                path.display(),
                sanitized.original_len,
                self.sanitizer.max_len()
            ));
        }

        let confidence = recognition.confidence;
        let record = ImageRecord {
            scan_id: request.id,
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            absolute_path: std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()),
            ocr_text: sanitized.text,
            confidence,
            scanned_at: Utc::now(),
        };
        // The record is written before the image's outcome is reported.
        match self.records.insert(&record) {
            Ok(()) => run.summary.stored += 1,
            Err(err) => {
                run.summary.persist_failures += 1;
                run.log.error(format!("Could not store the result for '{}': {err}", path.display()));
            }
        }

        if confidence < config.critical_confidence {
            run.summary.low_confidence += 1;
            run.log.warn(format!(
                "Processed '{}', but the confidence score {confidence} is below {}",
                path.display(),
                config.critical_confidence
            ));
        }
        run.log.info(format!(
            "'{}' done, confidence {confidence}: {}",
            path.display(),
            record.ocr_text
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::fs;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use image::{GrayImage, Luma};
    use lesewerk_core::{AppConfig, ConfigSnapshot, LogLevel, MAX_IMG_TEXT_LEN, PreprocessFlags};
    use lesewerk_imaging::{NativeBuffer, StandardManipulator};
    use lesewerk_ocr::{EngineMode, OcrEngine};
    use lesewerk_store::{ImageStore, SharedImageStore};

    use super::*;
    use crate::log::MemorySink;

    /// Shared state between a test and the fake engines it hands out.
    #[derive(Clone, Default)]
    struct Script {
        results: Arc<Mutex<VecDeque<(String, i32)>>>,
        opens: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
        frames: Arc<AtomicUsize>,
    }

    impl Script {
        fn with_results(results: &[(&str, i32)]) -> Self {
            let script = Self::default();
            script
                .results
                .lock()
                .unwrap()
                .extend(results.iter().map(|(t, c)| (t.to_string(), *c)));
            script
        }

        fn opens(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }

        fn closes(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    struct FakeFactory {
        script: Script,
        fail_init: bool,
        fail_configure: bool,
        /// Handle reports itself gone after this many frames.
        lose_after: Option<usize>,
        /// A frame narrower than 3 px fails and leaves the handle unusable.
        narrow_frame_kills_handle: bool,
        /// Only the first `init` succeeds.
        fail_reinit: bool,
    }

    impl FakeFactory {
        fn new(script: &Script) -> Self {
            Self {
                script: script.clone(),
                fail_init: false,
                fail_configure: false,
                lose_after: None,
                narrow_frame_kills_handle: false,
                fail_reinit: false,
            }
        }
    }

    impl EngineFactory for FakeFactory {
        type Engine = FakeEngine;

        fn init(&self, _data_path: &Path, _languages: &str, _mode: EngineMode) -> Result<FakeEngine> {
            if self.fail_init || (self.fail_reinit && self.script.opens() > 0) {
                return Err(LesewerkError::EngineInit("no language data".into()));
            }
            self.script.opens.fetch_add(1, Ordering::SeqCst);
            Ok(FakeEngine {
                script: self.script.clone(),
                current: (String::new(), 0),
                fail_configure: self.fail_configure,
                lose_after: self.lose_after,
                narrow_frame_kills_handle: self.narrow_frame_kills_handle,
                lost: false,
            })
        }
    }

    struct FakeEngine {
        script: Script,
        current: (String, i32),
        fail_configure: bool,
        lose_after: Option<usize>,
        narrow_frame_kills_handle: bool,
        lost: bool,
    }

    impl OcrEngine for FakeEngine {
        fn set_variable(&mut self, name: &str, _value: &str) -> Result<()> {
            if self.fail_configure {
                return Err(LesewerkError::EngineConfig(format!("rejected {name}")));
            }
            Ok(())
        }

        fn set_image(&mut self, frame: &NativeBuffer) -> Result<()> {
            if self.lost {
                return Err(LesewerkError::EngineUnavailable);
            }
            if self.narrow_frame_kills_handle && frame.width() < 3 {
                self.lost = true;
                return Err(LesewerkError::Recognition("image too small to scale".into()));
            }
            let seen = self.script.frames.fetch_add(1, Ordering::SeqCst);
            if self.lose_after.is_some_and(|n| seen >= n) {
                return Err(LesewerkError::EngineUnavailable);
            }
            self.current = self
                .script
                .results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default();
            Ok(())
        }

        fn utf8_text(&mut self) -> Result<String> {
            Ok(self.current.0.clone())
        }

        fn mean_confidence(&mut self) -> Result<i32> {
            Ok(self.current.1)
        }

        fn end(&mut self) {
            self.script.closes.fetch_add(1, Ordering::SeqCst);
        }

        fn is_usable(&self) -> bool {
            !self.lost
        }
    }

    #[derive(Default)]
    struct MemoryRecords {
        records: Mutex<Vec<ImageRecord>>,
        reject: Option<&'static str>,
    }

    impl MemoryRecords {
        fn records(&self) -> Vec<ImageRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    impl RecordSink for MemoryRecords {
        fn insert(&self, record: &ImageRecord) -> Result<()> {
            if self.reject == Some(record.file_name.as_str()) {
                return Err(LesewerkError::Database("disk full".into()));
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    struct Harness {
        orchestrator: ScanOrchestrator,
        records: Arc<MemoryRecords>,
        log: Arc<MemorySink>,
    }

    fn harness_with(records: MemoryRecords) -> Harness {
        let records = Arc::new(records);
        let log = Arc::new(MemorySink::new());
        let orchestrator = ScanOrchestrator::new(
            Arc::new(StandardManipulator),
            records.clone(),
            log.clone(),
        );
        Harness {
            orchestrator,
            records,
            log,
        }
    }

    fn harness() -> Harness {
        harness_with(MemoryRecords::default())
    }

    fn config() -> ConfigSnapshot {
        ConfigSnapshot {
            log_level: LogLevel::Info,
            debug: false,
            critical_confidence: 50,
            preprocessing: PreprocessFlags::default(),
            ..ConfigSnapshot::default()
        }
    }

    fn write_png(dir: &Path, name: &str) {
        let img = GrayImage::from_fn(24, 16, |x, _| Luma([if x % 4 == 0 { 0 } else { 255 }]));
        img.save(dir.join(name)).unwrap();
    }

    fn warnings(log: &MemorySink) -> Vec<String> {
        log.at_level(LogLevel::Warn).into_iter().map(|l| l.message).collect()
    }

    #[test]
    fn scans_images_and_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png");
        fs::write(dir.path().join("b.txt"), "not an image").unwrap();

        let script = Script::with_results(&[("Hello\nWorld", 80)]);
        let h = harness();
        let request = ScanRequest::new(dir.path(), config());
        let summary = h.orchestrator.run(&request, &FakeFactory::new(&script)).unwrap();

        let records = h.records.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].file_name, "a.png");
        assert_eq!(records[0].ocr_text, "Hello World");
        assert_eq!(records[0].confidence, 80);
        assert_eq!(records[0].scan_id, request.id);
        assert!(records[0].absolute_path.is_absolute());
        assert!(warnings(&h.log).is_empty());

        assert_eq!(summary.files_found, 1);
        assert_eq!(summary.stored, 1);
        assert_eq!(script.opens(), 1);
        assert_eq!(script.closes(), 1);
    }

    #[test]
    fn empty_directory_logs_error_and_still_closes_engine() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("readme.md"), "#").unwrap();
        fs::write(dir.path().join("SCAN.PNG"), "upper case suffix").unwrap();

        let script = Script::default();
        let h = harness();
        let summary = h
            .orchestrator
            .run(&ScanRequest::new(dir.path(), config()), &FakeFactory::new(&script))
            .unwrap();

        assert!(summary.is_empty_directory());
        assert!(h.records.records().is_empty());
        let errors = h.log.at_level(LogLevel::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("no image files"));
        assert_eq!(script.opens(), 1);
        assert_eq!(script.closes(), 1);
    }

    #[test]
    fn low_confidence_warning_only_below_threshold() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.png", "b.png", "c.png", "d.png", "e.png"] {
            write_png(dir.path(), name);
        }
        let script = Script::with_results(&[("a", 0), ("b", 49), ("c", 50), ("d", 51), ("e", 100)]);
        let h = harness();
        let summary = h
            .orchestrator
            .run(&ScanRequest::new(dir.path(), config()), &FakeFactory::new(&script))
            .unwrap();

        let warns = warnings(&h.log);
        assert_eq!(warns.len(), 2);
        assert!(warns[0].contains("a.png") && warns[0].contains("score 0"));
        assert!(warns[1].contains("b.png") && warns[1].contains("score 49"));
        assert_eq!(summary.low_confidence, 2);
        // Low confidence never prevents storage.
        assert_eq!(h.records.records().len(), 5);
        assert_eq!(h.log.count(LogLevel::Info), 5 + 2);
    }

    #[test]
    fn unreadable_image_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.png"), b"definitely not a png").unwrap();
        write_png(dir.path(), "good.png");

        let script = Script::with_results(&[("fine", 90)]);
        let h = harness();
        let summary = h
            .orchestrator
            .run(&ScanRequest::new(dir.path(), config()), &FakeFactory::new(&script))
            .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.stored, 1);
        assert_eq!(h.records.records()[0].file_name, "good.png");
        let errors = h.log.at_level(LogLevel::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("broken.png"));
        assert_eq!(script.closes(), 1);
    }

    #[test]
    fn missing_directory_fails_before_engine_opens() {
        let dir = tempfile::tempdir().unwrap();
        let script = Script::default();
        let h = harness();
        let err = h
            .orchestrator
            .run(
                &ScanRequest::new(dir.path().join("missing"), config()),
                &FakeFactory::new(&script),
            )
            .unwrap_err();

        assert!(matches!(err, LesewerkError::PathNotFound(_)));
        assert_eq!(script.opens(), 0);
        assert_eq!(h.log.count(LogLevel::Error), 1);
    }

    #[test]
    fn engine_init_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png");
        let script = Script::default();
        let factory = FakeFactory {
            fail_init: true,
            ..FakeFactory::new(&script)
        };
        let h = harness();
        let err = h
            .orchestrator
            .run(&ScanRequest::new(dir.path(), config()), &factory)
            .unwrap_err();

        assert!(matches!(err, LesewerkError::EngineInit(_)));
        assert_eq!(h.log.count(LogLevel::Fatal), 1);
        assert!(h.records.records().is_empty());
        assert_eq!(script.opens(), script.closes());
    }

    #[test]
    fn engine_configure_failure_closes_the_handle() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png");
        let script = Script::default();
        let factory = FakeFactory {
            fail_configure: true,
            ..FakeFactory::new(&script)
        };
        let h = harness();
        let err = h
            .orchestrator
            .run(&ScanRequest::new(dir.path(), config()), &factory)
            .unwrap_err();

        assert!(matches!(err, LesewerkError::EngineConfig(_)));
        assert_eq!(script.opens(), 1);
        assert_eq!(script.closes(), 1);
        assert!(h.records.records().is_empty());
    }

    #[test]
    fn engine_reporting_unavailable_aborts_scan_and_closes_once() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.png", "b.png", "c.png"] {
            write_png(dir.path(), name);
        }
        let script = Script::with_results(&[("one", 70), ("two", 70), ("three", 70)]);
        let factory = FakeFactory {
            lose_after: Some(1),
            ..FakeFactory::new(&script)
        };
        let h = harness();
        let err = h
            .orchestrator
            .run(&ScanRequest::new(dir.path(), config()), &factory)
            .unwrap_err();

        assert!(matches!(err, LesewerkError::EngineUnavailable));
        assert_eq!(h.records.records().len(), 1);
        assert_eq!(h.log.count(LogLevel::Fatal), 1);
        assert_eq!(script.opens(), 1);
        assert_eq!(script.closes(), 1);
    }

    fn write_tiny_png(dir: &Path, name: &str) {
        GrayImage::from_pixel(2, 2, Luma([0])).save(dir.join(name)).unwrap();
    }

    #[test]
    fn image_that_breaks_the_engine_is_skipped_and_scan_continues() {
        let dir = tempfile::tempdir().unwrap();
        write_tiny_png(dir.path(), "a_tiny.png");
        write_png(dir.path(), "b_good.png");
        let script = Script::with_results(&[("good", 85)]);
        let factory = FakeFactory {
            narrow_frame_kills_handle: true,
            ..FakeFactory::new(&script)
        };
        let h = harness();
        let request = ScanRequest::new(
            dir.path(),
            ConfigSnapshot {
                preprocessing: PreprocessFlags::none(),
                ..config()
            },
        );
        let summary = h.orchestrator.run(&request, &factory).unwrap();

        let records = h.records.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].file_name, "b_good.png");
        assert_eq!(records[0].ocr_text, "good");
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.stored, 1);
        assert_eq!(summary.engine_restarts, 1);
        assert_eq!(h.log.count(LogLevel::Fatal), 0);
        let errors = h.log.at_level(LogLevel::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("a_tiny.png"));
        assert!(warnings(&h.log).iter().any(|w| w.contains("re-initialised")));
        assert_eq!(script.opens(), 2);
        assert_eq!(script.closes(), 2);
    }

    #[test]
    fn engine_that_cannot_be_replaced_aborts_the_scan() {
        let dir = tempfile::tempdir().unwrap();
        write_tiny_png(dir.path(), "a_tiny.png");
        write_png(dir.path(), "b_good.png");
        let script = Script::with_results(&[("never", 85)]);
        let factory = FakeFactory {
            narrow_frame_kills_handle: true,
            fail_reinit: true,
            ..FakeFactory::new(&script)
        };
        let h = harness();
        let request = ScanRequest::new(
            dir.path(),
            ConfigSnapshot {
                preprocessing: PreprocessFlags::none(),
                ..config()
            },
        );
        let err = h.orchestrator.run(&request, &factory).unwrap_err();

        assert!(matches!(err, LesewerkError::EngineInit(_)));
        assert!(h.records.records().is_empty());
        assert_eq!(h.log.count(LogLevel::Fatal), 1);
        assert_eq!(script.opens(), 1);
        assert_eq!(script.closes(), 1);
    }

    /// Writes "stored <name>" to the scan's own log so ordering is visible.
    struct LoggingRecords {
        log: Arc<MemorySink>,
    }

    impl RecordSink for LoggingRecords {
        fn insert(&self, record: &ImageRecord) -> Result<()> {
            self.log.log(LogLevel::Info, &format!("stored {}", record.file_name));
            Ok(())
        }
    }

    #[test]
    fn record_is_stored_before_the_low_confidence_warning() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png");
        let log = Arc::new(MemorySink::new());
        let orchestrator = ScanOrchestrator::new(
            Arc::new(StandardManipulator),
            Arc::new(LoggingRecords { log: log.clone() }),
            log.clone(),
        );
        let script = Script::with_results(&[("faint", 10)]);
        orchestrator
            .run(&ScanRequest::new(dir.path(), config()), &FakeFactory::new(&script))
            .unwrap();

        let messages: Vec<_> = log.lines().into_iter().map(|l| l.message).collect();
        let stored = messages.iter().position(|m| m == "stored a.png").unwrap();
        let warned = messages
            .iter()
            .position(|m| m.contains("below 50"))
            .unwrap();
        let done = messages.iter().position(|m| m.contains("done, confidence 10")).unwrap();
        assert!(stored < warned);
        assert!(stored < done);
    }

    #[test]
    fn overlong_text_is_trimmed_with_one_warning() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "long.png");
        let long = "x".repeat(MAX_IMG_TEXT_LEN + 1);
        let script = Script::with_results(&[(long.as_str(), 90)]);
        let h = harness();
        let summary = h
            .orchestrator
            .run(&ScanRequest::new(dir.path(), config()), &FakeFactory::new(&script))
            .unwrap();

        let warns = warnings(&h.log);
        assert_eq!(warns.len(), 1);
        assert!(warns[0].contains("trimmed"));
        assert_eq!(summary.truncated, 1);
        assert_eq!(h.records.records()[0].ocr_text.chars().count(), MAX_IMG_TEXT_LEN);
    }

    #[test]
    fn failed_insert_is_counted_and_scan_continues() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png");
        write_png(dir.path(), "b.png");
        let script = Script::with_results(&[("first", 80), ("second", 80)]);
        let h = harness_with(MemoryRecords {
            reject: Some("a.png"),
            ..MemoryRecords::default()
        });
        let summary = h
            .orchestrator
            .run(&ScanRequest::new(dir.path(), config()), &FakeFactory::new(&script))
            .unwrap();

        assert_eq!(summary.persist_failures, 1);
        assert_eq!(summary.stored, 1);
        assert_eq!(h.records.records()[0].file_name, "b.png");
        assert_eq!(h.log.count(LogLevel::Error), 1);
    }

    #[test]
    fn configured_level_filters_events() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png");
        let script = Script::with_results(&[("quiet", 10)]);
        let h = harness();
        let request = ScanRequest::new(
            dir.path(),
            ConfigSnapshot {
                log_level: LogLevel::Error,
                ..config()
            },
        );
        h.orchestrator.run(&request, &FakeFactory::new(&script)).unwrap();

        // The low-confidence warning and every info line are filtered out.
        assert!(h.log.lines().is_empty());
        assert_eq!(h.records.records().len(), 1);
    }

    #[test]
    fn debug_flag_reports_each_step() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png");
        let script = Script::with_results(&[("dbg", 90)]);
        let h = harness();
        let request = ScanRequest::new(
            dir.path(),
            ConfigSnapshot {
                log_level: LogLevel::Debug,
                debug: true,
                ..config()
            },
        );
        h.orchestrator.run(&request, &FakeFactory::new(&script)).unwrap();

        let debug: Vec<_> = h
            .log
            .at_level(LogLevel::Debug)
            .into_iter()
            .map(|l| l.message)
            .collect();
        // Default flags: grayscale then border.
        assert!(debug.iter().any(|m| m.starts_with("Applied grayscale")));
        assert!(debug.iter().any(|m| m.starts_with("Applied border")));
        assert!(debug.iter().any(|m| m.contains("Done")));
    }

    #[test]
    fn later_config_changes_do_not_reach_a_built_request() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png");
        let mut app = AppConfig::default();
        let request = ScanRequest::new(dir.path(), app.snapshot());
        app.critical_confidence = 100;

        let script = Script::with_results(&[("ok", 60)]);
        let h = harness();
        h.orchestrator.run(&request, &FakeFactory::new(&script)).unwrap();
        assert!(warnings(&h.log).is_empty());
    }

    #[test]
    fn records_reach_sqlite_store() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "it's.png");
        let store = SharedImageStore::new(ImageStore::open_in_memory().unwrap());
        let orchestrator = ScanOrchestrator::new(
            Arc::new(StandardManipulator),
            Arc::new(store.clone()),
            Arc::new(MemorySink::new()),
        );
        let script = Script::with_results(&[("Robert'); DROP TABLE images;--", 75)]);
        let request = ScanRequest::new(dir.path(), config());
        orchestrator.run(&request, &FakeFactory::new(&script)).unwrap();

        let stored = store.with(|s| s.for_scan(&request.id)).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "it's.png");
        assert_eq!(stored[0].ocr_data, "Robert'); DROP TABLE images;--");
        assert_eq!(stored[0].confidence, 75);
    }

    #[test]
    fn state_transitions() {
        use ScanState::*;
        assert!(Idle.can_advance_to(DirectoryValidated));
        assert!(EngineOpened.can_advance_to(EngineClosed));
        assert!(Iterating.can_advance_to(Failed));
        assert!(!Idle.can_advance_to(Iterating));
        assert!(!Done.can_advance_to(Failed));
        assert!(!EngineClosed.can_advance_to(Iterating));
        assert!(Done.is_terminal() && Failed.is_terminal());
    }

    #[tokio::test]
    async fn spawned_scan_returns_summary_through_handle() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png");
        write_png(dir.path(), "b.png");
        let script = Script::with_results(&[("one", 90), ("two", 90)]);
        let h = harness();

        let handle = h
            .orchestrator
            .spawn(ScanRequest::new(dir.path(), config()), FakeFactory::new(&script));
        let summary = handle.await.unwrap().unwrap();

        assert_eq!(summary.stored, 2);
        assert_eq!(script.opens(), 1);
        assert_eq!(script.closes(), 1);
    }

    #[tokio::test]
    async fn concurrent_scans_use_separate_sessions() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write_png(first.path(), "a.png");
        write_png(second.path(), "b.png");
        let script = Script::with_results(&[("x", 90), ("y", 90)]);
        let h = harness();

        let a = h
            .orchestrator
            .spawn(ScanRequest::new(first.path(), config()), FakeFactory::new(&script));
        let b = h
            .orchestrator
            .spawn(ScanRequest::new(second.path(), config()), FakeFactory::new(&script));
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(h.records.records().len(), 2);
        assert_eq!(script.opens(), 2);
        assert_eq!(script.closes(), 2);
    }
}

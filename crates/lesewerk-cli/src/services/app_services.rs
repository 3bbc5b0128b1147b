// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer opens the record store, loads the persisted
// configuration and starts scans.
//
// `ImageStore` wraps a rusqlite connection, which is `Send` but not `Sync`, so
// it is shared through `SharedImageStore` (an `Arc<Mutex<>>`). Scans run on the
// blocking pool and insert through the same handle.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use lesewerk_core::error::{LesewerkError, Result};
use lesewerk_core::{AppConfig, LogLevel, ScanId, ScanRequest};
use lesewerk_imaging::StandardManipulator;
use lesewerk_ocr::EngineFactory;
use lesewerk_scan::{LogSink, ScanOrchestrator, ScanSummary, TracingSink};
use lesewerk_store::{ImageStore, SharedImageStore, StoredImage};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::data_dir;
use super::engine::DefaultFactory;

/// Shared services for one process.
///
/// Cheap to clone; every field is `Arc`-backed.
#[derive(Clone)]
pub struct AppServices {
    store: SharedImageStore,
    log: Arc<dyn LogSink>,
    orchestrator: ScanOrchestrator,
    data_dir: PathBuf,
    config: Arc<Mutex<AppConfig>>,
}

impl AppServices {
    /// Initialise all services. Call once at startup.
    ///
    /// Creates the data directory, loads `config.json` (defaults when missing
    /// or unreadable) and opens the SQLite record store it names.
    pub fn init() -> Result<Self> {
        Self::init_with_log(Arc::new(TracingSink))
    }

    /// [`init`](Self::init) with scan events going to `log`.
    pub fn init_with_log(log: Arc<dyn LogSink>) -> Result<Self> {
        let dir = data_dir::data_dir();
        info!(path = %dir.display(), "initialising app services");
        let config = load_config(&dir).unwrap_or_default();
        Self::open(dir, config, log)
    }

    /// Services rooted at `dir` with an explicit configuration and log sink.
    pub fn open(dir: PathBuf, config: AppConfig, log: Arc<dyn LogSink>) -> Result<Self> {
        let store = ImageStore::open(dir.join(&config.database_file))?;
        Ok(Self::assemble(dir, config, store, log))
    }

    /// Services backed by an in-memory record store.
    #[cfg(test)]
    pub fn in_memory(dir: PathBuf, config: AppConfig, log: Arc<dyn LogSink>) -> Result<Self> {
        let store = ImageStore::open_in_memory()?;
        Ok(Self::assemble(dir, config, store, log))
    }

    fn assemble(dir: PathBuf, config: AppConfig, store: ImageStore, log: Arc<dyn LogSink>) -> Self {
        let store = SharedImageStore::new(store);
        let orchestrator = ScanOrchestrator::new(
            Arc::new(StandardManipulator),
            Arc::new(store.clone()),
            Arc::clone(&log),
        );
        Self {
            store,
            log,
            orchestrator,
            data_dir: dir,
            config: Arc::new(Mutex::new(config)),
        }
    }

    // -- Scanning ------------------------------------------------------------

    /// Start a scan with the compiled-in OCR engine.
    pub fn start_scan(&self, directory: impl Into<PathBuf>) -> Result<JoinHandle<Result<ScanSummary>>> {
        self.start_scan_with(directory, DefaultFactory::default())
    }

    /// Start a scan of `directory` on the blocking pool.
    ///
    /// The configuration is snapshotted here; later changes do not reach a
    /// running scan. A directory that does not exist is reported to the log
    /// sink and nothing is started.
    pub fn start_scan_with<F>(
        &self,
        directory: impl Into<PathBuf>,
        factory: F,
    ) -> Result<JoinHandle<Result<ScanSummary>>>
    where
        F: EngineFactory + 'static,
    {
        let directory = directory.into();
        if !directory.is_dir() {
            self.log.log(
                LogLevel::Error,
                &format!("The selected directory '{}' does not seem to exist", directory.display()),
            );
            return Err(LesewerkError::PathNotFound(directory));
        }

        let request = ScanRequest::new(directory, self.config().snapshot());
        info!(scan_id = %request.id, directory = %request.directory.display(), "scan started");
        Ok(self.orchestrator.spawn(request, factory))
    }

    // -- Records -------------------------------------------------------------

    /// The `limit` newest records, or with `scan` set, that scan's first
    /// `limit` records in the order they were processed.
    pub fn records(&self, limit: u32, scan: Option<ScanId>) -> Result<Vec<StoredImage>> {
        self.store.with(|store| match scan {
            Some(id) => Ok(store.for_scan(&id)?.into_iter().take(limit as usize).collect()),
            None => store.recent(limit),
        })
    }

    pub fn record_count(&self) -> Result<u64> {
        self.store.with(|store| store.count())
    }

    // -- Config --------------------------------------------------------------

    /// Current config (cloned).
    pub fn config(&self) -> AppConfig {
        self.config.lock().expect("config lock poisoned").clone()
    }

    /// Replace the in-process config without persisting it.
    pub fn set_config(&self, config: AppConfig) {
        *self.config.lock().expect("config lock poisoned") = config;
    }

    /// Update and persist the config.
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        self.set_config(config.clone());
        persist_config(&self.data_dir, config)
    }

    /// Path to the data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

// -- Config file persistence -------------------------------------------------

const CONFIG_FILE: &str = "config.json";

/// Read `config.json` from `data_dir`. `None` when absent or unparseable.
pub fn load_config(data_dir: &Path) -> Option<AppConfig> {
    let path = data_dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), "ignoring unreadable config: {e}");
            None
        }
    }
}

fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Record sink, the insert-only capability the scanner writes through.

use std::sync::{Arc, Mutex};

use lesewerk_core::ImageRecord;
use lesewerk_core::error::{LesewerkError, Result};

use crate::images::ImageStore;

/// Destination for recognised images. One call per image.
///
/// Shared by every running scan, so implementations must tolerate
/// concurrent calls.
pub trait RecordSink: Send + Sync {
    fn insert(&self, record: &ImageRecord) -> Result<()>;
}

/// An [`ImageStore`] behind a mutex, cheap to clone into each scan.
///
/// `rusqlite::Connection` is `Send` but not `Sync`; inserts are short, so a
/// plain mutex is enough.
#[derive(Clone)]
pub struct SharedImageStore {
    inner: Arc<Mutex<ImageStore>>,
}

impl SharedImageStore {
    pub fn new(store: ImageStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Run `f` with the store locked.
    pub fn with<T>(&self, f: impl FnOnce(&ImageStore) -> Result<T>) -> Result<T> {
        let store = self
            .inner
            .lock()
            .map_err(|_| LesewerkError::Database("image store lock poisoned".into()))?;
        f(&store)
    }
}

impl RecordSink for SharedImageStore {
    fn insert(&self, record: &ImageRecord) -> Result<()> {
        self.with(|store| store.insert(record).map(|_| ()))
    }
}

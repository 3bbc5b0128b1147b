// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lesewerk-store: persistence for recognised images.
//
// One row per successfully recognised image, written through parameterized
// statements only.

pub mod images;
pub mod sink;

pub use images::{ImageStore, StoredImage};
pub use sink::{RecordSink, SharedImageStore};

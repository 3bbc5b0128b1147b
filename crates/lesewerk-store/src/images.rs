// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image records: SQLite table of OCR results.
//
// Schema:
//   images(
//     id          INTEGER PRIMARY KEY AUTOINCREMENT,
//     scan_id     TEXT    NOT NULL,   -- UUID of the scan run
//     name        TEXT    NOT NULL,   -- file name
//     abs_path    TEXT    NOT NULL,   -- absolute path at scan time
//     ocr_data    TEXT    NOT NULL,   -- single-line text, <= MAX_IMG_TEXT_LEN chars
//     confidence  INTEGER NOT NULL,   -- 0..=100
//     scanned_at  TEXT    NOT NULL    -- RFC 3339
//   )

use std::path::Path;

use lesewerk_core::error::{LesewerkError, Result};
use lesewerk_core::{ImageRecord, MAX_IMG_TEXT_LEN, ScanId};
use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Convert a `rusqlite::Error` into a `LesewerkError::Database`.
fn db_err(e: rusqlite::Error) -> LesewerkError {
    LesewerkError::Database(e.to_string())
}

fn create_table_sql() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS images (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            scan_id     TEXT    NOT NULL,
            name        TEXT    NOT NULL,
            abs_path    TEXT    NOT NULL,
            ocr_data    TEXT    NOT NULL CHECK (length(ocr_data) <= {MAX_IMG_TEXT_LEN}),
            confidence  INTEGER NOT NULL CHECK (confidence BETWEEN 0 AND 100),
            scanned_at  TEXT    NOT NULL
        );
        CREATE INDEX IF NOT EXISTS images_scan_id ON images (scan_id);"
    )
}

const SELECT_COLUMNS: &str = "SELECT id, scan_id, name, abs_path, ocr_data, confidence, scanned_at FROM images";

/// A row read back from the `images` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredImage {
    pub id: i64,
    pub scan_id: String,
    pub name: String,
    pub abs_path: String,
    pub ocr_data: String,
    pub confidence: u8,
    pub scanned_at: String,
}

impl StoredImage {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            scan_id: row.get(1)?,
            name: row.get(2)?,
            abs_path: row.get(3)?,
            ocr_data: row.get(4)?,
            confidence: row.get(5)?,
            scanned_at: row.get(6)?,
        })
    }
}

/// OCR result table backed by a SQLite database.
///
/// All methods are synchronous because `rusqlite` does not support async
/// natively. Share between scans through [`SharedImageStore`](crate::SharedImageStore).
pub struct ImageStore {
    conn: Connection,
}

impl ImageStore {
    /// Open (or create) the database at `path`.
    ///
    /// WAL mode is enabled so readers (`records` listing) do not block a
    /// running scan.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(db_err)?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(db_err)?;
        conn.execute_batch(&create_table_sql()).map_err(db_err)?;

        info!("image store opened");
        Ok(Self { conn })
    }

    /// Open an in-memory database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(&create_table_sql()).map_err(db_err)?;

        debug!("in-memory image store opened");
        Ok(Self { conn })
    }

    /// Insert one record, returning its row id.
    #[instrument(skip(self, record), fields(scan_id = %record.scan_id, name = %record.file_name))]
    pub fn insert(&self, record: &ImageRecord) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO images (scan_id, name, abs_path, ocr_data, confidence, scanned_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.scan_id.to_string(),
                    record.file_name,
                    record.absolute_path.to_string_lossy().into_owned(),
                    record.ocr_text,
                    record.confidence,
                    record.scanned_at.to_rfc3339(),
                ],
            )
            .map_err(db_err)?;

        let id = self.conn.last_insert_rowid();
        debug!(id, "image record stored");
        Ok(id)
    }

    /// All records written by one scan, in insertion order.
    pub fn for_scan(&self, scan_id: &ScanId) -> Result<Vec<StoredImage>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} WHERE scan_id = ?1 ORDER BY id ASC"))
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![scan_id.to_string()], StoredImage::from_row)
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    /// The most recent `limit` records, newest first.
    pub fn recent(&self, limit: u32) -> Result<Vec<StoredImage>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY id DESC LIMIT ?1"))
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![limit], StoredImage::from_row)
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    /// Total number of stored records.
    pub fn count(&self) -> Result<u64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))
            .map_err(db_err)
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// File enumerator lists the scannable images directly inside a directory.

use std::path::{Path, PathBuf};

use lesewerk_core::ALLOWED_EXTENSIONS;
use lesewerk_core::error::{LesewerkError, Result};
use tracing::{debug, instrument};

/// Lists files whose name ends with one of a fixed set of suffixes.
///
/// The match is a case-sensitive suffix test on the whole file name, with no
/// dot required: `photo.PNG` is ignored and `notes.eps` matches `ps`.
#[derive(Debug, Clone, Copy)]
pub struct FileEnumerator {
    extensions: &'static [&'static str],
}

impl Default for FileEnumerator {
    fn default() -> Self {
        Self::new(&ALLOWED_EXTENSIONS)
    }
}

impl FileEnumerator {
    pub fn new(extensions: &'static [&'static str]) -> Self {
        Self { extensions }
    }

    /// Whether a file called `name` would be picked up.
    pub fn accepts(&self, name: &str) -> bool {
        self.extensions.iter().any(|ext| name.ends_with(ext))
    }

    /// Matching regular files in `dir`, sorted by file name. Subdirectories
    /// are not descended into.
    ///
    /// An empty result is not an error. The caller checks that `dir` exists
    /// first; a directory that cannot be listed yields
    /// [`LesewerkError::DirectoryUnreadable`].
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub fn list(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let unreadable = |source| LesewerkError::DirectoryUnreadable {
            path: dir.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(unreadable)? {
            let entry = entry.map_err(unreadable)?;
            let name = entry.file_name();
            if !self.accepts(&name.to_string_lossy()) {
                continue;
            }
            // Follows symlinks, so a link to an image counts as a file.
            let path = entry.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        debug!(matched = files.len(), "directory enumerated");
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn keeps_allowed_suffixes_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["z.webp", "a.png", "m.tiff", "notes.txt", "b.jpeg"] {
            touch(dir.path(), name);
        }
        let files = FileEnumerator::default().list(dir.path()).unwrap();
        assert_eq!(names(&files), ["a.png", "m.tiff", "z.webp"]);
    }

    #[test]
    fn suffix_match_is_case_sensitive() {
        let enumerator = FileEnumerator::default();
        assert!(enumerator.accepts("scan.png"));
        assert!(!enumerator.accepts("IMG.PNG"));
        assert!(!enumerator.accepts("photo.Jpg"));
    }

    #[test]
    fn suffix_match_needs_no_dot() {
        let enumerator = FileEnumerator::default();
        assert!(enumerator.accepts("figure.eps"));
        assert!(enumerator.accepts("archive_pdf"));
    }

    #[test]
    fn only_disallowed_files_gives_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.txt", "b.doc", "c.PNG"] {
            touch(dir.path(), name);
        }
        assert!(FileEnumerator::default().list(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn directories_named_like_images_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("album.png")).unwrap();
        touch(dir.path(), "real.png");
        let files = FileEnumerator::default().list(dir.path()).unwrap();
        assert_eq!(names(&files), ["real.png"]);
    }

    #[test]
    fn missing_directory_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        let err = FileEnumerator::default().list(&missing).unwrap_err();
        assert!(matches!(err, LesewerkError::DirectoryUnreadable { .. }));
    }
}

//! Canonical file I/O seam.
//!
//! Documents never touch the filesystem directly; they go through [`FileIo`]
//! so the GUI shell can supply the real filesystem while tests control
//! contents and modification times. Access failures translate to
//! absent/unreadable results rather than errors.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Synchronous file access used for document loading, saving, and
/// external-change detection.
pub trait FileIo: Send + Sync {
    /// Reads the whole file, or `None` if it is missing or unreadable.
    fn read_to_string(&self, path: &Path) -> Option<String>;
    /// Writes the whole file. Returns false on failure; the failure is the
    /// caller's signal that the save did not happen.
    fn write(&self, path: &Path, content: &str) -> bool;
    /// Last modification time, or `None` if unavailable.
    fn modified(&self, path: &Path) -> Option<DateTime<Utc>>;
    fn exists(&self, path: &Path) -> bool;
}

/// [`FileIo`] over the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileIo;

impl FileIo for OsFileIo {
    fn read_to_string(&self, path: &Path) -> Option<String> {
        std::fs::read_to_string(path).ok()
    }

    fn write(&self, path: &Path, content: &str) -> bool {
        match std::fs::write(path, content) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "file write failed");
                false
            }
        }
    }

    fn modified(&self, path: &Path) -> Option<DateTime<Utc>> {
        let modified = std::fs::metadata(path).ok()?.modified().ok()?;
        Some(DateTime::<Utc>::from(modified))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

struct MemoryFile {
    content: String,
    modified: DateTime<Utc>,
}

/// In-memory [`FileIo`] with settable modification times, for tests.
#[derive(Default)]
pub struct MemoryFileIo {
    files: Mutex<HashMap<PathBuf, MemoryFile>>,
}

impl MemoryFileIo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces a file with the given content and mtime.
    pub fn insert(&self, path: impl Into<PathBuf>, content: &str, modified: DateTime<Utc>) {
        self.files.lock().insert(
            path.into(),
            MemoryFile {
                content: content.to_string(),
                modified,
            },
        );
    }

    /// Bumps a file's mtime without changing content (simulates an external
    /// editor touching the file).
    pub fn touch(&self, path: &Path, modified: DateTime<Utc>) {
        if let Some(file) = self.files.lock().get_mut(path) {
            file.modified = modified;
        }
    }

    pub fn remove(&self, path: &Path) {
        self.files.lock().remove(path);
    }
}

impl FileIo for MemoryFileIo {
    fn read_to_string(&self, path: &Path) -> Option<String> {
        self.files.lock().get(path).map(|f| f.content.clone())
    }

    fn write(&self, path: &Path, content: &str) -> bool {
        self.files.lock().insert(
            path.to_path_buf(),
            MemoryFile {
                content: content.to_string(),
                modified: Utc::now(),
            },
        );
        true
    }

    fn modified(&self, path: &Path) -> Option<DateTime<Utc>> {
        self.files.lock().get(path).map(|f| f.modified)
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().contains_key(path)
    }
}

//! Autosave cache store.
//!
//! In-progress edits are persisted best-effort, keyed by document id, so a
//! crash or restart can recover them. For note documents the cache is the
//! canonical store; for file documents it is a transient recovery buffer.
//! Every operation swallows I/O failures: losing a cache write degrades
//! recovery but must never disturb the editing session.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use uuid::Uuid;

/// Key-value store for autosaved document content.
pub trait CacheStore: Send + Sync {
    fn save(&self, id: Uuid, content: &str);
    fn load(&self, id: Uuid) -> Option<String>;
    fn delete(&self, id: Uuid);
    fn exists(&self, id: Uuid) -> bool;
}

/// Cache store backed by one file per document id under a fixed directory.
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn entry_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.cache"))
    }
}

impl CacheStore for FileCacheStore {
    fn save(&self, id: Uuid, content: &str) {
        if let Err(error) = std::fs::create_dir_all(&self.dir) {
            tracing::warn!(dir = %self.dir.display(), %error, "cache directory unavailable");
            return;
        }
        let path = self.entry_path(id);
        if let Err(error) = std::fs::write(&path, content) {
            tracing::warn!(path = %path.display(), %error, "cache write failed");
        }
    }

    fn load(&self, id: Uuid) -> Option<String> {
        std::fs::read_to_string(self.entry_path(id)).ok()
    }

    fn delete(&self, id: Uuid) {
        let path = self.entry_path(id);
        if path.exists() {
            if let Err(error) = std::fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), %error, "cache delete failed");
            }
        }
    }

    fn exists(&self, id: Uuid) -> bool {
        self.entry_path(id).exists()
    }
}

/// In-memory cache store for tests.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<Uuid, String>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn save(&self, id: Uuid, content: &str) {
        self.entries.lock().insert(id, content.to_string());
    }

    fn load(&self, id: Uuid) -> Option<String> {
        self.entries.lock().get(&id).cloned()
    }

    fn delete(&self, id: Uuid) {
        self.entries.lock().remove(&id);
    }

    fn exists(&self, id: Uuid) -> bool {
        self.entries.lock().contains_key(&id)
    }
}

/// Default cache directory under the user's home, mirroring the app-data
/// layout (`~/.quire/cache`).
pub fn default_cache_dir(home: &Path) -> PathBuf {
    home.join(".quire").join("cache")
}

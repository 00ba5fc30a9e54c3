//! Per-tab document state machine.
//!
//! A document reconciles three sources of truth: the in-memory edit buffer,
//! the canonical store (a filesystem path, or the autosave cache for notes),
//! and the autosave cache as a recovery buffer. Content is loaded lazily on
//! first access so a restored session does not read every file up front.
//!
//! Dirtiness is always recomputed by value comparison against the last
//! loaded/saved snapshot. Edits schedule a debounced best-effort cache write;
//! the write happens only after the content has been quiet for
//! [`AUTOSAVE_QUIESCENCE`] and only if the document is still dirty then
//! (notes always write, the cache being their canonical store).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::cache::CacheStore;
use crate::error::{CoreError, CoreResult};
use crate::fsio::FileIo;
use crate::session::TabRecord;
use crate::timer::DebounceTimer;

/// Opaque document identifier, stable for the document's lifetime and used
/// as its autosave-cache key.
pub type DocumentId = Uuid;

/// Quiescence window before an edit is autosaved to the cache.
pub const AUTOSAVE_QUIESCENCE: Duration = Duration::from_millis(500);

const UNTITLED: &str = "Untitled";

/// State shared with the autosave worker. Updated on every content or
/// dirty-flag transition so the worker sees current values at fire time.
struct AutosaveSlot {
    content: String,
    dirty: bool,
    is_note: bool,
}

pub struct Document {
    id: DocumentId,
    title: String,
    file_path: Option<PathBuf>,
    is_note: bool,
    syntax_name: Option<String>,
    content: String,
    original_content: String,
    content_loaded: bool,
    is_dirty: bool,
    has_cached_changes: bool,
    last_known_modified: Option<DateTime<Utc>>,
    has_external_changes: bool,
    external_changes_acknowledged: bool,
    cache: Arc<dyn CacheStore>,
    fio: Arc<dyn FileIo>,
    autosave_slot: Arc<Mutex<AutosaveSlot>>,
    autosave: DebounceTimer,
}

impl Document {
    /// A fresh scratch tab: empty, already loaded, not backed by anything.
    pub fn new(cache: Arc<dyn CacheStore>, fio: Arc<dyn FileIo>) -> Self {
        Self::build(
            Uuid::new_v4(),
            UNTITLED.to_string(),
            None,
            false,
            None,
            true,
            None,
            false,
            cache,
            fio,
        )
    }

    /// A tab over an existing file. Content stays unloaded until accessed.
    pub fn for_file(path: impl Into<PathBuf>, cache: Arc<dyn CacheStore>, fio: Arc<dyn FileIo>) -> Self {
        let path = path.into();
        let title = file_title(&path).unwrap_or_else(|| UNTITLED.to_string());
        let last_modified = fio.modified(&path);
        Self::build(
            Uuid::new_v4(),
            title,
            Some(path),
            false,
            None,
            false,
            last_modified,
            false,
            cache,
            fio,
        )
    }

    /// A tab over a note. The note id doubles as the document id so the
    /// cache entry is the note's storage. Content stays unloaded.
    pub fn for_note(
        note_id: Uuid,
        title: impl Into<String>,
        syntax_name: Option<String>,
        cache: Arc<dyn CacheStore>,
        fio: Arc<dyn FileIo>,
    ) -> Self {
        Self::build(
            note_id,
            title.into(),
            None,
            true,
            syntax_name,
            false,
            None,
            false,
            cache,
            fio,
        )
    }

    /// Restores a tab from a persisted session record. Content stays
    /// unloaded; a leftover cache entry for a file tab shows up as
    /// recoverable changes until it is loaded.
    pub fn from_record(record: &TabRecord, cache: Arc<dyn CacheStore>, fio: Arc<dyn FileIo>) -> Self {
        let has_cached_changes = !record.is_note && cache.exists(record.id);
        Self::build(
            record.id,
            record.title.clone(),
            record.file_path.clone(),
            record.is_note,
            record.syntax_name.clone(),
            false,
            record.last_modified,
            has_cached_changes,
            cache,
            fio,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        id: DocumentId,
        title: String,
        file_path: Option<PathBuf>,
        is_note: bool,
        syntax_name: Option<String>,
        content_loaded: bool,
        last_known_modified: Option<DateTime<Utc>>,
        has_cached_changes: bool,
        cache: Arc<dyn CacheStore>,
        fio: Arc<dyn FileIo>,
    ) -> Self {
        let autosave_slot = Arc::new(Mutex::new(AutosaveSlot {
            content: String::new(),
            dirty: false,
            is_note,
        }));
        let worker_slot = autosave_slot.clone();
        let worker_cache = cache.clone();
        let autosave = DebounceTimer::new("autosave", move || {
            let pending = {
                let slot = worker_slot.lock();
                if slot.is_note || slot.dirty {
                    Some(slot.content.clone())
                } else {
                    None
                }
            };
            if let Some(content) = pending {
                worker_cache.save(id, &content);
            }
        });

        Self {
            id,
            title,
            file_path,
            is_note,
            syntax_name,
            content: String::new(),
            original_content: String::new(),
            content_loaded,
            is_dirty: false,
            has_cached_changes,
            last_known_modified,
            has_external_changes: false,
            external_changes_acknowledged: false,
            cache,
            fio,
            autosave_slot,
            autosave,
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Changes the backing path and derives the title from its file name.
    pub fn set_file_path(&mut self, path: Option<PathBuf>) {
        if self.file_path == path {
            return;
        }
        self.file_path = path;
        if let Some(title) = self.file_path.as_deref().and_then(file_title) {
            self.title = title;
        }
    }

    pub fn is_note(&self) -> bool {
        self.is_note
    }

    pub fn syntax_name(&self) -> Option<&str> {
        self.syntax_name.as_deref()
    }

    pub fn set_syntax_name(&mut self, syntax_name: Option<String>) {
        self.syntax_name = syntax_name;
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    pub fn has_cached_changes(&self) -> bool {
        self.has_cached_changes
    }

    pub fn has_external_changes(&self) -> bool {
        self.has_external_changes
    }

    pub fn last_known_modified(&self) -> Option<DateTime<Utc>> {
        self.last_known_modified
    }

    pub fn is_loaded(&self) -> bool {
        self.content_loaded
    }

    /// True when the tab should show an unsaved-changes marker: either
    /// currently dirty or holding a recoverable cache entry.
    pub fn show_dirty_indicator(&self) -> bool {
        self.is_dirty || self.has_cached_changes
    }

    /// Current content, loading it on first access.
    pub fn content(&mut self) -> &str {
        self.ensure_loaded();
        &self.content
    }

    /// Loads the canonical content if it has not been loaded yet, then folds
    /// in any autosave-cache entry as recovered dirty content. Idempotent.
    pub fn ensure_loaded(&mut self) {
        if self.content_loaded {
            return;
        }
        self.content_loaded = true;

        if self.is_note {
            // The cache is the note's canonical store.
            if let Some(cached) = self.cache.load(self.id) {
                self.original_content = cached.clone();
                self.content = cached;
                self.is_dirty = false;
                self.has_cached_changes = false;
            }
            self.sync_autosave_slot();
            return;
        }

        if let Some(path) = self.file_path.clone() {
            if let Some(content) = self.fio.read_to_string(&path) {
                self.original_content = content.clone();
                self.content = content;
                self.update_last_known_modified(self.fio.modified(&path));
            }
        }

        // A cache entry overrides the file content: it holds edits that were
        // never saved, so the document comes back dirty.
        if let Some(cached) = self.cache.load(self.id) {
            self.content = cached;
            self.is_dirty = true;
            self.has_cached_changes = false;
        }
        self.sync_autosave_slot();
    }

    /// Replaces the content, recomputing dirtiness by comparison against the
    /// last snapshot and rescheduling the autosave window.
    pub fn set_content(&mut self, text: impl Into<String>) {
        self.ensure_loaded();
        let text = text.into();
        if self.content == text {
            return;
        }
        self.content = text;
        self.is_dirty = self.content != self.original_content;
        self.sync_autosave_slot();
        self.autosave.restart(AUTOSAVE_QUIESCENCE);
    }

    /// Installs freshly loaded/saved content as the clean snapshot.
    pub fn set_original_content(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.content_loaded = true;
        self.original_content = text.clone();
        self.content = text;
        self.is_dirty = false;
        self.has_cached_changes = false;
        self.sync_autosave_slot();
    }

    /// Pulls the autosave-cache entry into the buffer as recovered dirty
    /// content, if one exists.
    pub fn load_from_cache(&mut self) {
        if let Some(cached) = self.cache.load(self.id) {
            self.content_loaded = true;
            self.content = cached;
            self.is_dirty = true;
            self.has_cached_changes = false;
            self.sync_autosave_slot();
        }
    }

    /// Writes the content to its canonical store.
    ///
    /// Notes save into the cache and keep it. File tabs need a resolvable
    /// path: an explicit `target` wins over the stored path; with neither the
    /// save is refused with [`CoreError::SaveTargetRequired`] and nothing
    /// changes. A failed write also leaves the document untouched (and
    /// dirty) — saves are best-effort and never raise I/O errors.
    pub fn save(&mut self, target: Option<PathBuf>) -> CoreResult<()> {
        self.ensure_loaded();

        if self.is_note {
            self.cache.save(self.id, &self.content);
            self.mark_saved();
            return Ok(());
        }

        let path = match target.or_else(|| self.file_path.clone()) {
            Some(path) => path,
            None => return Err(CoreError::SaveTargetRequired),
        };

        if !self.fio.write(&path, &self.content) {
            tracing::warn!(path = %path.display(), "save did not happen, document stays dirty");
            return Ok(());
        }

        self.set_file_path(Some(path.clone()));
        self.update_last_known_modified(self.fio.modified(&path));
        self.mark_saved();
        Ok(())
    }

    /// Compares the backing file's mtime against the last one this session
    /// observed. Missing/unreadable paths and acknowledged changes are
    /// no-ops. Returns true (and flags the document) on a strictly newer
    /// mtime.
    pub fn check_external_change(&mut self) -> bool {
        let Some(path) = self.file_path.clone() else {
            return false;
        };
        if !self.fio.exists(&path) || self.external_changes_acknowledged {
            return false;
        }
        match (self.fio.modified(&path), self.last_known_modified) {
            (Some(current), Some(known)) if current > known => {
                self.has_external_changes = true;
                true
            }
            _ => false,
        }
    }

    /// Keep the in-memory content and stop notifying about the current disk
    /// state. A later real change re-triggers detection because the
    /// acknowledgement is reset whenever the known mtime moves.
    pub fn acknowledge_external_changes(&mut self) {
        self.external_changes_acknowledged = true;
        self.has_external_changes = false;
    }

    /// Discards the buffer and re-reads the backing file, clearing every
    /// dirty/conflict flag and the recovery cache entry. No-op if the file
    /// is gone or unreadable.
    pub fn reload_from_disk(&mut self) {
        let Some(path) = self.file_path.clone() else {
            return;
        };
        let Some(content) = self.fio.read_to_string(&path) else {
            return;
        };
        self.content_loaded = true;
        self.original_content = content.clone();
        self.content = content;
        self.update_last_known_modified(self.fio.modified(&path));
        self.has_external_changes = false;
        self.is_dirty = false;
        self.has_cached_changes = false;
        self.cache.delete(self.id);
        self.sync_autosave_slot();
    }

    /// Drops this document's cache entry unless the cache is its storage.
    /// Called when the tab closes.
    pub fn discard_cache_entry(&self) {
        if !self.is_note {
            self.cache.delete(self.id);
        }
    }

    pub fn to_record(&self, order: usize) -> TabRecord {
        TabRecord {
            id: self.id,
            title: self.title.clone(),
            file_path: self.file_path.clone(),
            order,
            last_modified: self.last_known_modified,
            syntax_name: self.syntax_name.clone(),
            is_note: self.is_note,
        }
    }

    fn mark_saved(&mut self) {
        self.original_content = self.content.clone();
        self.is_dirty = false;
        self.has_cached_changes = false;
        if !self.is_note {
            self.cache.delete(self.id);
        }
        self.sync_autosave_slot();
    }

    fn update_last_known_modified(&mut self, stamp: Option<DateTime<Utc>>) {
        if self.last_known_modified != stamp {
            self.last_known_modified = stamp;
            self.external_changes_acknowledged = false;
        }
    }

    fn sync_autosave_slot(&self) {
        let mut slot = self.autosave_slot.lock();
        slot.content.clear();
        slot.content.push_str(&self.content);
        slot.dirty = self.is_dirty;
        slot.is_note = self.is_note;
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("file_path", &self.file_path)
            .field("is_note", &self.is_note)
            .field("is_dirty", &self.is_dirty)
            .field("loaded", &self.content_loaded)
            .finish()
    }
}

fn file_title(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use crate::fsio::MemoryFileIo;
    use chrono::TimeZone;

    fn stamp(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
    }

    fn stores() -> (Arc<MemoryCacheStore>, Arc<MemoryFileIo>) {
        (Arc::new(MemoryCacheStore::new()), Arc::new(MemoryFileIo::new()))
    }

    #[test]
    fn dirtiness_tracks_value_equality() {
        let (cache, fio) = stores();
        let mut doc = Document::new(cache, fio);
        doc.set_original_content("alpha");

        doc.set_content("beta");
        assert!(doc.is_dirty());

        doc.set_content("alpha");
        assert!(!doc.is_dirty());
    }

    #[test]
    fn ensure_loaded_is_idempotent() {
        let (cache, fio) = stores();
        fio.insert("/w/doc.txt", "from disk", stamp(8));
        let record = TabRecord {
            id: Uuid::new_v4(),
            title: "doc.txt".to_string(),
            file_path: Some(PathBuf::from("/w/doc.txt")),
            ..TabRecord::default()
        };
        let mut doc = Document::from_record(&record, cache, fio);
        assert!(!doc.is_loaded());

        doc.ensure_loaded();
        let first = (
            doc.content.clone(),
            doc.is_dirty(),
            doc.has_cached_changes(),
            doc.last_known_modified(),
        );
        doc.ensure_loaded();
        let second = (
            doc.content.clone(),
            doc.is_dirty(),
            doc.has_cached_changes(),
            doc.last_known_modified(),
        );
        assert_eq!(first, second);
        assert_eq!(doc.content(), "from disk");
    }

    #[test]
    fn cache_entry_overrides_file_content_on_load() {
        let (cache, fio) = stores();
        let id = Uuid::new_v4();
        fio.insert("/w/doc.txt", "saved", stamp(8));
        cache.save(id, "recovered draft");

        let record = TabRecord {
            id,
            file_path: Some(PathBuf::from("/w/doc.txt")),
            ..TabRecord::default()
        };
        let mut doc = Document::from_record(&record, cache, fio);
        assert!(doc.has_cached_changes());

        assert_eq!(doc.content(), "recovered draft");
        assert!(doc.is_dirty());
        // Loaded now, not merely pending.
        assert!(!doc.has_cached_changes());
        assert_eq!(doc.original_content, "saved");
    }

    #[test]
    fn note_loads_cache_as_canonical_and_clean() {
        let (cache, fio) = stores();
        let id = Uuid::new_v4();
        cache.save(id, "note body");

        let record = TabRecord {
            id,
            is_note: true,
            ..TabRecord::default()
        };
        let mut doc = Document::from_record(&record, cache, fio);
        // A note's cache entry is its storage, not pending changes.
        assert!(!doc.has_cached_changes());
        assert_eq!(doc.content(), "note body");
        assert!(!doc.is_dirty());
    }

    #[test]
    fn note_save_writes_cache_and_keeps_it() {
        let (cache, fio) = stores();
        let id = Uuid::new_v4();
        let mut doc = Document::for_note(id, "Ideas", None, cache.clone(), fio);
        doc.set_content("first line");
        assert!(doc.is_dirty());

        doc.save(None).expect("note save");
        assert!(!doc.is_dirty());
        assert_eq!(cache.load(id), Some("first line".to_string()));
    }

    #[test]
    fn file_save_writes_clears_cache_and_refreshes_mtime() {
        let (cache, fio) = stores();
        fio.insert("/w/doc.txt", "old", stamp(8));
        let mut doc = Document::for_file("/w/doc.txt", cache.clone(), fio.clone());
        doc.set_content("new body");
        // Simulate a pending recovery entry from the autosave path.
        cache.save(doc.id(), "new body");

        let before = doc.last_known_modified();
        doc.save(None).expect("save");

        assert!(!doc.is_dirty());
        assert!(!doc.has_cached_changes());
        assert!(!cache.exists(doc.id()));
        assert_eq!(fio.read_to_string(Path::new("/w/doc.txt")), Some("new body".to_string()));
        assert_ne!(doc.last_known_modified(), before);
    }

    #[test]
    fn save_without_target_is_refused_and_state_unchanged() {
        let (cache, fio) = stores();
        let mut doc = Document::new(cache, fio);
        doc.set_content("scratch");

        assert_eq!(doc.save(None), Err(CoreError::SaveTargetRequired));
        assert!(doc.is_dirty());
        assert_eq!(doc.content(), "scratch");
    }

    #[test]
    fn save_with_target_adopts_path_and_title() {
        let (cache, fio) = stores();
        let mut doc = Document::new(cache, fio.clone());
        doc.set_content("scratch");

        doc.save(Some(PathBuf::from("/w/kept.txt"))).expect("save as");
        assert_eq!(doc.file_path(), Some(Path::new("/w/kept.txt")));
        assert_eq!(doc.title(), "kept.txt");
        assert!(!doc.is_dirty());
        assert_eq!(fio.read_to_string(Path::new("/w/kept.txt")), Some("scratch".to_string()));
    }

    #[test]
    fn failed_write_leaves_document_dirty() {
        struct ReadOnlyIo;
        impl FileIo for ReadOnlyIo {
            fn read_to_string(&self, _: &Path) -> Option<String> {
                None
            }
            fn write(&self, _: &Path, _: &str) -> bool {
                false
            }
            fn modified(&self, _: &Path) -> Option<DateTime<Utc>> {
                None
            }
            fn exists(&self, _: &Path) -> bool {
                false
            }
        }

        let cache = Arc::new(MemoryCacheStore::new());
        let mut doc = Document::new(cache, Arc::new(ReadOnlyIo));
        doc.set_content("precious");

        doc.save(Some(PathBuf::from("/ro/doc.txt"))).expect("no error");
        assert!(doc.is_dirty());
    }

    #[test]
    fn external_change_detected_only_on_strictly_newer_mtime() {
        let (cache, fio) = stores();
        fio.insert("/w/doc.txt", "body", stamp(8));
        let mut doc = Document::for_file("/w/doc.txt", cache, fio.clone());
        doc.ensure_loaded();

        assert!(!doc.check_external_change());

        fio.touch(Path::new("/w/doc.txt"), stamp(9));
        assert!(doc.check_external_change());
        assert!(doc.has_external_changes());
    }

    #[test]
    fn missing_file_never_reports_external_change() {
        let (cache, fio) = stores();
        fio.insert("/w/doc.txt", "body", stamp(8));
        let mut doc = Document::for_file("/w/doc.txt", cache, fio.clone());
        doc.ensure_loaded();

        fio.remove(Path::new("/w/doc.txt"));
        assert!(!doc.check_external_change());
        assert!(!doc.has_external_changes());
    }

    #[test]
    fn acknowledge_suppresses_until_known_mtime_moves() {
        let (cache, fio) = stores();
        fio.insert("/w/doc.txt", "body", stamp(8));
        let mut doc = Document::for_file("/w/doc.txt", cache, fio.clone());
        doc.ensure_loaded();
        doc.set_content("edited");

        fio.touch(Path::new("/w/doc.txt"), stamp(9));
        assert!(doc.check_external_change());
        doc.acknowledge_external_changes();
        assert!(!doc.has_external_changes());

        // Same disk stamp, even newer ones: stays quiet while acknowledged.
        assert!(!doc.check_external_change());
        fio.touch(Path::new("/w/doc.txt"), stamp(10));
        assert!(!doc.check_external_change());

        // Saving observes a fresh mtime, which resets the acknowledgement.
        doc.save(None).expect("save");
        fio.touch(Path::new("/w/doc.txt"), stamp(11));
        assert!(doc.check_external_change());
    }

    #[test]
    fn reload_from_disk_clears_conflict_and_cache() {
        let (cache, fio) = stores();
        let id;
        fio.insert("/w/doc.txt", "disk v2", stamp(9));
        let mut doc = {
            let mut d = Document::for_file("/w/doc.txt", cache.clone(), fio.clone());
            d.ensure_loaded();
            id = d.id();
            d
        };
        doc.set_content("local edits");
        cache.save(id, "local edits");
        doc.has_external_changes = true;

        doc.reload_from_disk();
        assert_eq!(doc.content(), "disk v2");
        assert!(!doc.is_dirty());
        assert!(!doc.has_external_changes());
        assert!(!cache.exists(id));
    }

    #[test]
    fn close_discards_cache_for_files_but_not_notes() {
        let (cache, fio) = stores();
        let file_doc = Document::new(cache.clone(), fio.clone());
        cache.save(file_doc.id(), "draft");
        file_doc.discard_cache_entry();
        assert!(!cache.exists(file_doc.id()));

        let note_id = Uuid::new_v4();
        let note = Document::for_note(note_id, "Note", None, cache.clone(), fio);
        cache.save(note_id, "note body");
        note.discard_cache_entry();
        assert!(cache.exists(note_id));
    }

    #[test]
    fn autosave_writes_after_quiescence_when_dirty() {
        let (cache, fio) = stores();
        let mut doc = Document::new(cache.clone(), fio);
        doc.set_content("typed text");

        assert!(!cache.exists(doc.id()));
        std::thread::sleep(AUTOSAVE_QUIESCENCE + Duration::from_millis(250));
        assert_eq!(cache.load(doc.id()), Some("typed text".to_string()));
    }

    #[test]
    fn autosave_restart_coalesces_rapid_edits() {
        let (cache, fio) = stores();
        let mut doc = Document::new(cache.clone(), fio);

        doc.set_content("a");
        std::thread::sleep(Duration::from_millis(300));
        doc.set_content("ab");
        // 350ms after the second edit: inside the restarted window.
        std::thread::sleep(Duration::from_millis(350));
        assert!(!cache.exists(doc.id()));

        std::thread::sleep(Duration::from_millis(450));
        assert_eq!(cache.load(doc.id()), Some("ab".to_string()));
    }

    #[test]
    fn autosave_skips_when_no_longer_dirty_at_fire_time() {
        let (cache, fio) = stores();
        let mut doc = Document::new(cache.clone(), fio);
        doc.set_original_content("base");

        doc.set_content("base edited");
        doc.set_content("base");
        std::thread::sleep(AUTOSAVE_QUIESCENCE + Duration::from_millis(250));
        assert!(!cache.exists(doc.id()));
    }

    #[test]
    fn load_from_cache_marks_recovered_content_dirty() {
        let (cache, fio) = stores();
        let mut doc = Document::new(cache.clone(), fio);
        doc.set_original_content("clean");
        cache.save(doc.id(), "recovered");

        doc.load_from_cache();
        assert_eq!(doc.content(), "recovered");
        assert!(doc.is_dirty());
    }
}

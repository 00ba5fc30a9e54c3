//! The workspace: single logical owner of every open document.
//!
//! All document mutation happens on the caller's thread through this type.
//! Background work never touches the tab list; the external-change poll is a
//! bare ticker whose ticks the owner drains before running the check itself.
//!
//! Every state-affecting mutation (open/close/move/rename/save) rewrites the
//! persisted session.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::cache::CacheStore;
use crate::document::{Document, DocumentId};
use crate::error::CoreResult;
use crate::fsio::FileIo;
use crate::notes::Note;
use crate::session::{SessionState, SessionStore};
use crate::timer::IntervalTimer;

/// How often open file-backed documents are polled for external changes.
pub const EXTERNAL_CHANGE_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// What a poll pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExternalChangeOutcome {
    /// Clean documents silently refreshed from disk.
    pub reloaded: Vec<DocumentId>,
    /// Dirty documents now flagged with a conflict the caller must resolve.
    pub conflicts: Vec<DocumentId>,
}

/// Caller's decision for a conflicted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalChangeResolution {
    /// Discard the buffer and re-read the file.
    Reload,
    /// Keep the buffer and stop notifying for the current disk state.
    KeepEditing,
}

pub struct Workspace {
    documents: Vec<Document>,
    active: Option<DocumentId>,
    prefs: SessionState,
    cache: Arc<dyn CacheStore>,
    fio: Arc<dyn FileIo>,
    session: SessionStore,
}

impl Workspace {
    /// Restores the previous session. Tab content is not read here; each
    /// document loads lazily on first access.
    pub fn new(cache: Arc<dyn CacheStore>, fio: Arc<dyn FileIo>, session: SessionStore) -> Self {
        let state = session.load();
        let mut records = state.tabs.clone();
        records.sort_by_key(|r| r.order);

        let documents: Vec<Document> = records
            .iter()
            .map(|record| Document::from_record(record, cache.clone(), fio.clone()))
            .collect();
        let active = state
            .active_tab_id
            .filter(|id| documents.iter().any(|d| d.id() == *id))
            .or_else(|| documents.first().map(|d| d.id()));

        Self {
            documents,
            active,
            prefs: state,
            cache,
            fio,
            session,
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn documents_mut(&mut self) -> impl Iterator<Item = &mut Document> {
        self.documents.iter_mut()
    }

    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        self.documents.iter().find(|d| d.id() == id)
    }

    pub fn document_mut(&mut self, id: DocumentId) -> Option<&mut Document> {
        self.documents.iter_mut().find(|d| d.id() == id)
    }

    pub fn active_document_id(&self) -> Option<DocumentId> {
        self.active
    }

    pub fn set_active(&mut self, id: DocumentId) {
        if self.documents.iter().any(|d| d.id() == id) {
            self.active = Some(id);
            self.persist();
        }
    }

    /// Session preferences round-tripped for the GUI shell.
    pub fn preferences(&self) -> &SessionState {
        &self.prefs
    }

    /// Applies preference edits from the shell and persists them.
    pub fn update_preferences(&mut self, update: impl FnOnce(&mut SessionState)) {
        update(&mut self.prefs);
        self.persist();
    }

    /// Opens a fresh scratch tab.
    pub fn new_tab(&mut self) -> DocumentId {
        let doc = Document::new(self.cache.clone(), self.fio.clone());
        let id = doc.id();
        self.documents.push(doc);
        self.active = Some(id);
        self.persist();
        id
    }

    /// Opens a file, focusing the existing tab if one already shows it.
    pub fn open_file(&mut self, path: impl Into<PathBuf>) -> DocumentId {
        let path = path.into();
        if let Some(existing) = self
            .documents
            .iter()
            .find(|d| d.file_path() == Some(path.as_path()))
        {
            let id = existing.id();
            self.active = Some(id);
            self.persist();
            return id;
        }

        let doc = Document::for_file(path, self.cache.clone(), self.fio.clone());
        let id = doc.id();
        self.documents.push(doc);
        self.active = Some(id);
        self.persist();
        id
    }

    /// Opens a note, focusing the existing tab if one already shows it.
    pub fn open_note(&mut self, note: &Note) -> DocumentId {
        if let Some(existing) = self.documents.iter().find(|d| d.id() == note.id) {
            let id = existing.id();
            self.active = Some(id);
            self.persist();
            return id;
        }

        let doc = Document::for_note(
            note.id,
            note.title.clone(),
            note.syntax_name.clone(),
            self.cache.clone(),
            self.fio.clone(),
        );
        let id = doc.id();
        self.documents.push(doc);
        self.active = Some(id);
        self.persist();
        id
    }

    /// Closes a tab, dropping its recovery cache entry (notes keep theirs —
    /// the cache is their storage). Returns false for an unknown id.
    pub fn close_tab(&mut self, id: DocumentId) -> bool {
        let Some(index) = self.documents.iter().position(|d| d.id() == id) else {
            return false;
        };
        let doc = self.documents.remove(index);
        doc.discard_cache_entry();

        if self.active == Some(id) {
            self.active = self
                .documents
                .get(index.min(self.documents.len().saturating_sub(1)))
                .map(|d| d.id());
        }
        self.persist();
        true
    }

    /// Moves a tab to a new position in the strip.
    pub fn move_tab(&mut self, id: DocumentId, new_index: usize) -> bool {
        let Some(index) = self.documents.iter().position(|d| d.id() == id) else {
            return false;
        };
        let doc = self.documents.remove(index);
        let target = new_index.min(self.documents.len());
        self.documents.insert(target, doc);
        self.persist();
        true
    }

    pub fn rename_tab(&mut self, id: DocumentId, title: impl Into<String>) -> bool {
        let Some(doc) = self.document_mut(id) else {
            return false;
        };
        doc.set_title(title);
        self.persist();
        true
    }

    /// Saves a document; `target` supplies the path when the document has
    /// none (the save-as flow). Errors from [`Document::save`] pass through
    /// with the document unchanged.
    pub fn save_document(&mut self, id: DocumentId, target: Option<PathBuf>) -> CoreResult<()> {
        let Some(doc) = self.documents.iter_mut().find(|d| d.id() == id) else {
            return Ok(());
        };
        doc.save(target)?;
        self.persist();
        Ok(())
    }

    /// One external-change poll pass over every open document.
    ///
    /// Clean documents are silently reloaded; dirty ones are flagged and
    /// reported back as conflicts for the caller to resolve.
    pub fn check_external_changes(&mut self) -> ExternalChangeOutcome {
        let mut outcome = ExternalChangeOutcome::default();
        let mut refreshed = false;
        for doc in &mut self.documents {
            if !doc.check_external_change() {
                continue;
            }
            if doc.is_dirty() {
                outcome.conflicts.push(doc.id());
            } else {
                doc.reload_from_disk();
                refreshed = true;
                outcome.reloaded.push(doc.id());
            }
        }
        if refreshed {
            self.persist();
        }
        outcome
    }

    /// Applies the caller's decision for a conflicted document.
    pub fn resolve_external_change(&mut self, id: DocumentId, resolution: ExternalChangeResolution) {
        let Some(doc) = self.documents.iter_mut().find(|d| d.id() == id) else {
            return;
        };
        match resolution {
            ExternalChangeResolution::Reload => {
                doc.reload_from_disk();
                self.persist();
            }
            ExternalChangeResolution::KeepEditing => doc.acknowledge_external_changes(),
        }
    }

    fn persist(&mut self) {
        self.prefs.tabs = self
            .documents
            .iter()
            .enumerate()
            .map(|(order, doc)| doc.to_record(order))
            .collect();
        self.prefs.active_tab_id = self.active;
        self.session.save(&self.prefs);
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("documents", &self.documents.len())
            .field("active", &self.active)
            .finish()
    }
}

/// Ticker for the external-change poll.
///
/// The worker thread only posts ticks; the owner drains them and runs
/// [`Workspace::check_external_changes`] itself, keeping all document
/// mutation on one thread. Dropping the monitor stops the ticker.
pub struct ExternalChangeMonitor {
    timer: IntervalTimer,
    ticks: Receiver<()>,
}

impl ExternalChangeMonitor {
    pub fn new(interval: Duration) -> Self {
        let (tx, ticks): (Sender<()>, Receiver<()>) = crossbeam_channel::unbounded();
        let timer = IntervalTimer::new("external-change-poll", interval, move || {
            let _ = tx.send(());
        });
        timer.start();
        Self { timer, ticks }
    }

    /// Channel the owner can select on to wake up for a poll pass.
    pub fn tick_receiver(&self) -> &Receiver<()> {
        &self.ticks
    }

    /// Drains pending ticks; true when at least one poll pass is due.
    pub fn poll_due(&self) -> bool {
        let mut due = false;
        while self.ticks.try_recv().is_ok() {
            due = true;
        }
        due
    }

    pub fn pause(&self) {
        self.timer.stop();
    }

    pub fn resume(&self) {
        self.timer.start();
    }
}

impl std::fmt::Debug for ExternalChangeMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalChangeMonitor").finish()
    }
}

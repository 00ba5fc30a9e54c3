//! Core state model for a tabbed note/text editor.
//!
//! This crate owns everything below the GUI shell: per-tab document state
//! (dirtiness, lazy load, autosave-cache reconciliation, external-change
//! detection), the workspace that holds the open tabs, the persisted notes
//! index, and the session store. Rendering, dialogs, and theming live in the
//! shell; they talk to this crate through plain method calls and the trait
//! seams in [`cache`] and [`fsio`].

pub mod cache;
pub mod document;
pub mod error;
pub mod fsio;
pub mod notes;
pub mod session;
pub mod timer;
pub mod workspace;

pub use crate::cache::{CacheStore, FileCacheStore, MemoryCacheStore};
pub use crate::document::{Document, DocumentId, AUTOSAVE_QUIESCENCE};
pub use crate::error::{CoreError, CoreResult};
pub use crate::fsio::{FileIo, MemoryFileIo, OsFileIo};
pub use crate::notes::{Note, NoteFolder, NoteStore, NotesIndex};
pub use crate::session::{SessionState, SessionStore, TabRecord};
pub use crate::timer::{DebounceTimer, IntervalTimer};
pub use crate::workspace::{
    ExternalChangeMonitor, ExternalChangeOutcome, ExternalChangeResolution, Workspace,
    EXTERNAL_CHANGE_POLL_INTERVAL,
};

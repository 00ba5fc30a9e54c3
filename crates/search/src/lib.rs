//! Full-text search over open documents and directory trees.
//!
//! This crate provides the editor's search engine:
//! - A line-oriented matching primitive with whole-word and case options
//! - Synchronous tabs-mode search over in-memory document content
//! - An asynchronous, cancellable files-mode directory scan
//! - Debounce and single-flight semantics in [`SearchEngine`]

pub mod cancel;
pub mod engine;
pub mod matcher;
pub mod scan;
pub mod tabs;
pub mod types;

pub use cancel::{CancellationToken, SearchVersionTracker};
pub use engine::{SearchEngine, SearchMode, SEARCH_DEBOUNCE};
pub use matcher::{
    find_matches, query_is_searchable, MatchOptions, MIN_QUERY_LEN, PREVIEW_CAP_COMPACT,
    PREVIEW_CAP_FULL,
};
pub use scan::{MAX_FILE_SIZE_BYTES, MAX_SCANNED_FILES, SKIP_DIRECTORIES};
pub use tabs::{quick_find, search_tabs};
pub use types::{QuickMatch, SearchMatch, SearchResultGroup, SearchStatus, SourceRef};

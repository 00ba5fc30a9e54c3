//! Result types for tab and file search.
//!
//! Results are ephemeral, derived data: every qualifying trigger discards
//! the previous result set and recomputes from scratch.

use std::path::PathBuf;

use quire_core::DocumentId;

/// Where a match came from: an open document or a file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    Document(DocumentId),
    File(PathBuf),
}

/// One occurrence of the query.
///
/// `start_offset` and `length` are byte positions into the source's full
/// content (carriage returns included), suitable for caret placement.
/// The preview fields are computed from the `\r`-trimmed line, truncated to
/// the configured cap, and split into before/match/after fragments for
/// highlight rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    /// 1-based line number.
    pub line_number: usize,
    /// 1-based byte column within the line.
    pub column_number: usize,
    /// Byte offset of the match in the whole content.
    pub start_offset: usize,
    /// Match length in bytes.
    pub length: usize,
    pub line_preview: String,
    pub preview_before: String,
    pub match_text: String,
    pub preview_after: String,
}

/// All matches from one source, in line order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResultGroup {
    /// Document title, or file path relative to the scan root.
    pub name: String,
    pub source: SourceRef,
    pub match_count: usize,
    pub items: Vec<SearchMatch>,
}

/// Flat result of the lightweight quick-find over open tabs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickMatch {
    pub document_id: DocumentId,
    pub document_title: String,
    pub line_number: usize,
    pub column_number: usize,
    /// Whitespace-trimmed line, capped at 80 chars with a `...` suffix.
    pub line_preview: String,
    pub start_offset: usize,
    pub length: usize,
}

/// Outcome of the latest search, for the status line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchStatus {
    /// Nothing to report: query too short or search cleared.
    #[default]
    Neutral,
    NoMatches,
    TabMatches {
        matches: usize,
        tabs: usize,
    },
    FileMatches {
        matches: usize,
        files: usize,
    },
    /// Files mode without a folder selected.
    SelectFolder,
    /// The selected folder no longer exists.
    FolderNotFound,
}

impl SearchStatus {
    /// Human-readable status text.
    pub fn message(&self) -> String {
        match self {
            SearchStatus::Neutral => String::new(),
            SearchStatus::NoMatches => "No matches found".to_string(),
            SearchStatus::TabMatches { matches, tabs } => format!(
                "{matches} match{} in {tabs} tab{}",
                match_suffix(*matches),
                count_suffix(*tabs)
            ),
            SearchStatus::FileMatches { matches, files } => format!(
                "{matches} match{} in {files} file{}",
                match_suffix(*matches),
                count_suffix(*files)
            ),
            SearchStatus::SelectFolder => "Select a folder to search".to_string(),
            SearchStatus::FolderNotFound => "Folder not found".to_string(),
        }
    }
}

fn match_suffix(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "es"
    }
}

fn count_suffix(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

//! The search engine: triggers, debounce, and result ownership.
//!
//! The engine's state (query, toggles, results, status) lives on the owning
//! thread. Free-text query edits are coalesced through a 200 ms debounce;
//! toggling case, whole-word, mode, or folder re-searches on the next poll
//! without the delay. Tabs-mode searches run synchronously; files-mode
//! searches run on a worker thread and stream result groups back through a
//! channel.
//!
//! Starting any search bumps the version tracker, which both cancels the
//! in-flight scan worker (single-flight) and invalidates whatever it already
//! posted: [`poll`](SearchEngine::poll) drops updates from stale versions.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use quire_core::{DebounceTimer, Workspace};

use crate::cancel::SearchVersionTracker;
use crate::matcher::{query_is_searchable, MatchOptions, PREVIEW_CAP_FULL};
use crate::scan::{scan_directory, ScanUpdate};
use crate::tabs::search_tabs;
use crate::types::{SearchResultGroup, SearchStatus};

/// Quiescence window for free-text query edits.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    Tabs,
    Files,
}

pub struct SearchEngine {
    query: String,
    case_sensitive: bool,
    whole_word: bool,
    mode: SearchMode,
    folder: Option<PathBuf>,
    results: Vec<SearchResultGroup>,
    status: SearchStatus,
    searching: bool,
    pending_refresh: bool,
    versions: SearchVersionTracker,
    debounce: DebounceTimer,
    debounce_fired: Receiver<()>,
    updates_tx: Sender<ScanUpdate>,
    updates_rx: Receiver<ScanUpdate>,
}

impl SearchEngine {
    pub fn new() -> Self {
        let (fired_tx, debounce_fired) = crossbeam_channel::unbounded();
        let debounce = DebounceTimer::new("search", move || {
            let _ = fired_tx.send(());
        });
        let (updates_tx, updates_rx) = crossbeam_channel::unbounded();

        Self {
            query: String::new(),
            case_sensitive: false,
            whole_word: false,
            mode: SearchMode::default(),
            folder: None,
            results: Vec::new(),
            status: SearchStatus::Neutral,
            searching: false,
            pending_refresh: false,
            versions: SearchVersionTracker::new(),
            debounce,
            debounce_fired,
            updates_tx,
            updates_rx,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Updates the query, scheduling a debounced re-search.
    pub fn set_query(&mut self, query: impl Into<String>) {
        let query = query.into();
        if self.query == query {
            return;
        }
        self.query = query;
        self.debounce.restart(SEARCH_DEBOUNCE);
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn set_case_sensitive(&mut self, value: bool) {
        if self.case_sensitive != value {
            self.case_sensitive = value;
            self.pending_refresh = true;
        }
    }

    pub fn whole_word(&self) -> bool {
        self.whole_word
    }

    pub fn set_whole_word(&mut self, value: bool) {
        if self.whole_word != value {
            self.whole_word = value;
            self.pending_refresh = true;
        }
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SearchMode) {
        if self.mode != mode {
            self.mode = mode;
            self.pending_refresh = true;
        }
    }

    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    pub fn set_folder(&mut self, folder: Option<PathBuf>) {
        if self.folder != folder {
            self.folder = folder;
            self.pending_refresh = true;
        }
    }

    /// The folder's file name for display, falling back to the full path.
    pub fn folder_display_name(&self) -> Option<String> {
        let folder = self.folder.as_ref()?;
        let name = folder
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty());
        Some(name.unwrap_or_else(|| folder.display().to_string()))
    }

    pub fn results(&self) -> &[SearchResultGroup] {
        &self.results
    }

    pub fn status(&self) -> &SearchStatus {
        &self.status
    }

    /// True while a files-mode scan is in flight.
    pub fn is_searching(&self) -> bool {
        self.searching
    }

    /// Cancels everything and resets to the neutral state.
    pub fn clear(&mut self) {
        self.versions.next_version();
        self.debounce.cancel();
        while self.debounce_fired.try_recv().is_ok() {}
        self.query.clear();
        self.results.clear();
        self.status = SearchStatus::Neutral;
        self.searching = false;
        self.pending_refresh = false;
    }

    /// Applies due work: an immediate refresh from a toggle, an elapsed
    /// query debounce, and any result groups the scan worker posted.
    /// Returns true when results or status changed.
    pub fn poll(&mut self, workspace: &mut Workspace) -> bool {
        let mut changed = false;

        let mut refresh = self.pending_refresh;
        while self.debounce_fired.try_recv().is_ok() {
            refresh = true;
        }
        if refresh {
            self.pending_refresh = false;
            self.search_now(workspace);
            changed = true;
        }

        loop {
            match self.updates_rx.try_recv() {
                Ok(ScanUpdate::Group { version, group }) => {
                    if version == self.versions.current_version() {
                        self.results.push(group);
                        changed = true;
                    }
                }
                Ok(ScanUpdate::Finished {
                    version,
                    total_matches,
                    files_with_matches,
                }) => {
                    if version == self.versions.current_version() {
                        self.searching = false;
                        self.status = if total_matches == 0 {
                            SearchStatus::NoMatches
                        } else {
                            SearchStatus::FileMatches {
                                matches: total_matches,
                                files: files_with_matches,
                            }
                        };
                        changed = true;
                    }
                }
                Err(_) => break,
            }
        }
        changed
    }

    /// Channel that signals an elapsed query debounce, for owners that want
    /// to block/select instead of polling on a cadence.
    pub fn wake_receiver(&self) -> &Receiver<()> {
        &self.debounce_fired
    }

    /// Discards the previous results and recomputes for the current inputs.
    /// Cancels any in-flight scan first.
    pub fn search_now(&mut self, workspace: &mut Workspace) {
        self.pending_refresh = false;
        self.debounce.cancel();
        while self.debounce_fired.try_recv().is_ok() {}

        let version = self.versions.next_version();
        self.results.clear();
        self.searching = false;

        match self.mode {
            SearchMode::Tabs => {
                let (groups, status) =
                    search_tabs(workspace.documents_mut(), &self.query, &self.match_options());
                self.results = groups;
                self.status = status;
            }
            SearchMode::Files => {
                if !query_is_searchable(&self.query) || self.folder.is_none() {
                    self.status = if self.folder.is_none() {
                        SearchStatus::SelectFolder
                    } else {
                        SearchStatus::Neutral
                    };
                    return;
                }
                let folder = self.folder.clone().expect("folder checked above");
                if !folder.is_dir() {
                    self.status = SearchStatus::FolderNotFound;
                    return;
                }

                self.searching = true;
                self.status = SearchStatus::Neutral;
                let token = self.versions.token_for_version(version);
                let updates = self.updates_tx.clone();
                let query = self.query.clone();
                let options = self.match_options();
                let spawned = std::thread::Builder::new()
                    .name("file-scan".to_string())
                    .spawn(move || {
                        scan_directory(&folder, &query, &options, version, &token, &updates);
                    });
                if let Err(error) = spawned {
                    log::warn!("file scan thread failed to start: {error}");
                    self.searching = false;
                    self.status = SearchStatus::Neutral;
                }
            }
        }
    }

    fn match_options(&self) -> MatchOptions {
        MatchOptions {
            case_sensitive: self.case_sensitive,
            whole_word: self.whole_word,
            preview_cap: PREVIEW_CAP_FULL,
        }
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("query", &self.query)
            .field("mode", &self.mode)
            .field("results", &self.results.len())
            .field("searching", &self.searching)
            .finish()
    }
}

//! Session state persistence.
//!
//! One JSON document describes the open tabs and the global UI preferences.
//! It is loaded once at startup and rewritten after every state-affecting
//! mutation. Loading tolerates a missing or corrupt file by falling back to
//! defaults; saving is best-effort.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SESSION_FILE_NAME: &str = "state.json";

/// Persisted description of one open tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TabRecord {
    pub id: Uuid,
    pub title: String,
    pub file_path: Option<PathBuf>,
    pub order: usize,
    pub last_modified: Option<DateTime<Utc>>,
    pub syntax_name: Option<String>,
    pub is_note: bool,
}

impl Default for TabRecord {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            title: "Untitled".to_string(),
            file_path: None,
            order: 0,
            last_modified: None,
            syntax_name: None,
            is_note: false,
        }
    }
}

/// The whole persisted session: tabs plus global UI preferences.
///
/// The preference fields are round-tripped for the GUI shell; the core only
/// reads and rewrites them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionState {
    pub tabs: Vec<TabRecord>,
    pub active_tab_id: Option<Uuid>,
    pub window_width: f64,
    pub window_height: f64,
    pub window_x: Option<f64>,
    pub window_y: Option<f64>,
    pub is_maximized: bool,
    pub font_size: f64,
    pub show_whitespace: bool,
    pub show_line_numbers: bool,
    pub use_light_theme: bool,
    pub search_panel_open: bool,
    pub search_panel_width: f64,
    pub notes_panel_open: bool,
    pub notes_panel_width: f64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            tabs: Vec::new(),
            active_tab_id: None,
            window_width: 1200.0,
            window_height: 800.0,
            window_x: None,
            window_y: None,
            is_maximized: false,
            font_size: 10.0,
            show_whitespace: false,
            show_line_numbers: true,
            use_light_theme: false,
            search_panel_open: false,
            search_panel_width: 350.0,
            notes_panel_open: false,
            notes_panel_width: 300.0,
        }
    }
}

/// Loads and saves [`SessionState`] at a fixed path.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<dir>/state.json`, creating nothing until the first save.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(SESSION_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the session, or defaults if the file is missing or unreadable.
    pub fn load(&self) -> SessionState {
        match std::fs::read_to_string(&self.path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(state) => state,
                Err(error) => {
                    tracing::warn!(path = %self.path.display(), %error, "session state unreadable, using defaults");
                    SessionState::default()
                }
            },
            Err(_) => SessionState::default(),
        }
    }

    /// Writes the session. Failures are logged and swallowed.
    pub fn save(&self, state: &SessionState) {
        let json = match serde_json::to_string_pretty(state) {
            Ok(json) => json,
            Err(error) => {
                tracing::warn!(%error, "session state serialization failed");
                return;
            }
        };
        if let Some(parent) = self.path.parent() {
            if let Err(error) = std::fs::create_dir_all(parent) {
                tracing::warn!(dir = %parent.display(), %error, "session directory unavailable");
                return;
            }
        }
        if let Err(error) = std::fs::write(&self.path, json) {
            tracing::warn!(path = %self.path.display(), %error, "session state write failed");
        }
    }
}

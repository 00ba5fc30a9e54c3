//! Notes index: the persisted tree of notes and folders.
//!
//! Notes are documents whose canonical storage is the autosave cache; this
//! index only records their metadata and folder placement. Parent references
//! are ids resolved through lookup, never back-pointers, so tree walks are
//! plain iterative passes over the flat lists.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const NOTES_FILE_NAME: &str = "notes.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub folder_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub syntax_name: Option<String>,
}

impl Default for Note {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            title: "Untitled".to_string(),
            folder_id: None,
            created_at: Utc::now(),
            last_modified: Utc::now(),
            syntax_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoteFolder {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub order: usize,
}

impl Default for NoteFolder {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            name: "New Folder".to_string(),
            parent_id: None,
            order: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotesIndex {
    pub notes: Vec<Note>,
    pub folders: Vec<NoteFolder>,
}

/// Owns the notes index and its JSON persistence.
///
/// Every mutation rewrites the index file best-effort; a failed write is
/// logged and the in-memory index stays authoritative for the session.
pub struct NoteStore {
    path: PathBuf,
    index: NotesIndex,
}

impl NoteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let index = load_index(&path);
        Self { path, index }
    }

    /// `<dir>/notes.json`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(NOTES_FILE_NAME))
    }

    pub fn notes(&self) -> &[Note] {
        &self.index.notes
    }

    pub fn folders(&self) -> &[NoteFolder] {
        &self.index.folders
    }

    pub fn note(&self, id: Uuid) -> Option<&Note> {
        self.index.notes.iter().find(|n| n.id == id)
    }

    pub fn folder(&self, id: Uuid) -> Option<&NoteFolder> {
        self.index.folders.iter().find(|f| f.id == id)
    }

    pub fn is_note(&self, id: Uuid) -> bool {
        self.index.notes.iter().any(|n| n.id == id)
    }

    pub fn create_note(
        &mut self,
        id: Uuid,
        title: impl Into<String>,
        syntax_name: Option<String>,
    ) -> Note {
        let now = Utc::now();
        let note = Note {
            id,
            title: title.into(),
            folder_id: None,
            created_at: now,
            last_modified: now,
            syntax_name,
        };
        self.index.notes.push(note.clone());
        self.save();
        note
    }

    pub fn delete_note(&mut self, id: Uuid) {
        self.index.notes.retain(|n| n.id != id);
        self.save();
    }

    pub fn rename_note(&mut self, id: Uuid, title: impl Into<String>) {
        if let Some(note) = self.index.notes.iter_mut().find(|n| n.id == id) {
            note.title = title.into();
            note.last_modified = Utc::now();
            self.save();
        }
    }

    pub fn update_note(&mut self, id: Uuid, title: impl Into<String>, syntax_name: Option<String>) {
        if let Some(note) = self.index.notes.iter_mut().find(|n| n.id == id) {
            note.title = title.into();
            note.syntax_name = syntax_name;
            note.last_modified = Utc::now();
            self.save();
        }
    }

    pub fn move_note(&mut self, id: Uuid, folder_id: Option<Uuid>) {
        if let Some(note) = self.index.notes.iter_mut().find(|n| n.id == id) {
            note.folder_id = folder_id;
            self.save();
        }
    }

    pub fn create_folder(&mut self, name: impl Into<String>, parent_id: Option<Uuid>) -> NoteFolder {
        let folder = NoteFolder {
            id: Uuid::new_v4(),
            name: name.into(),
            parent_id,
            order: self.index.folders.len(),
        };
        self.index.folders.push(folder.clone());
        self.save();
        folder
    }

    pub fn rename_folder(&mut self, id: Uuid, name: impl Into<String>) {
        if let Some(folder) = self.index.folders.iter_mut().find(|f| f.id == id) {
            folder.name = name.into();
            self.save();
        }
    }

    /// Deletes a folder, its whole subtree, and every note inside it.
    /// Returns the ids of the deleted notes so the caller can drop their
    /// cache entries and close their tabs.
    pub fn delete_folder(&mut self, id: Uuid) -> Vec<Uuid> {
        let mut doomed_folders = Vec::new();
        let mut stack = vec![id];
        while let Some(folder_id) = stack.pop() {
            doomed_folders.push(folder_id);
            stack.extend(
                self.index
                    .folders
                    .iter()
                    .filter(|f| f.parent_id == Some(folder_id))
                    .map(|f| f.id),
            );
        }

        let deleted_notes: Vec<Uuid> = self
            .index
            .notes
            .iter()
            .filter(|n| n.folder_id.is_some_and(|f| doomed_folders.contains(&f)))
            .map(|n| n.id)
            .collect();

        self.index
            .notes
            .retain(|n| !n.folder_id.is_some_and(|f| doomed_folders.contains(&f)));
        self.index.folders.retain(|f| !doomed_folders.contains(&f.id));
        self.save();
        deleted_notes
    }

    /// Reparents a folder. Refused (returns false) when the new parent is the
    /// folder itself or one of its descendants, which would create a cycle.
    pub fn move_folder(&mut self, id: Uuid, new_parent: Option<Uuid>) -> bool {
        if let Some(parent) = new_parent {
            if self.is_descendant(parent, id) {
                return false;
            }
        }
        match self.index.folders.iter_mut().find(|f| f.id == id) {
            Some(folder) => {
                folder.parent_id = new_parent;
                self.save();
                true
            }
            None => false,
        }
    }

    /// Walks ancestor links from `candidate` upward looking for `ancestor`.
    /// A folder counts as its own descendant.
    fn is_descendant(&self, candidate: Uuid, ancestor: Uuid) -> bool {
        if candidate == ancestor {
            return true;
        }
        let mut seen = Vec::new();
        let mut current = self.folder(candidate).and_then(|f| f.parent_id);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            if seen.contains(&parent) {
                // Malformed index; stop rather than loop.
                return false;
            }
            seen.push(parent);
            current = self.folder(parent).and_then(|f| f.parent_id);
        }
        false
    }

    fn save(&self) {
        let json = match serde_json::to_string_pretty(&self.index) {
            Ok(json) => json,
            Err(error) => {
                tracing::warn!(%error, "notes index serialization failed");
                return;
            }
        };
        if let Some(parent) = self.path.parent() {
            if let Err(error) = std::fs::create_dir_all(parent) {
                tracing::warn!(dir = %parent.display(), %error, "notes directory unavailable");
                return;
            }
        }
        if let Err(error) = std::fs::write(&self.path, json) {
            tracing::warn!(path = %self.path.display(), %error, "notes index write failed");
        }
    }
}

fn load_index(path: &Path) -> NotesIndex {
    match std::fs::read_to_string(path) {
        Ok(json) => match serde_json::from_str(&json) {
            Ok(index) => index,
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "notes index unreadable, starting empty");
                NotesIndex::default()
            }
        },
        Err(_) => NotesIndex::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, NoteStore) {
        let dir = tempdir().expect("tempdir");
        let store = NoteStore::in_dir(dir.path());
        (dir, store)
    }

    #[test]
    fn create_and_look_up_note() {
        let (_dir, mut store) = store();
        let id = Uuid::new_v4();
        store.create_note(id, "Shopping", None);

        assert!(store.is_note(id));
        assert_eq!(store.note(id).map(|n| n.title.as_str()), Some("Shopping"));
        assert!(!store.is_note(Uuid::new_v4()));
    }

    #[test]
    fn index_persists_across_reloads() {
        let dir = tempdir().expect("tempdir");
        let id = Uuid::new_v4();
        {
            let mut store = NoteStore::in_dir(dir.path());
            store.create_note(id, "Kept", Some("Markdown".to_string()));
            store.create_folder("Projects", None);
        }
        let store = NoteStore::in_dir(dir.path());
        assert_eq!(store.notes().len(), 1);
        assert_eq!(store.note(id).and_then(|n| n.syntax_name.clone()), Some("Markdown".to_string()));
        assert_eq!(store.folders().len(), 1);
        assert_eq!(store.folders()[0].name, "Projects");
    }

    #[test]
    fn delete_folder_removes_subtree_and_reports_notes() {
        let (_dir, mut store) = store();
        let root = store.create_folder("root", None);
        let child = store.create_folder("child", Some(root.id));
        let grandchild = store.create_folder("grandchild", Some(child.id));
        let sibling = store.create_folder("sibling", None);

        let in_child = Uuid::new_v4();
        let in_grandchild = Uuid::new_v4();
        let outside = Uuid::new_v4();
        store.create_note(in_child, "a", None);
        store.move_note(in_child, Some(child.id));
        store.create_note(in_grandchild, "b", None);
        store.move_note(in_grandchild, Some(grandchild.id));
        store.create_note(outside, "c", None);

        let mut deleted = store.delete_folder(root.id);
        deleted.sort();
        let mut expected = vec![in_child, in_grandchild];
        expected.sort();
        assert_eq!(deleted, expected);

        assert!(store.folder(root.id).is_none());
        assert!(store.folder(child.id).is_none());
        assert!(store.folder(grandchild.id).is_none());
        assert!(store.folder(sibling.id).is_some());
        assert!(store.is_note(outside));
        assert!(!store.is_note(in_child));
    }

    #[test]
    fn move_folder_refuses_cycles() {
        let (_dir, mut store) = store();
        let a = store.create_folder("a", None);
        let b = store.create_folder("b", Some(a.id));
        let c = store.create_folder("c", Some(b.id));

        // Into itself or a descendant: refused, tree unchanged.
        assert!(!store.move_folder(a.id, Some(a.id)));
        assert!(!store.move_folder(a.id, Some(c.id)));
        assert_eq!(store.folder(a.id).unwrap().parent_id, None);

        // Upward moves are fine.
        assert!(store.move_folder(c.id, Some(a.id)));
        assert_eq!(store.folder(c.id).unwrap().parent_id, Some(a.id));
    }

    #[test]
    fn rename_note_bumps_last_modified() {
        let (_dir, mut store) = store();
        let id = Uuid::new_v4();
        let created = store.create_note(id, "before", None);
        store.rename_note(id, "after");

        let note = store.note(id).unwrap();
        assert_eq!(note.title, "after");
        assert!(note.last_modified >= created.last_modified);
    }
}

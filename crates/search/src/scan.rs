//! Files-mode directory scanning.
//!
//! The scan runs on its own thread and never touches shared result state:
//! each discovered group is posted through a channel and the owning thread
//! folds it in. Traversal is an explicit stack (no recursion), bounded by a
//! file-count ceiling, with version-control and build-artifact directories
//! skipped. One unreadable file never aborts the scan; a cancelled scan
//! stops at the next token check and posts nothing further — not even a
//! final status.

use std::path::{Path, PathBuf};

use crossbeam_channel::Sender;

use crate::cancel::CancellationToken;
use crate::matcher::{find_matches, MatchOptions};
use crate::types::{SearchResultGroup, SourceRef};

/// Ceiling on files visited per scan, bounding worst-case latency on huge
/// trees.
pub const MAX_SCANNED_FILES: usize = 5000;

/// Files larger than this are skipped even if they would match.
pub const MAX_FILE_SIZE_BYTES: u64 = 1024 * 1024;

/// Directory names excluded from traversal (compared case-insensitively).
pub const SKIP_DIRECTORIES: [&str; 7] = [".git", ".vs", "node_modules", "bin", "obj", ".svn", ".hg"];

/// Extensions that are almost certainly binary; their files are skipped
/// without being read.
const BINARY_EXTENSIONS: [&str; 31] = [
    "exe", "dll", "pdb", "obj", "bin", "zip", "tar", "gz", "7z", "png", "jpg", "jpeg", "gif",
    "bmp", "ico", "svg", "mp3", "mp4", "avi", "mov", "wav", "pdf", "doc", "docx", "xls", "xlsx",
    "woff", "woff2", "ttf", "o", "so",
];

/// A message from the scan worker to the owning thread.
///
/// Every update carries the version of the scan that produced it; the owner
/// drops updates whose version is no longer current, so a cancelled scan can
/// never contribute results.
#[derive(Debug)]
pub(crate) enum ScanUpdate {
    Group {
        version: u64,
        group: SearchResultGroup,
    },
    Finished {
        version: u64,
        total_matches: usize,
        files_with_matches: usize,
    },
}

/// Walks `root` and posts one group per matching file, in discovery order.
pub(crate) fn scan_directory(
    root: &Path,
    query: &str,
    options: &MatchOptions,
    version: u64,
    token: &CancellationToken,
    updates: &Sender<ScanUpdate>,
) {
    let mut total_matches = 0usize;
    let mut files_with_matches = 0usize;
    let mut visited = 0usize;

    let mut stack = vec![root.to_path_buf()];
    'walk: while let Some(dir) = stack.pop() {
        if token.is_cancelled().is_none() {
            return;
        }
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };

        let mut subdirs = Vec::new();
        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let path = entry.path();
            if file_type.is_dir() {
                if !is_skipped_directory(&path) {
                    subdirs.push(path);
                }
                continue;
            }
            if !file_type.is_file() {
                continue;
            }
            if visited >= MAX_SCANNED_FILES {
                break 'walk;
            }
            visited += 1;
            if token.is_cancelled().is_none() {
                return;
            }

            if let Some(group) = scan_file(&path, root, query, options) {
                total_matches += group.match_count;
                files_with_matches += 1;
                if updates.send(ScanUpdate::Group { version, group }).is_err() {
                    // Receiver gone; the session ended.
                    return;
                }
            }
        }
        stack.append(&mut subdirs);
    }

    if token.is_cancelled().is_none() {
        return;
    }
    log::debug!(
        "file scan finished: visited={visited} matches={total_matches} files={files_with_matches}"
    );
    let _ = updates.send(ScanUpdate::Finished {
        version,
        total_matches,
        files_with_matches,
    });
}

/// Matches one file, or `None` when it is skipped (too large, binary,
/// unreadable) or has no matches.
fn scan_file(
    path: &Path,
    root: &Path,
    query: &str,
    options: &MatchOptions,
) -> Option<SearchResultGroup> {
    let metadata = std::fs::metadata(path).ok()?;
    if metadata.len() > MAX_FILE_SIZE_BYTES {
        return None;
    }
    if has_binary_extension(path) {
        return None;
    }
    // Read failures (permissions, non-UTF-8 content) skip the file.
    let content = std::fs::read_to_string(path).ok()?;

    let items = find_matches(&content, query, options);
    if items.is_empty() {
        return None;
    }

    let name = path
        .strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string();
    Some(SearchResultGroup {
        name,
        source: SourceRef::File(path.to_path_buf()),
        match_count: items.len(),
        items,
    })
}

fn is_skipped_directory(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| {
            SKIP_DIRECTORIES
                .iter()
                .any(|skip| name.eq_ignore_ascii_case(skip))
        })
}

fn has_binary_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            BINARY_EXTENSIONS
                .iter()
                .any(|binary| ext.eq_ignore_ascii_case(binary))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, content).expect("write");
    }

    fn run(root: &Path, query: &str) -> (Vec<SearchResultGroup>, Option<(usize, usize)>) {
        let (tx, rx) = unbounded();
        let token = CancellationToken::noop();
        scan_directory(root, query, &MatchOptions::default(), 1, &token, &tx);
        drop(tx);

        let mut groups = Vec::new();
        let mut finished = None;
        while let Ok(update) = rx.recv() {
            match update {
                ScanUpdate::Group { group, .. } => groups.push(group),
                ScanUpdate::Finished {
                    total_matches,
                    files_with_matches,
                    ..
                } => finished = Some((total_matches, files_with_matches)),
            }
        }
        (groups, finished)
    }

    #[test]
    fn finds_matches_with_root_relative_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "a.txt", "one needle");
        write(dir.path(), "sub/b.txt", "needle needle");
        write(dir.path(), "sub/c.txt", "nothing");

        let (mut groups, finished) = run(dir.path(), "needle");
        groups.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "a.txt");
        assert_eq!(groups[1].name, "sub/b.txt");
        assert_eq!(groups[1].match_count, 2);
        assert_eq!(finished, Some((3, 2)));
    }

    #[test]
    fn oversize_files_are_excluded_even_when_matching() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut big = String::with_capacity(MAX_FILE_SIZE_BYTES as usize + 64);
        big.push_str("needle\n");
        big.push_str(&"x".repeat(MAX_FILE_SIZE_BYTES as usize));
        write(dir.path(), "big.txt", &big);
        write(dir.path(), "small.txt", "needle");

        let (groups, finished) = run(dir.path(), "needle");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "small.txt");
        assert_eq!(finished, Some((1, 1)));
    }

    #[test]
    fn binary_extensions_are_not_read() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "image.PNG", "needle");
        write(dir.path(), "archive.zip", "needle");
        write(dir.path(), "plain.txt", "needle");

        let (groups, _) = run(dir.path(), "needle");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "plain.txt");
    }

    #[test]
    fn version_control_directories_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), ".git/objects/blob.txt", "needle");
        write(dir.path(), "node_modules/pkg/index.js", "needle");
        write(dir.path(), "src/main.rs", "needle");

        let (groups, _) = run(dir.path(), "needle");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "src/main.rs");
    }

    #[test]
    fn cancelled_scan_posts_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "a.txt", "needle");

        let tracker = crate::cancel::SearchVersionTracker::new();
        let version = tracker.next_version();
        let token = tracker.token_for_version(version);
        tracker.next_version(); // cancel before the scan starts

        let (tx, rx) = unbounded();
        scan_directory(
            dir.path(),
            "needle",
            &MatchOptions::default(),
            version,
            &token,
            &tx,
        );
        drop(tx);
        assert!(rx.recv().is_err(), "cancelled scan must stay silent");
    }

    #[test]
    fn non_utf8_files_are_skipped_silently() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("junk.dat"), [0x6e, 0xff, 0xfe, 0x00]).expect("write");
        write(dir.path(), "ok.txt", "needle");

        let (groups, finished) = run(dir.path(), "needle");
        assert_eq!(groups.len(), 1);
        assert_eq!(finished, Some((1, 1)));
    }
}

//! The shared matching primitive.
//!
//! Matching is line-oriented: content splits on `\n`, each line is scanned
//! left to right with `memchr::memmem`, and whole-content byte offsets are
//! accumulated as `line.len() + 1` per line — carriage returns stay in the
//! offset arithmetic and are only trimmed from previews.
//!
//! Case-insensitive comparison is ASCII case folding, which preserves byte
//! lengths and UTF-8 boundaries so match offsets index the original text.

use memchr::memmem;

use crate::types::SearchMatch;

/// Queries shorter than this yield an empty result set and a neutral status.
pub const MIN_QUERY_LEN: usize = 2;

/// Preview cap for the search panel.
pub const PREVIEW_CAP_FULL: usize = 200;

/// Preview cap for the lightweight quick-find.
pub const PREVIEW_CAP_COMPACT: usize = 80;

#[derive(Debug, Clone, Copy)]
pub struct MatchOptions {
    pub case_sensitive: bool,
    pub whole_word: bool,
    /// Preview truncation cap, in chars.
    pub preview_cap: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            whole_word: false,
            preview_cap: PREVIEW_CAP_FULL,
        }
    }
}

/// True when the query is long enough to search for.
pub fn query_is_searchable(query: &str) -> bool {
    query.chars().count() >= MIN_QUERY_LEN
}

/// Finds every occurrence of `query` in `text`.
///
/// Matches do not overlap: the scan advances by the match length after an
/// accepted match. A whole-word rejection advances by one byte instead, so a
/// candidate starting inside the rejected span is still found.
pub fn find_matches(text: &str, query: &str, options: &MatchOptions) -> Vec<SearchMatch> {
    if !query_is_searchable(query) {
        return Vec::new();
    }
    let scanner = LineScanner::new(query, options.case_sensitive, options.whole_word);
    let query_len = query.len();

    let mut matches = Vec::new();
    let mut offset = 0usize;
    for (line_index, line) in text.split('\n').enumerate() {
        for idx in scanner.positions(line) {
            let (line_preview, preview_before, match_text, preview_after) =
                build_preview(line, idx, query_len, options.preview_cap);
            matches.push(SearchMatch {
                line_number: line_index + 1,
                column_number: idx + 1,
                start_offset: offset + idx,
                length: query_len,
                line_preview,
                preview_before,
                match_text,
                preview_after,
            });
        }
        offset += line.len() + 1;
    }
    matches
}

/// Reusable per-line scanner: one needle fold and one finder for a whole
/// search pass.
pub(crate) struct LineScanner {
    finder: memmem::Finder<'static>,
    needle_len: usize,
    case_sensitive: bool,
    whole_word: bool,
}

impl LineScanner {
    pub(crate) fn new(query: &str, case_sensitive: bool, whole_word: bool) -> Self {
        let needle = if case_sensitive {
            query.as_bytes().to_vec()
        } else {
            query.to_ascii_lowercase().into_bytes()
        };
        Self {
            needle_len: needle.len(),
            finder: memmem::Finder::new(&needle).into_owned(),
            case_sensitive,
            whole_word,
        }
    }

    /// Byte offsets of accepted matches within `line`.
    pub(crate) fn positions(&self, line: &str) -> Vec<usize> {
        let mut positions = Vec::new();
        if self.needle_len == 0 || self.needle_len > line.len() {
            return positions;
        }

        let folded;
        let hay: &[u8] = if self.case_sensitive {
            line.as_bytes()
        } else {
            folded = line.to_ascii_lowercase();
            folded.as_bytes()
        };

        let mut pos = 0usize;
        while pos + self.needle_len <= hay.len() {
            let Some(found) = self.finder.find(&hay[pos..]) else {
                break;
            };
            let idx = pos + found;
            if self.whole_word && !word_bounded(line, idx, self.needle_len) {
                pos = idx + 1;
                continue;
            }
            positions.push(idx);
            pos = idx + self.needle_len;
        }
        positions
    }
}

/// Whole-word check: the chars adjacent to the match (if any) must not be
/// alphanumeric.
fn word_bounded(line: &str, idx: usize, len: usize) -> bool {
    let before_ok = line[..idx]
        .chars()
        .next_back()
        .is_none_or(|c| !c.is_alphanumeric());
    let after_ok = line[idx + len..]
        .chars()
        .next()
        .is_none_or(|c| !c.is_alphanumeric());
    before_ok && after_ok
}

/// Truncates the `\r`-trimmed line to the preview cap and slices it into
/// before/match/after fragments, clamping the slice indices to the truncated
/// preview's bounds.
fn build_preview(line: &str, idx: usize, len: usize, cap: usize) -> (String, String, String, String) {
    let trimmed = line.trim_end_matches('\r');
    let preview = truncate_chars(trimmed, cap);
    let start = idx.min(preview.len());
    let end = (idx + len).min(preview.len());
    (
        preview.to_string(),
        preview[..start].to_string(),
        preview[start..end].to_string(),
        preview[end..].to_string(),
    )
}

/// Char-count truncation that never splits a code point.
pub(crate) fn truncate_chars(text: &str, cap: usize) -> &str {
    match text.char_indices().nth(cap) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

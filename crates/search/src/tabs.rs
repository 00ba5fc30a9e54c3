//! Synchronous search over open documents.
//!
//! Tabs-mode search reads each document's current in-memory content (not its
//! disk state), so unsaved edits are searched. Results are recomputed in
//! full on every trigger.

use quire_core::Document;

use crate::matcher::{
    find_matches, query_is_searchable, truncate_chars, LineScanner, MatchOptions,
    PREVIEW_CAP_COMPACT,
};
use crate::types::{QuickMatch, SearchResultGroup, SearchStatus, SourceRef};

/// Searches every document, producing one result group per document with at
/// least one match.
pub fn search_tabs<'a, I>(
    documents: I,
    query: &str,
    options: &MatchOptions,
) -> (Vec<SearchResultGroup>, SearchStatus)
where
    I: IntoIterator<Item = &'a mut Document>,
{
    if !query_is_searchable(query) {
        return (Vec::new(), SearchStatus::Neutral);
    }

    let mut groups = Vec::new();
    let mut total_matches = 0;
    for document in documents {
        let id = document.id();
        let name = document.title().to_string();
        let items = find_matches(document.content(), query, options);
        if items.is_empty() {
            continue;
        }
        total_matches += items.len();
        groups.push(SearchResultGroup {
            name,
            source: SourceRef::Document(id),
            match_count: items.len(),
            items,
        });
    }

    let status = if total_matches == 0 {
        SearchStatus::NoMatches
    } else {
        SearchStatus::TabMatches {
            matches: total_matches,
            tabs: groups.len(),
        }
    };
    (groups, status)
}

/// The lightweight go-to-match variant: a flat result list with trimmed
/// 80-char previews and a case toggle only.
pub fn quick_find<'a, I>(
    documents: I,
    query: &str,
    case_sensitive: bool,
) -> (Vec<QuickMatch>, SearchStatus)
where
    I: IntoIterator<Item = &'a mut Document>,
{
    if !query_is_searchable(query) {
        return (Vec::new(), SearchStatus::Neutral);
    }

    let scanner = LineScanner::new(query, case_sensitive, false);
    let query_len = query.len();

    let mut results = Vec::new();
    let mut total_matches = 0;
    let mut tabs_with_matches = 0;
    for document in documents {
        let id = document.id();
        let title = document.title().to_string();
        let content = document.content();

        let mut offset = 0usize;
        let mut tab_has_match = false;
        for (line_index, line) in content.split('\n').enumerate() {
            for idx in scanner.positions(line) {
                if !tab_has_match {
                    tab_has_match = true;
                    tabs_with_matches += 1;
                }
                total_matches += 1;
                results.push(QuickMatch {
                    document_id: id,
                    document_title: title.clone(),
                    line_number: line_index + 1,
                    column_number: idx + 1,
                    line_preview: compact_preview(line),
                    start_offset: offset + idx,
                    length: query_len,
                });
            }
            offset += line.len() + 1;
        }
    }

    let status = if total_matches == 0 {
        SearchStatus::NoMatches
    } else {
        SearchStatus::TabMatches {
            matches: total_matches,
            tabs: tabs_with_matches,
        }
    };
    (results, status)
}

fn compact_preview(line: &str) -> String {
    let trimmed = line.trim();
    let capped = truncate_chars(trimmed, PREVIEW_CAP_COMPACT);
    if capped.len() < trimmed.len() {
        format!("{capped}...")
    } else {
        capped.to_string()
    }
}

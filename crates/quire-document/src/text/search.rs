// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Case-insensitive text search across the working set.

use std::fmt;

use quire_core::types::PageId;
use serde::Serialize;
use tracing::{debug, instrument};

use super::index::normalize_whitespace;
use crate::workspace::model::PageInstance;

/// One occurrence of the query on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    pub page_id: PageId,
    /// 0-based, counting occurrences on this page in text order.
    pub occurrence: usize,
    pub snippet: String,
}

/// Why a search produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EmptyReason {
    EmptyQuery,
    /// No page has a text layer or OCR text yet.
    NoSearchablePages { unsearchable: usize },
    NoMatches { query: String, searched: usize },
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyQuery => write!(f, "enter some text to search for"),
            Self::NoSearchablePages { unsearchable: 0 } => write!(f, "there are no pages to search"),
            Self::NoSearchablePages { unsearchable } => write!(
                f,
                "none of the {} pages has searchable text; run OCR first",
                unsearchable
            ),
            Self::NoMatches { query, searched } => write!(
                f,
                "\"{}\" does not appear on any of the {} searchable pages",
                query, searched
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SearchOutcome {
    Matches(Vec<SearchMatch>),
    Empty(EmptyReason),
}

impl SearchOutcome {
    pub fn matches(&self) -> &[SearchMatch] {
        match self {
            Self::Matches(matches) => matches,
            Self::Empty(_) => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matches().is_empty()
    }
}

/// Find every non-overlapping, case-insensitive occurrence of `query`.
///
/// Pages are visited in order; pages without a text source are skipped.
/// Snippets carry up to `context` characters on each side of the match.
#[instrument(skip_all, fields(pages = pages.len(), query_len = query.len()))]
pub fn search(pages: &[PageInstance], query: &str, context: usize) -> SearchOutcome {
    let needle: Vec<char> = query.trim().chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return SearchOutcome::Empty(EmptyReason::EmptyQuery);
    }

    let mut matches = Vec::new();
    let mut searched = 0;
    for page in pages {
        let Some(text) = page.text_source.text() else {
            continue;
        };
        searched += 1;
        for (occurrence, (start, end)) in find_occurrences(text, &needle).into_iter().enumerate() {
            matches.push(SearchMatch {
                page_id: page.id,
                occurrence,
                snippet: snippet(text, start, end, context),
            });
        }
    }

    debug!(searched, found = matches.len(), "Search finished");
    if searched == 0 {
        SearchOutcome::Empty(EmptyReason::NoSearchablePages {
            unsearchable: pages.len(),
        })
    } else if matches.is_empty() {
        SearchOutcome::Empty(EmptyReason::NoMatches {
            query: query.trim().to_string(),
            searched,
        })
    } else {
        SearchOutcome::Matches(matches)
    }
}

/// Char-index spans `[start, end)` of each non-overlapping occurrence of the
/// lowercase `needle` in `text`, compared case-insensitively.
pub(crate) fn find_occurrences(text: &str, needle: &[char]) -> Vec<(usize, usize)> {
    // Lowercasing can expand a char, so keep the original index of each
    // lowered char.
    let lowered: Vec<(char, usize)> = text
        .chars()
        .enumerate()
        .flat_map(|(index, c)| c.to_lowercase().map(move |lower| (lower, index)))
        .collect();

    let mut spans = Vec::new();
    if needle.is_empty() || lowered.len() < needle.len() {
        return spans;
    }
    let mut at = 0;
    while at + needle.len() <= lowered.len() {
        let window = &lowered[at..at + needle.len()];
        if window.iter().map(|(c, _)| c).eq(needle.iter()) {
            let start = window[0].1;
            let end = window[needle.len() - 1].1 + 1;
            spans.push((start, end));
            at += needle.len();
        } else {
            at += 1;
        }
    }
    spans
}

fn snippet(text: &str, start: usize, end: usize, context: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let from = start.saturating_sub(context);
    let to = (end + context).min(chars.len());
    normalize_whitespace(&chars[from..to].iter().collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_core::types::{DocumentId, TextSource};

    fn page(text: Option<&str>) -> PageInstance {
        let source = match text {
            Some(text) => TextSource::Native { text: text.into() },
            None => TextSource::None,
        };
        PageInstance::new(DocumentId::default(), 0, source)
    }

    #[test]
    fn every_occurrence_is_reported_in_order() {
        let pages = [page(Some("xx abc abc yy"))];
        let outcome = search(&pages, "abc", 40);
        let matches = outcome.matches();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].occurrence, 0);
        assert_eq!(matches[1].occurrence, 1);
        assert_eq!(matches[0].snippet, "xx abc abc yy");
    }

    #[test]
    fn snippets_differ_when_context_is_short() {
        let pages = [page(Some("xx abc abc yy"))];
        let outcome = search(&pages, "abc", 3);
        let snippets: Vec<_> = outcome.matches().iter().map(|m| m.snippet.as_str()).collect();
        assert_eq!(snippets, vec!["xx abc ab", "bc abc yy"]);
    }

    #[test]
    fn matching_ignores_case() {
        let pages = [page(Some("Hello WORLD"))];
        assert_eq!(search(&pages, "world", 40).matches().len(), 1);
        assert_eq!(search(&pages, "HELLO", 40).matches().len(), 1);
    }

    #[test]
    fn overlapping_occurrences_are_not_double_counted() {
        let pages = [page(Some("aaaa"))];
        assert_eq!(search(&pages, "aa", 40).matches().len(), 2);
    }

    #[test]
    fn empty_query_has_its_own_reason() {
        let pages = [page(Some("text"))];
        let outcome = search(&pages, "   ", 40);
        assert_eq!(outcome, SearchOutcome::Empty(EmptyReason::EmptyQuery));
        if let SearchOutcome::Empty(reason) = outcome {
            assert!(reason.to_string().contains("enter some text"));
        }
    }

    #[test]
    fn pages_without_text_never_match() {
        let pages = [page(None), page(None)];
        let outcome = search(&pages, "anything", 40);
        assert_eq!(
            outcome,
            SearchOutcome::Empty(EmptyReason::NoSearchablePages { unsearchable: 2 })
        );
    }

    #[test]
    fn no_match_names_the_query() {
        let pages = [page(Some("alpha")), page(None)];
        let SearchOutcome::Empty(reason) = search(&pages, "omega", 40) else {
            panic!("expected no matches");
        };
        assert_eq!(
            reason,
            EmptyReason::NoMatches {
                query: "omega".into(),
                searched: 1
            }
        );
        assert!(reason.to_string().contains("\"omega\""));
    }

    #[test]
    fn snippet_collapses_whitespace() {
        let pages = [page(Some("before\n\n  target \t after"))];
        let outcome = search(&pages, "target", 40);
        assert_eq!(outcome.matches()[0].snippet, "before target after");
    }

    #[test]
    fn expanding_lowercase_maps_back_to_original_chars() {
        // 'İ' lowercases to two chars.
        let spans = find_occurrences("xİy", &['y']);
        assert_eq!(spans, vec![(2, 3)]);
    }
}

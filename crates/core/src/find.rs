//! Search controller interface
//!
//! The text overlay only reads search state. Whatever owns the find bar
//! implements [`FindController`]; [`FindState`] is a plain snapshot that
//! covers the common case and is used by the CLI and tests.

use crate::text_content::TextContent;
use serde::{Deserialize, Serialize};

/// The match the user is currently focused on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedMatch {
    pub page_index: usize,
    pub match_index: usize,
}

/// Read-only view of a search controller
pub trait FindController: Send + Sync {
    /// Whether a search is in progress
    fn is_active(&self) -> bool;

    /// Highlight every match instead of only the selected one
    fn highlight_all(&self) -> bool;

    /// Length of the current query in `char`s
    fn query_len(&self) -> usize;

    /// Match start offsets for a page, ascending
    fn page_matches(&self, page_index: usize) -> Vec<usize>;

    /// The selected match, if any
    fn selected(&self) -> Option<SelectedMatch>;
}

/// Snapshot of search state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindState {
    pub active: bool,
    pub highlight_all: bool,
    pub query: String,
    /// Match offsets per page index
    pub page_matches: Vec<Vec<usize>>,
    pub selected: Option<SelectedMatch>,
}

impl FindState {
    /// Search the given pages for `query` and select the first match
    pub fn search(pages: &[&TextContent], query: &str, case_sensitive: bool) -> Self {
        let page_matches: Vec<Vec<usize>> = pages
            .iter()
            .map(|content| find_offsets(&content.full_text(), query, case_sensitive))
            .collect();

        let selected = page_matches
            .iter()
            .position(|matches| !matches.is_empty())
            .map(|page_index| SelectedMatch { page_index, match_index: 0 });

        Self {
            active: !query.is_empty(),
            highlight_all: false,
            query: query.to_string(),
            page_matches,
            selected,
        }
    }

    pub fn with_highlight_all(mut self, highlight_all: bool) -> Self {
        self.highlight_all = highlight_all;
        self
    }

    pub fn with_selected(mut self, selected: Option<SelectedMatch>) -> Self {
        self.selected = selected;
        self
    }

    /// Total number of matches across all pages
    pub fn match_count(&self) -> usize {
        self.page_matches.iter().map(Vec::len).sum()
    }
}

impl FindController for FindState {
    fn is_active(&self) -> bool {
        self.active
    }

    fn highlight_all(&self) -> bool {
        self.highlight_all
    }

    fn query_len(&self) -> usize {
        self.query.chars().count()
    }

    fn page_matches(&self, page_index: usize) -> Vec<usize> {
        self.page_matches.get(page_index).cloned().unwrap_or_default()
    }

    fn selected(&self) -> Option<SelectedMatch> {
        self.selected
    }
}

/// Start offsets (in `char`s) of every occurrence of `query` in `text`
///
/// Occurrences do not overlap; scanning resumes after each match.
pub fn find_offsets(text: &str, query: &str, case_sensitive: bool) -> Vec<usize> {
    if query.is_empty() {
        return Vec::new();
    }

    let fold = |c: char| if case_sensitive { c } else { fold_char(c) };
    let haystack: Vec<char> = text.chars().map(fold).collect();
    let needle: Vec<char> = query.chars().map(fold).collect();

    let mut offsets = Vec::new();
    let mut position = 0;
    while position + needle.len() <= haystack.len() {
        if haystack[position..position + needle.len()] == needle[..] {
            offsets.push(position);
            position += needle.len();
        } else {
            position += 1;
        }
    }

    offsets
}

/// Single-char case fold; characters whose lowercase form expands are kept
fn fold_char(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(folded), None) => folded,
        _ => c,
    }
}

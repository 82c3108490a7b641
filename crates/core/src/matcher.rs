//! Finds roster names in extracted text.
//!
//! Plain substring search, case-sensitive, no word boundaries. Each entry
//! yields at most one hit per document whichever form of its name matched.

use crate::models::{Hit, RosterEntry};
use crate::roster::{is_inline_separator, normalize_name, Roster};
use std::path::Path;

const SNIPPET_CONTEXT_CHARS: usize = 20;

struct Candidate<'a> {
    entry: &'a RosterEntry,
    normalized: String,
}

pub struct RosterMatcher<'a> {
    candidates: Vec<Candidate<'a>>,
    match_identifiers: bool,
}

/// `text` with in-line separators removed, plus the byte range in the
/// original text of every kept char. Line breaks are kept so a name never
/// matches across lines.
struct Stripped {
    text: String,
    spans: Vec<(usize, usize)>,
}

impl Stripped {
    fn new(original: &str) -> Self {
        let mut text = String::with_capacity(original.len());
        let mut spans = Vec::new();
        for (at, c) in original.char_indices() {
            if !is_inline_separator(c) {
                text.push(c);
                spans.push((at, at + c.len_utf8()));
            }
        }
        Self { text, spans }
    }

    /// Byte range in the original text covering the first occurrence of
    /// `needle`.
    fn find(&self, needle: &str) -> Option<(usize, usize)> {
        let byte = self.text.find(needle)?;
        let first = self.text[..byte].chars().count();
        let last = first + needle.chars().count() - 1;
        Some((self.spans.get(first)?.0, self.spans.get(last)?.1))
    }
}

impl<'a> RosterMatcher<'a> {
    pub fn new(roster: &'a Roster) -> Self {
        let candidates = roster
            .entries()
            .iter()
            .map(|entry| Candidate {
                entry,
                normalized: normalize_name(&entry.name),
            })
            .collect();
        Self {
            candidates,
            match_identifiers: false,
        }
    }

    pub fn with_identifiers(mut self, enabled: bool) -> Self {
        self.match_identifiers = enabled;
        self
    }

    /// Hits for one document, in roster order.
    pub fn find(&self, text: &str, source: &Path) -> Vec<Hit> {
        if text.is_empty() {
            return Vec::new();
        }
        let stripped = Stripped::new(text);
        let mut hits: Vec<Hit> = self
            .candidates
            .iter()
            .enumerate()
            .filter_map(|(index, candidate)| {
                let (start, end) = self.locate(candidate, text, &stripped)?;
                Some(Hit {
                    matched: text[start..end].to_string(),
                    name: candidate.entry.name.clone(),
                    identifier: candidate.entry.identifier.clone(),
                    source: source.to_path_buf(),
                    snippet: snippet(text, start, end),
                    roster_index: index,
                    position: start,
                })
            })
            .collect();
        hits.sort_by_key(|h| (h.roster_index, h.position));
        hits
    }

    fn locate(&self, candidate: &Candidate, text: &str, stripped: &Stripped) -> Option<(usize, usize)> {
        let name = candidate.entry.name.as_str();
        if !name.is_empty() {
            if let Some(at) = text.find(name) {
                return Some((at, at + name.len()));
            }
        }
        let normalized = candidate.normalized.as_str();
        if !normalized.is_empty() {
            if let Some(at) = text.find(normalized) {
                return Some((at, at + normalized.len()));
            }
            if let Some(range) = stripped.find(normalized) {
                return Some(range);
            }
        }
        let id = candidate.entry.identifier.as_str();
        if self.match_identifiers && !id.is_empty() {
            if let Some(at) = text.find(id) {
                return Some((at, at + id.len()));
            }
        }
        None
    }
}

fn snippet(text: &str, start: usize, end: usize) -> String {
    let before: Vec<char> = text[..start].chars().rev().take(SNIPPET_CONTEXT_CHARS).collect();
    let after = text[end..].chars().take(SNIPPET_CONTEXT_CHARS);
    let raw: String = before
        .into_iter()
        .rev()
        .chain(text[start..end].chars())
        .chain(after)
        .collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

//! Import line parser.
//!
//! # Responsibility
//! - Turn pasted multi-line text into `(identifier, optional note)` entries.
//! - Deduplicate entries while keeping first-seen order.
//!
//! # Invariants
//! - Parsing is total: malformed input degrades to best-effort entries.
//! - At most one entry per id per call.
//! - A captured note is never erased by a later bare occurrence of the same id.
//! - Notes are copied verbatim from the line (inner spacing and case kept) and
//!   never re-parsed for identifiers.

use crate::model::cluid::is_identifier;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static LINE_BREAK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n+").expect("valid line regex"));
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\s,;]+").expect("valid token regex"));

/// One parsed import line item. Transient, never persisted directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    pub id: String,
    pub note: Option<String>,
}

impl ImportEntry {
    fn bare(id: &str) -> Self {
        Self {
            id: id.to_string(),
            note: None,
        }
    }
}

/// Parses raw import text into deduplicated entries in first-seen order.
///
/// Line grammar:
/// - `<id> <note words...>` when the first token is an identifier and some
///   later token is not; the note runs from the second token to line end.
/// - otherwise every token (split on whitespace, `,` or `;`) is a bare id,
///   whether or not it passes the identifier check.
pub fn parse_import_entries(raw: &str) -> Vec<ImportEntry> {
    let mut entries = OrderedEntries::default();

    for line in LINE_BREAK_RE.split(raw) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let tokens: Vec<(usize, &str)> = TOKEN_RE
            .find_iter(trimmed)
            .map(|token| (token.start(), token.as_str()))
            .collect();

        match split_note_line(trimmed, &tokens) {
            Some((id, note)) => entries.insert(id, Some(note)),
            None => {
                for (_, token) in &tokens {
                    entries.insert(token, None);
                }
            }
        }
    }

    entries.into_vec()
}

/// Returns `(id, note)` when the line is an identifier followed by a note.
fn split_note_line<'a>(line: &'a str, tokens: &[(usize, &'a str)]) -> Option<(&'a str, &'a str)> {
    let (_, first) = tokens.first()?;
    let (note_start, _) = tokens.get(1)?;
    if !is_identifier(first) {
        return None;
    }
    if tokens[1..].iter().all(|(_, token)| is_identifier(token)) {
        return None;
    }

    let note = line[*note_start..].trim();
    if note.is_empty() {
        return None;
    }
    Some((*first, note))
}

#[derive(Default)]
struct OrderedEntries {
    items: Vec<ImportEntry>,
    index_by_id: HashMap<String, usize>,
}

impl OrderedEntries {
    fn insert(&mut self, id: &str, note: Option<&str>) {
        match self.index_by_id.get(id) {
            Some(&index) => {
                let existing = &mut self.items[index];
                if existing.note.is_none() {
                    if let Some(note) = note.filter(|value| !value.is_empty()) {
                        existing.note = Some(note.to_string());
                    }
                }
            }
            None => {
                let mut entry = ImportEntry::bare(id);
                entry.note = note.filter(|value| !value.is_empty()).map(str::to_string);
                self.index_by_id.insert(id.to_string(), self.items.len());
                self.items.push(entry);
            }
        }
    }

    fn into_vec(self) -> Vec<ImportEntry> {
        self.items
    }
}

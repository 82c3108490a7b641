//! Student roster: `{ "<key>": { "<display name>": "<identifier>", ... } }`.

use crate::error::ConfigError;
use crate::models::RosterEntry;
use serde_json::{Map, Value};
use std::path::Path;

pub const ROSTER_KEY: &str = "students";

/// Interior separators removed when building a name's normalized form.
pub const NAME_SEPARATORS: [char; 6] = ['·', '•', '・', '‧', '∙', '･'];

/// Entries in file order. Duplicates are kept as-is.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        Self { entries }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::Roster {
            path: path.to_path_buf(),
            reason,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let raw = raw.trim_start_matches('\u{feff}');
        let value: Value = serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?;
        Self::from_value(value).map_err(invalid)
    }

    /// Takes the mapping under `students`, or under the only top-level key
    /// when there is exactly one.
    pub fn from_value(value: Value) -> Result<Self, String> {
        let Value::Object(mut top) = value else {
            return Err("top level must be an object".to_string());
        };
        let mapping = match top.remove(ROSTER_KEY) {
            Some(v) => v,
            None if top.len() == 1 => top
                .into_iter()
                .next()
                .map(|(_, v)| v)
                .unwrap_or(Value::Null),
            None => return Err(format!("expected a single top-level key or \"{ROSTER_KEY}\"")),
        };
        let Value::Object(mapping) = mapping else {
            return Err("roster value must map names to identifiers".to_string());
        };
        Ok(Self::new(entries_from(mapping)))
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn entries_from(mapping: Map<String, Value>) -> Vec<RosterEntry> {
    mapping
        .into_iter()
        .filter(|(name, _)| !name.trim().is_empty())
        .map(|(name, id)| RosterEntry {
            name: name.trim().to_string(),
            identifier: match id {
                Value::String(s) => s.trim().to_string(),
                Value::Null => String::new(),
                other => other.to_string(),
            },
        })
        .collect()
}

pub fn is_separator(c: char) -> bool {
    c.is_whitespace() || NAME_SEPARATORS.contains(&c)
}

/// Separators that may sit between the characters of one name on a single
/// line. Line and page breaks are not among them.
pub fn is_inline_separator(c: char) -> bool {
    is_separator(c) && !is_line_break(c)
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// The matching-only form of a name: whitespace and middle dots removed.
pub fn normalize_name(name: &str) -> String {
    name.chars().filter(|c| !is_separator(*c)).collect()
}

use crate::classifier::DocumentKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A collected input file with its extraction family fixed at classification
/// time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub extension: String,
    pub kind: DocumentKind,
}

impl Document {
    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Where a piece of extracted text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Vector,
    Ocr,
    Markdown,
    Merged,
}

#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub document: Document,
    pub text: String,
    pub provenance: Provenance,
    /// Stages that contributed non-empty text, in merge order.
    pub sources: Vec<Provenance>,
    /// Stage failures that were tolerated.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub identifier: String,
}

/// A roster entry found in one document. At most one per (document, entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hit {
    /// The form of the name (or identifier) that was found in the text.
    pub matched: String,
    pub name: String,
    pub identifier: String,
    pub source: PathBuf,
    pub snippet: String,
    #[serde(skip)]
    pub(crate) roster_index: usize,
    #[serde(skip)]
    pub(crate) position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub content: String,
    pub file_name: String,
    pub saved_path: PathBuf,
}

impl ReportRow {
    pub fn new(hit: &Hit, saved_path: &Path) -> Self {
        Self {
            content: hit.matched.clone(),
            file_name: file_name_of(&hit.source),
            saved_path: saved_path.to_path_buf(),
        }
    }
}

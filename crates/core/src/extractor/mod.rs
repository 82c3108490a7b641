//! Text extraction: one normalized text per document, produced by the
//! strategy registered for the document's kind.

mod office;
mod pdf;

pub use office::OfficeTextConverter;
pub use pdf::{bounded_size, PdfTextMerger};

use crate::classifier::DocumentKind;
use crate::context::RunContext;
use crate::error::ExtractionError;
use crate::models::{Document, ExtractedText};
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait::async_trait]
pub trait ExtractionStrategy: Send + Sync {
    async fn extract(
        &self,
        document: &Document,
        ctx: &RunContext,
    ) -> Result<ExtractedText, ExtractionError>;
}

#[derive(Clone)]
pub struct TextExtractor {
    strategies: HashMap<DocumentKind, Arc<dyn ExtractionStrategy>>,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::empty()
            .with_strategy(DocumentKind::Office, Arc::new(OfficeTextConverter))
            .with_strategy(DocumentKind::Pdf, Arc::new(PdfTextMerger))
    }
}

impl TextExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    pub fn with_strategy(mut self, kind: DocumentKind, strategy: Arc<dyn ExtractionStrategy>) -> Self {
        self.strategies.insert(kind, strategy);
        self
    }

    pub async fn extract(
        &self,
        document: &Document,
        ctx: &RunContext,
    ) -> Result<ExtractedText, ExtractionError> {
        let strategy = self.strategies.get(&document.kind).ok_or_else(|| {
            ExtractionError::new(
                &document.path,
                format!("unsupported format: .{}", document.extension),
            )
        })?;
        if !document.path.is_file() {
            return Err(ExtractionError::new(&document.path, "file is not readable"));
        }
        let mut extracted = strategy.extract(document, ctx).await?;
        extracted.text = normalize_text(&extracted.text);
        Ok(extracted)
    }
}

/// Unifies line endings, turns page breaks into newlines, drops NULs and
/// trailing whitespace.
pub fn normalize_text(text: &str) -> String {
    let unified = text
        .replace("\r\n", "\n")
        .replace(|c: char| c == '\r' || c == '\u{0c}', "\n")
        .replace('\u{0}', "");
    unified
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

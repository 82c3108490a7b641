use super::ExtractionStrategy;
use crate::context::RunContext;
use crate::error::ExtractionError;
use crate::models::{Document, ExtractedText, Provenance};

/// Word/Excel/PowerPoint/CSV through the markdown converter, via the cache.
#[derive(Debug, Default)]
pub struct OfficeTextConverter;

#[async_trait::async_trait]
impl ExtractionStrategy for OfficeTextConverter {
    async fn extract(
        &self,
        document: &Document,
        ctx: &RunContext,
    ) -> Result<ExtractedText, ExtractionError> {
        let text = ctx
            .cache
            .get_or_convert(&document.path, ctx.toolkit.markdown.as_ref())
            .await
            .map_err(|e| {
                ExtractionError::new(&document.path, format!("markdown conversion failed: {e:#}"))
            })?;
        let sources = if text.trim().is_empty() {
            Vec::new()
        } else {
            vec![Provenance::Markdown]
        };
        Ok(ExtractedText {
            document: document.clone(),
            text,
            provenance: Provenance::Markdown,
            sources,
            warnings: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::DocumentKind;
    use crate::config::OcrSettings;
    use crate::extractor::testing::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn conversion_failure_is_an_extraction_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("sheet.xlsx");
        std::fs::write(&path, "x").unwrap();
        let toolkit = toolkit(
            Arc::new(FakeRenderer::with_pages(&[])),
            Arc::new(FakeOcr::returning("")),
            Err("markitdown not installed"),
        );
        let ocr = OcrSettings {
            enabled: false,
            skip_if_vector_text: true,
            vector_text_min_chars: 0,
            dpi: 100,
            max_side: 100,
            lang: String::new(),
        };
        let ctx = RunContext::new(toolkit, temp.path().join("cache"), ocr);
        let doc = Document {
            path: path.clone(),
            extension: "xlsx".into(),
            kind: DocumentKind::Office,
        };

        let err = OfficeTextConverter.extract(&doc, &ctx).await.unwrap_err();
        assert_eq!(err.path, path);
        assert!(err.reason.contains("markitdown not installed"));
    }
}

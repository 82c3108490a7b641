//! PDF text = per-page (vector text + OCR text) followed by a markdown
//! conversion of the whole file. Each stage may fail on its own; only a
//! document where every attempted stage failed is an error.

use super::ExtractionStrategy;
use crate::config::OcrSettings;
use crate::context::RunContext;
use crate::error::ExtractionError;
use crate::models::{Document, ExtractedText, Provenance};
use image::imageops::FilterType;
use image::DynamicImage;
use providers::{OcrEngine, PageRenderer};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
pub struct PdfTextMerger;

/// Result of one merge stage.
#[derive(Debug)]
enum Stage<T> {
    Content(T),
    Skipped,
    Failed(String),
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Content,
    Skipped,
    Failed,
}

impl<T> Stage<T> {
    fn outcome(&self) -> Outcome {
        match self {
            Stage::Content(_) => Outcome::Content,
            Stage::Skipped => Outcome::Skipped,
            Stage::Failed(_) => Outcome::Failed,
        }
    }

    fn reason(&self) -> Option<&str> {
        match self {
            Stage::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

#[async_trait::async_trait]
impl ExtractionStrategy for PdfTextMerger {
    async fn extract(
        &self,
        document: &Document,
        ctx: &RunContext,
    ) -> Result<ExtractedText, ExtractionError> {
        let path = document.path.as_path();
        let renderer = ctx.toolkit.renderer.as_ref();
        let mut warnings = Vec::new();

        let page_count = renderer.page_count(path).await;
        let vector = match &page_count {
            Ok(count) => vector_pages(renderer, path, *count, &mut warnings).await,
            Err(e) => Stage::Failed(format!("vector text: {e}")),
        };

        let vector_chars: usize = match &vector {
            Stage::Content(pages) => pages.iter().map(|p| visible_chars(p)).sum(),
            _ => 0,
        };
        let ocr = if !ctx.ocr.enabled {
            Stage::Skipped
        } else if should_skip_ocr(&ctx.ocr, vector_chars) {
            info!(
                "skipping OCR for {:?}: {} vector characters >= {}",
                path, vector_chars, ctx.ocr.vector_text_min_chars
            );
            Stage::Skipped
        } else {
            match &page_count {
                Ok(count) => {
                    ocr_pages(renderer, ctx.toolkit.ocr.as_ref(), path, *count, &ctx.ocr, &mut warnings)
                        .await
                }
                Err(_) => Stage::Failed("ocr: page count unavailable".to_string()),
            }
        };

        let markdown = match ctx
            .cache
            .get_or_convert(path, ctx.toolkit.markdown.as_ref())
            .await
        {
            Ok(text) => Stage::Content(text),
            Err(e) => Stage::Failed(format!("markdown: {e:#}")),
        };

        for reason in [vector.reason(), ocr.reason(), markdown.reason()]
            .into_iter()
            .flatten()
        {
            warn!("{:?}: {}", path, reason);
            warnings.push(reason.to_string());
        }

        let stages = [vector.outcome(), ocr.outcome(), markdown.outcome()];
        let attempted = stages.iter().filter(|o| **o != Outcome::Skipped).count();
        let failed = stages.iter().filter(|o| **o == Outcome::Failed).count();
        if failed == attempted {
            return Err(ExtractionError::new(path, warnings.join("; ")));
        }

        let (text, sources) = merge(&vector, &ocr, &markdown);
        debug!("merged {} characters from {:?} for {:?}", text.chars().count(), sources, path);
        Ok(ExtractedText {
            document: document.clone(),
            text,
            provenance: Provenance::Merged,
            sources,
            warnings,
        })
    }
}

async fn vector_pages(
    renderer: &dyn PageRenderer,
    path: &Path,
    count: usize,
    warnings: &mut Vec<String>,
) -> Stage<Vec<String>> {
    let mut pages = Vec::with_capacity(count);
    let mut failures = 0usize;
    for page in 1..=count {
        match renderer.page_text(path, page).await {
            Ok(text) => pages.push(text.trim().to_string()),
            Err(e) => {
                let reason = format!("vector text page {page}: {e}");
                warn!("{:?}: {}", path, reason);
                warnings.push(reason);
                failures += 1;
                pages.push(String::new());
            }
        }
    }
    if count > 0 && failures == count {
        Stage::Failed("vector text failed on every page".to_string())
    } else {
        Stage::Content(pages)
    }
}

async fn ocr_pages(
    renderer: &dyn PageRenderer,
    ocr: &dyn OcrEngine,
    path: &Path,
    count: usize,
    settings: &OcrSettings,
    warnings: &mut Vec<String>,
) -> Stage<Vec<String>> {
    let mut pages = Vec::with_capacity(count);
    let mut failures = 0usize;
    for page in 1..=count {
        match ocr_page(renderer, ocr, path, page, settings).await {
            Ok(text) => pages.push(text.trim().to_string()),
            Err(reason) => {
                warn!("{:?}: {}", path, reason);
                warnings.push(reason);
                failures += 1;
                pages.push(String::new());
            }
        }
    }
    if count > 0 && failures == count {
        Stage::Failed("ocr failed on every page".to_string())
    } else {
        Stage::Content(pages)
    }
}

async fn ocr_page(
    renderer: &dyn PageRenderer,
    ocr: &dyn OcrEngine,
    path: &Path,
    page: usize,
    settings: &OcrSettings,
) -> Result<String, String> {
    let image = renderer
        .render_page(path, page, settings.dpi)
        .await
        .map_err(|e| format!("render page {page}: {e}"))?;
    let image = downscale(image, settings.max_side)
        .await
        .map_err(|e| format!("downscale page {page}: {e}"))?;
    ocr.recognize(&image, &settings.lang)
        .await
        .map_err(|e| format!("ocr page {page}: {e}"))
}

async fn downscale(
    image: DynamicImage,
    max_side: u32,
) -> Result<DynamicImage, tokio::task::JoinError> {
    match bounded_size(image.width(), image.height(), max_side) {
        Some((w, h)) => {
            debug!("downscaling {}x{} to {}x{}", image.width(), image.height(), w, h);
            tokio::task::spawn_blocking(move || image.resize_exact(w, h, FilterType::Triangle)).await
        }
        None => Ok(image),
    }
}

/// Target size when the longer side exceeds `max_side`; aspect ratio is
/// kept and neither side drops below one pixel.
pub fn bounded_size(width: u32, height: u32, max_side: u32) -> Option<(u32, u32)> {
    let longer = width.max(height);
    if max_side == 0 || longer <= max_side {
        return None;
    }
    let scale = max_side as f64 / longer as f64;
    let w = ((width as f64 * scale).round() as u32).clamp(1, max_side);
    let h = ((height as f64 * scale).round() as u32).clamp(1, max_side);
    Some((w, h))
}

fn visible_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

fn should_skip_ocr(settings: &OcrSettings, vector_chars: usize) -> bool {
    settings.skip_if_vector_text && vector_chars >= settings.vector_text_min_chars
}

/// Vector text then OCR text per page, pages in order, markdown last.
fn merge(
    vector: &Stage<Vec<String>>,
    ocr: &Stage<Vec<String>>,
    markdown: &Stage<String>,
) -> (String, Vec<Provenance>) {
    let empty = Vec::new();
    let vector_pages = match vector {
        Stage::Content(p) => p,
        _ => &empty,
    };
    let ocr_pages = match ocr {
        Stage::Content(p) => p,
        _ => &empty,
    };

    let mut sources = Vec::new();
    if vector_pages.iter().any(|p| !p.is_empty()) {
        sources.push(Provenance::Vector);
    }
    if ocr_pages.iter().any(|p| !p.is_empty()) {
        sources.push(Provenance::Ocr);
    }

    let page_total = vector_pages.len().max(ocr_pages.len());
    let mut parts: Vec<&str> = Vec::new();
    for i in 0..page_total {
        for page in [vector_pages.get(i), ocr_pages.get(i)].into_iter().flatten() {
            if !page.is_empty() {
                parts.push(page);
            }
        }
    }

    if let Stage::Content(md) = markdown {
        let md = md.trim();
        if !md.is_empty() {
            sources.push(Provenance::Markdown);
            parts.push(md);
        }
    }
    (parts.join("\n"), sources)
}

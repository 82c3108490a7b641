use image::{DynamicImage, ImageBuffer, Luma};
use providers::markitdown::MarkItDownCli;
use providers::poppler::PopplerRenderer;
use providers::tesseract::TesseractOcr;
use providers::{OcrEngine, ToolStatus};
use std::path::PathBuf;

/// Availability of every external tool a scan may call.
pub async fn check_tools() -> Vec<ToolStatus> {
    let mut statuses = vec![TesseractOcr::from_env().check().await];
    statuses.extend(PopplerRenderer::from_env().check().await);
    statuses.push(MarkItDownCli::from_env().check().await);
    statuses
}

/// OCRs a small blank page to prove the engine and language data load.
pub async fn ocr_smoke_test(lang: &str) -> ToolStatus {
    let ocr = TesseractOcr::from_env();
    let page = DynamicImage::ImageLuma8(ImageBuffer::from_pixel(240, 80, Luma([255u8])));
    let (available, detail) = match ocr.recognize(&page, lang).await {
        Ok(text) => (true, format!("ok ({} chars)", text.trim().chars().count())),
        Err(e) => (false, e.to_string()),
    };
    ToolStatus {
        name: format!("tesseract -l {lang}"),
        command: PathBuf::from(&ocr.command),
        available,
        detail,
    }
}

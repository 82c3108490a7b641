use crate::process::{check_tool, run_tool};
use crate::{command_from_env, OcrEngine, ProviderError, ToolStatus};
use image::{DynamicImage, ImageFormat};
use std::ffi::OsStr;
use std::path::PathBuf;

/// OCR through the `tesseract` executable (`TESSERACT_CMD` overrides the
/// location).
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    pub command: PathBuf,
}

impl TesseractOcr {
    pub fn from_env() -> Self {
        Self {
            command: command_from_env("TESSERACT_CMD", "tesseract"),
        }
    }

    pub async fn check(&self) -> ToolStatus {
        check_tool("tesseract", &self.command, &["--version"]).await
    }
}

#[async_trait::async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image: &DynamicImage, lang: &str) -> Result<String, ProviderError> {
        let input = tempfile::Builder::new()
            .prefix("ocr-page-")
            .suffix(".png")
            .tempfile()?;
        image.save_with_format(input.path(), ImageFormat::Png)?;

        let mut args = vec![input.path().as_os_str(), OsStr::new("stdout")];
        if !lang.trim().is_empty() {
            args.push(OsStr::new("-l"));
            args.push(OsStr::new(lang.trim()));
        }
        let stdout = run_tool(&self.command, args).await?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

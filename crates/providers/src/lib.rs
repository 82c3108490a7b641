//! External collaborators for text extraction: page rendering, OCR and
//! markdown conversion.

use image::DynamicImage;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

pub mod markitdown;
#[cfg(feature = "office")]
pub mod office;
pub mod poppler;
pub mod process;
pub mod tesseract;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("not available: {0}")]
    NotAvailable(String),
    #[error("{tool} failed ({status}): {stderr}")]
    CommandFailed {
        tool: String,
        status: String,
        stderr: String,
    },
    #[error("unsupported input: {0}")]
    Unsupported(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("parse error: {0}")]
    Parse(String),
}

/// Vector text and rasterization for PDF pages. Pages are 1-based.
#[async_trait::async_trait]
pub trait PageRenderer: Send + Sync {
    async fn page_count(&self, path: &Path) -> Result<usize, ProviderError>;
    async fn page_text(&self, path: &Path, page: usize) -> Result<String, ProviderError>;
    async fn render_page(
        &self,
        path: &Path,
        page: usize,
        dpi: u32,
    ) -> Result<DynamicImage, ProviderError>;
}

#[async_trait::async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &DynamicImage, lang: &str) -> Result<String, ProviderError>;
}

#[async_trait::async_trait]
pub trait MarkdownConverter: Send + Sync {
    async fn convert(&self, path: &Path) -> Result<String, ProviderError>;
}

/// Tries `primary` first and falls back to `secondary` when it errors.
pub struct FallbackConverter {
    primary: Arc<dyn MarkdownConverter>,
    secondary: Arc<dyn MarkdownConverter>,
}

impl FallbackConverter {
    pub fn new(primary: Arc<dyn MarkdownConverter>, secondary: Arc<dyn MarkdownConverter>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait::async_trait]
impl MarkdownConverter for FallbackConverter {
    async fn convert(&self, path: &Path) -> Result<String, ProviderError> {
        match self.primary.convert(path).await {
            Ok(text) => Ok(text),
            Err(first) => {
                tracing::debug!("primary converter failed for {:?}: {}", path, first);
                self.secondary.convert(path).await.map_err(|second| {
                    ProviderError::NotAvailable(format!("{first}; fallback: {second}"))
                })
            }
        }
    }
}

/// The set of collaborators one run works with.
#[derive(Clone)]
pub struct Toolkit {
    pub renderer: Arc<dyn PageRenderer>,
    pub ocr: Arc<dyn OcrEngine>,
    pub markdown: Arc<dyn MarkdownConverter>,
}

impl Toolkit {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        ocr: Arc<dyn OcrEngine>,
        markdown: Arc<dyn MarkdownConverter>,
    ) -> Self {
        Self {
            renderer,
            ocr,
            markdown,
        }
    }

    /// Poppler + Tesseract + MarkItDown, with executables overridable from
    /// the environment.
    pub fn from_env() -> Self {
        let markitdown: Arc<dyn MarkdownConverter> = Arc::new(markitdown::MarkItDownCli::from_env());
        #[cfg(feature = "office")]
        let markdown: Arc<dyn MarkdownConverter> = Arc::new(FallbackConverter::new(
            markitdown,
            Arc::new(office::NativeOfficeReader),
        ));
        #[cfg(not(feature = "office"))]
        let markdown = markitdown;
        Self {
            renderer: Arc::new(poppler::PopplerRenderer::from_env()),
            ocr: Arc::new(tesseract::TesseractOcr::from_env()),
            markdown,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_ocr(mut self, ocr: Arc<dyn OcrEngine>) -> Self {
        self.ocr = ocr;
        self
    }

    pub fn with_markdown(mut self, markdown: Arc<dyn MarkdownConverter>) -> Self {
        self.markdown = markdown;
        self
    }
}

/// Availability of one external executable, as reported by `check_tool`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub name: String,
    pub command: PathBuf,
    pub available: bool,
    pub detail: String,
}

/// Resolves an executable from an environment override, falling back to the
/// bare program name on `PATH`.
pub fn command_from_env(var: &str, default: &str) -> PathBuf {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

//! PDF page access through poppler's command line tools, with `lopdf` for
//! page counting and as a vector text fallback.

use crate::process::{check_tool, run_tool};
use crate::{command_from_env, PageRenderer, ProviderError, ToolStatus};
use image::DynamicImage;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct PopplerRenderer {
    pub pdftotext: PathBuf,
    pub pdftoppm: PathBuf,
}

impl PopplerRenderer {
    pub fn from_env() -> Self {
        Self {
            pdftotext: command_from_env("PDFTOTEXT_CMD", "pdftotext"),
            pdftoppm: command_from_env("PDFTOPPM_CMD", "pdftoppm"),
        }
    }

    pub async fn check(&self) -> Vec<ToolStatus> {
        vec![
            check_tool("pdftotext", &self.pdftotext, &["-v"]).await,
            check_tool("pdftoppm", &self.pdftoppm, &["-v"]).await,
        ]
    }
}

#[async_trait::async_trait]
impl PageRenderer for PopplerRenderer {
    async fn page_count(&self, path: &Path) -> Result<usize, ProviderError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || lopdf_page_count(&path))
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?
    }

    async fn page_text(&self, path: &Path, page: usize) -> Result<String, ProviderError> {
        let page_arg = page.to_string();
        let args = [
            OsStr::new("-f"),
            OsStr::new(&page_arg),
            OsStr::new("-l"),
            OsStr::new(&page_arg),
            OsStr::new("-layout"),
            path.as_os_str(),
            OsStr::new("-"),
        ];
        match run_tool(&self.pdftotext, args).await {
            Ok(stdout) => Ok(String::from_utf8_lossy(&stdout).into_owned()),
            Err(err) => {
                tracing::debug!("pdftotext failed on {:?} page {}: {}", path, page, err);
                let path = path.to_path_buf();
                tokio::task::spawn_blocking(move || lopdf_page_text(&path, page))
                    .await
                    .map_err(|e| ProviderError::Parse(e.to_string()))?
            }
        }
    }

    async fn render_page(
        &self,
        path: &Path,
        page: usize,
        dpi: u32,
    ) -> Result<DynamicImage, ProviderError> {
        let dir = tempfile::tempdir()?;
        let prefix = dir.path().join("page");
        let page_arg = page.to_string();
        let dpi_arg = dpi.to_string();
        let args = [
            OsStr::new("-r"),
            OsStr::new(&dpi_arg),
            OsStr::new("-f"),
            OsStr::new(&page_arg),
            OsStr::new("-l"),
            OsStr::new(&page_arg),
            OsStr::new("-png"),
            OsStr::new("-singlefile"),
            path.as_os_str(),
            prefix.as_os_str(),
        ];
        run_tool(&self.pdftoppm, args).await?;
        let png = prefix.with_extension("png");
        Ok(image::open(&png)?)
    }
}

#[cfg(feature = "pdf")]
fn lopdf_page_count(path: &Path) -> Result<usize, ProviderError> {
    let doc = lopdf::Document::load(path).map_err(|e| ProviderError::Parse(e.to_string()))?;
    Ok(doc.get_pages().len())
}

#[cfg(feature = "pdf")]
fn lopdf_page_text(path: &Path, page: usize) -> Result<String, ProviderError> {
    let doc = lopdf::Document::load(path).map_err(|e| ProviderError::Parse(e.to_string()))?;
    doc.extract_text(&[page as u32])
        .map_err(|e| ProviderError::Parse(e.to_string()))
}

#[cfg(not(feature = "pdf"))]
fn lopdf_page_count(_path: &Path) -> Result<usize, ProviderError> {
    Err(ProviderError::NotAvailable("pdf feature disabled".into()))
}

#[cfg(not(feature = "pdf"))]
fn lopdf_page_text(_path: &Path, _page: usize) -> Result<String, ProviderError> {
    Err(ProviderError::NotAvailable("pdf feature disabled".into()))
}

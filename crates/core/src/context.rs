use crate::cache::MarkdownCache;
use crate::config::{AppConfig, OcrSettings};
use providers::Toolkit;
use std::path::PathBuf;

/// Everything an extraction needs besides the document itself. Owns the
/// markdown cache, so dropping the context clears the cache directory on
/// every exit path.
pub struct RunContext {
    pub toolkit: Toolkit,
    pub cache: MarkdownCache,
    pub ocr: OcrSettings,
}

impl RunContext {
    pub fn new(toolkit: Toolkit, cache_dir: impl Into<PathBuf>, ocr: OcrSettings) -> Self {
        Self {
            toolkit,
            cache: MarkdownCache::new(cache_dir),
            ocr,
        }
    }

    pub fn from_config(cfg: &AppConfig, toolkit: Toolkit) -> Self {
        Self::new(toolkit, cfg.markdown_cache_dir.clone(), cfg.ocr())
    }
}

//! Markdown conversion cache. Entries are keyed by source path, size and
//! mtime. Dropping the cache deletes its entries, then the directory if
//! nothing else is left in it.

use providers::MarkdownConverter;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const DIGEST_LEN: usize = 16;

#[derive(Debug)]
pub struct MarkdownCache {
    dir: PathBuf,
}

impl MarkdownCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<stem>.<16 hex digits>.md` for the given source file.
    pub fn entry_path(&self, source: &Path) -> std::io::Result<PathBuf> {
        let meta = fs::metadata(source)?;
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let abs = source
            .canonicalize()
            .unwrap_or_else(|_| source.to_path_buf());
        let key = format!("{}|{}|{}", abs.to_string_lossy(), meta.len(), mtime);
        let digest = blake3::hash(key.as_bytes()).to_hex();
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        Ok(self.dir.join(format!("{}.{}.md", stem, &digest.as_str()[..DIGEST_LEN])))
    }

    /// Returns cached markdown for `source`, converting and storing it on a
    /// miss.
    pub async fn get_or_convert(
        &self,
        source: &Path,
        converter: &dyn MarkdownConverter,
    ) -> anyhow::Result<String> {
        let entry = self.entry_path(source)?;
        if let Ok(text) = tokio::fs::read_to_string(&entry).await {
            debug!("markdown cache hit: {:?}", entry);
            return Ok(text);
        }

        info!("converting to markdown: {:?}", source);
        let text = converter.convert(source).await?;
        if let Err(e) = self.store(&entry, &text).await {
            warn!("markdown cache write failed {:?}: {}", entry, e);
            return Ok(text);
        }
        match tokio::fs::read_to_string(&entry).await {
            Ok(cached) => Ok(cached),
            Err(_) => Ok(text),
        }
    }

    async fn store(&self, entry: &Path, text: &str) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(entry, text).await
    }

    /// Removes the entries this cache writes. Anything else in the directory
    /// is left alone, and so is the directory itself in that case.
    pub fn clear(&self) {
        let Ok(listing) = fs::read_dir(&self.dir) else {
            return;
        };
        let mut left = 0;
        for path in listing.flatten().map(|e| e.path()) {
            if !is_cache_entry(&path) {
                left += 1;
                continue;
            }
            if let Err(e) = fs::remove_file(&path) {
                warn!("markdown cache cleanup issue {:?}: {}", path, e);
                left += 1;
            }
        }
        if left > 0 {
            warn!("markdown cache {:?} kept: {} other entries", self.dir, left);
            return;
        }
        match fs::remove_dir(&self.dir) {
            Ok(()) => info!("markdown cache cleared: {:?}", self.dir),
            Err(e) => warn!("markdown cache cleanup issue {:?}: {}", self.dir, e),
        }
    }
}

/// Matches `<stem>.<16 hex digits>.md` regular files.
fn is_cache_entry(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let digest = name
        .strip_suffix(".md")
        .and_then(|rest| rest.rsplit_once('.'))
        .map(|(_, digest)| digest);
    matches!(digest, Some(d) if d.len() == DIGEST_LEN && d.bytes().all(|b| b.is_ascii_hexdigit()))
        && path.is_file()
}

impl Drop for MarkdownCache {
    fn drop(&mut self) {
        self.clear();
    }
}

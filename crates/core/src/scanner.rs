//! Walks the configured input roots and collects supported documents.

use crate::classifier;
use crate::models::Document;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Returns supported documents under `roots`, absolute, deduplicated and
/// sorted by path. Missing roots are logged and skipped.
pub fn collect_documents(roots: &[PathBuf], excludes: &[String]) -> anyhow::Result<Vec<Document>> {
    let exclude_set = build_globset(excludes)?;
    let mut found = BTreeSet::new();

    for root in roots {
        if !root.exists() {
            warn!("input path does not exist: {:?}", root);
            continue;
        }
        if root.is_file() {
            if let Some(path) = accept(root, &exclude_set) {
                found.insert(path);
            }
            continue;
        }
        for entry in WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || should_descend(e.path(), &exclude_set))
        {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    debug!("skipping unreadable entry: {}", err);
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }
            if let Some(path) = accept(entry.path(), &exclude_set) {
                found.insert(path);
            }
        }
    }

    Ok(found
        .into_iter()
        .filter_map(|path| {
            let kind = classifier::classify(&path)?;
            let extension = path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            Some(Document {
                path,
                extension,
                kind,
            })
        })
        .collect())
}

fn accept(path: &Path, excludes: &GlobSet) -> Option<PathBuf> {
    if is_excluded(path, excludes) || is_hidden(path) || is_lock_file(path) {
        return None;
    }
    classifier::classify(path)?;
    Some(path.canonicalize().unwrap_or_else(|_| path.to_path_buf()))
}

fn build_globset(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat)?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

fn should_descend(path: &Path, excludes: &GlobSet) -> bool {
    !is_excluded(path, excludes) && !is_hidden(path)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

// Office writes `~$name.docx` owner files next to open documents.
fn is_lock_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.starts_with("~$"))
        .unwrap_or(false)
}

fn is_excluded(path: &Path, excludes: &GlobSet) -> bool {
    excludes.is_match(path)
}

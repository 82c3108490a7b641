//! Copies hit documents into the run's output directory without ever
//! overwriting: `name.ext`, then `name_2.ext`, `name_3.ext`, ...

use crate::error::CopyError;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct HitFileCopier {
    dest_dir: PathBuf,
    claimed: HashSet<PathBuf>,
}

impl HitFileCopier {
    pub fn new(dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            dest_dir: dest_dir.into(),
            claimed: HashSet::new(),
        }
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    /// Picks the destination for `source` and reserves it for this run, so a
    /// failed copy never hands its name to a later file.
    pub fn reserve(&mut self, source: &Path) -> PathBuf {
        let dest = resolve_conflict(&self.dest_dir, source, |p| {
            self.claimed.contains(p) || p.exists()
        });
        self.claimed.insert(dest.clone());
        dest
    }

    /// Copies `source` into the output directory. On failure the error
    /// carries the reserved destination.
    pub fn copy(&mut self, source: &Path) -> Result<PathBuf, CopyError> {
        let dest = self.reserve(source);
        match fs::copy(source, &dest) {
            Ok(bytes) => {
                debug!("copied {:?} -> {:?} ({} bytes)", source, dest, bytes);
                Ok(dest)
            }
            Err(source_err) => {
                let err = CopyError {
                    from: source.to_path_buf(),
                    to: dest,
                    source: source_err,
                };
                warn!("{}", err);
                Err(err)
            }
        }
    }
}

fn resolve_conflict(dir: &Path, source: &Path, taken: impl Fn(&Path) -> bool) -> PathBuf {
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let first = dir.join(&file_name);
    if !taken(&first) {
        return first;
    }

    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let ext = source
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut counter = 2;
    loop {
        let name = if ext.is_empty() {
            format!("{}_{}", stem, counter)
        } else {
            format!("{}_{}.{}", stem, counter, ext)
        };
        let candidate = dir.join(name);
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_named_sources_get_numbered_suffixes() {
        let temp = tempfile::tempdir().unwrap();
        let out = temp.path().join("out");
        fs::create_dir_all(&out).unwrap();
        let mut copier = HitFileCopier::new(&out);

        let mut copied = Vec::new();
        for (i, dir) in ["a", "b", "c"].iter().enumerate() {
            let src_dir = temp.path().join(dir);
            fs::create_dir_all(&src_dir).unwrap();
            let src = src_dir.join("report.docx");
            fs::write(&src, format!("{i}")).unwrap();
            copied.push(copier.copy(&src).unwrap());
        }

        let names: Vec<String> = copied
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["report.docx", "report_2.docx", "report_3.docx"]);
        assert_eq!(fs::read_to_string(out.join("report_3.docx")).unwrap(), "2");
    }

    #[test]
    fn existing_files_are_never_overwritten() {
        let temp = tempfile::tempdir().unwrap();
        let out = temp.path().join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("notes"), "keep").unwrap();
        let src = temp.path().join("notes");
        fs::write(&src, "new").unwrap();

        let dest = HitFileCopier::new(&out).copy(&src).unwrap();
        assert_eq!(dest, out.join("notes_2"));
        assert_eq!(fs::read_to_string(out.join("notes")).unwrap(), "keep");
    }

    #[test]
    fn failed_copy_keeps_its_reservation() {
        let temp = tempfile::tempdir().unwrap();
        let out = temp.path().join("out");
        fs::create_dir_all(&out).unwrap();
        let mut copier = HitFileCopier::new(&out);

        let err = copier.copy(&temp.path().join("missing.pdf")).unwrap_err();
        assert_eq!(err.to, out.join("missing.pdf"));
        assert!(!err.to.exists());

        fs::create_dir_all(temp.path().join("x")).unwrap();
        let real = temp.path().join("x/missing.pdf");
        fs::write(&real, "pdf").unwrap();
        assert_eq!(copier.copy(&real).unwrap(), out.join("missing_2.pdf"));
    }
}

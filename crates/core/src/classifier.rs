use std::path::Path;

/// Extraction family of a document, decided by its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Office,
    Pdf,
}

pub const OFFICE_EXTENSIONS: &[&str] = &["doc", "docx", "xls", "xlsx", "ppt", "pptx", "csv"];
pub const PDF_EXTENSIONS: &[&str] = &["pdf"];

pub fn classify_extension(ext: &str) -> Option<DocumentKind> {
    let ext = ext.trim_start_matches('.').to_lowercase();
    if PDF_EXTENSIONS.contains(&ext.as_str()) {
        Some(DocumentKind::Pdf)
    } else if OFFICE_EXTENSIONS.contains(&ext.as_str()) {
        Some(DocumentKind::Office)
    } else {
        None
    }
}

pub fn classify(path: &Path) -> Option<DocumentKind> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(classify_extension)
}

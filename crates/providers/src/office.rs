//! In-process Office reader used when the markdown converter executable is
//! missing or fails.

use crate::{MarkdownConverter, ProviderError};
use calamine::{open_workbook_auto, Reader};
use quick_xml::events::Event;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Default)]
pub struct NativeOfficeReader;

#[async_trait::async_trait]
impl MarkdownConverter for NativeOfficeReader {
    async fn convert(&self, path: &Path) -> Result<String, ProviderError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || read_office(&path))
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?
    }
}

fn read_office(path: &Path) -> Result<String, ProviderError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "docx" => read_docx(path),
        "pptx" => read_pptx(path),
        "xlsx" | "xls" => read_spreadsheet(path),
        "csv" => read_csv(path),
        other => Err(ProviderError::Unsupported(format!(
            "no native reader for .{other}"
        ))),
    }
}

fn read_docx(path: &Path) -> Result<String, ProviderError> {
    let mut archive = open_zip(path)?;
    let xml = zip_entry(&mut archive, "word/document.xml")?;
    xml_text(&xml, b"w:t", &[&b"w:p"[..], &b"w:tc"[..]])
}

fn read_pptx(path: &Path) -> Result<String, ProviderError> {
    let mut archive = open_zip(path)?;
    let mut slides: Vec<(usize, String)> = archive
        .file_names()
        .filter_map(|name| {
            let n = name
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse()
                .ok()?;
            Some((n, name.to_string()))
        })
        .collect();
    slides.sort();

    let mut out = Vec::new();
    for (n, name) in slides {
        let xml = zip_entry(&mut archive, &name)?;
        out.push(format!("<!-- Slide number: {n} -->\n{}", xml_text(&xml, b"a:t", &[&b"a:p"[..]])?));
    }
    Ok(out.join("\n\n"))
}

fn read_spreadsheet(path: &Path) -> Result<String, ProviderError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| ProviderError::Parse(e.to_string()))?;
    let mut sections = Vec::new();
    for sheet in workbook.sheet_names().to_owned() {
        let range = match workbook.worksheet_range(&sheet) {
            Some(Ok(range)) => range,
            Some(Err(e)) => return Err(ProviderError::Parse(e.to_string())),
            None => continue,
        };
        let mut lines = vec![format!("## {sheet}")];
        for row in range.rows() {
            let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
            lines.push(format!("| {} |", cells.join(" | ")));
        }
        sections.push(lines.join("\n"));
    }
    Ok(sections.join("\n\n"))
}

fn read_csv(path: &Path) -> Result<String, ProviderError> {
    let bytes = std::fs::read(path)?;
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes);
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

fn open_zip(path: &Path) -> Result<zip::ZipArchive<std::fs::File>, ProviderError> {
    let file = std::fs::File::open(path)?;
    zip::ZipArchive::new(file).map_err(|e| ProviderError::Parse(e.to_string()))
}

fn zip_entry(archive: &mut zip::ZipArchive<std::fs::File>, name: &str) -> Result<String, ProviderError> {
    let mut entry = archive
        .by_name(name)
        .map_err(|e| ProviderError::Parse(format!("{name}: {e}")))?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(xml)
}

/// Collects the text of every `text_tag` element, starting a new line at the
/// end of each `block_tags` element.
fn xml_text(xml: &str, text_tag: &[u8], block_tags: &[&[u8]]) -> Result<String, ProviderError> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == text_tag => in_text = true,
            Ok(Event::End(e)) => {
                let name = e.name();
                if name.as_ref() == text_tag {
                    in_text = false;
                } else if block_tags.iter().any(|t| *t == name.as_ref()) && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| ProviderError::Parse(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ProviderError::Parse(e.to_string())),
            _ => {}
        }
    }
    Ok(out.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn paragraphs_and_cells_become_lines() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>学生：</w:t></w:r><w:r><w:t>王五</w:t></w:r></w:p>
            <w:tbl><w:tr><w:tc><w:p><w:r><w:t>张 三</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
        </w:body></w:document>"#;
        let text = xml_text(xml, b"w:t", &[&b"w:p"[..], &b"w:tc"[..]]).unwrap();
        assert_eq!(text, "学生：王五\n张 三");
    }

    #[tokio::test]
    async fn docx_read_from_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.docx");
        let file = std::fs::File::create(&path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("word/document.xml", zip::write::FileOptions::default())
            .unwrap();
        zip.write_all(
            "<w:document><w:body><w:p><w:r><w:t>李&amp;四</w:t></w:r></w:p></w:body></w:document>"
                .as_bytes(),
        )
        .unwrap();
        zip.finish().unwrap();

        let text = NativeOfficeReader.convert(&path).await.unwrap();
        assert_eq!(text, "李&四");
    }

    #[tokio::test]
    async fn csv_strips_bom_and_unknown_extension_fails() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("list.csv");
        std::fs::write(&csv, b"\xEF\xBB\xBFname,id\n\xE7\x8E\x8B\xE4\xBA\x94,123\n").unwrap();
        let text = NativeOfficeReader.convert(&csv).await.unwrap();
        assert_eq!(text, "name,id\n王五,123\n");

        let other = dir.path().join("slides.key");
        std::fs::write(&other, b"x").unwrap();
        let err = NativeOfficeReader.convert(&other).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unsupported(_)));
    }
}

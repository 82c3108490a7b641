//! Three-column xlsx report: matched content, file name, saved path.

use crate::error::ExportError;
use crate::models::ReportRow;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::path::{Path, PathBuf};
use tracing::info;

pub const SHEET_NAME: &str = "命中明细";
pub const HEADERS: [&str; 3] = ["命中的内容", "文件名", "保存路径"];

pub struct ReportExporter {
    path: PathBuf,
}

impl ReportExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes one row per entry of `rows`, in order, under a header row.
    pub fn export(&self, rows: &[ReportRow]) -> Result<(), ExportError> {
        self.check_directory()?;
        self.write(rows).map_err(|source| ExportError::Write {
            path: self.path.clone(),
            source,
        })?;
        info!("report written: {:?} ({} rows)", self.path, rows.len());
        Ok(())
    }

    fn check_directory(&self) -> Result<(), ExportError> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let meta = std::fs::metadata(parent)
            .map_err(|_| ExportError::MissingDirectory(parent.to_path_buf()))?;
        if !meta.is_dir() {
            return Err(ExportError::MissingDirectory(parent.to_path_buf()));
        }
        if meta.permissions().readonly() {
            return Err(ExportError::ReadOnly(parent.to_path_buf()));
        }
        Ok(())
    }

    fn write(&self, rows: &[ReportRow]) -> Result<(), XlsxError> {
        let mut workbook = Workbook::new();
        let header = Format::new().set_bold();
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        for (col, title) in HEADERS.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *title, &header)?;
        }
        for (i, row) in rows.iter().enumerate() {
            let r = (i + 1) as u32;
            sheet.write_string(r, 0, &row.content)?;
            sheet.write_string(r, 1, &row.file_name)?;
            sheet.write_string(r, 2, row.saved_path.to_string_lossy().as_ref())?;
        }
        sheet.set_column_width(0, 16)?;
        sheet.set_column_width(1, 36)?;
        sheet.set_column_width(2, 72)?;

        workbook.save(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook, Reader, Xlsx};

    fn row(content: &str, name: &str, saved: &Path) -> ReportRow {
        ReportRow {
            content: content.to_string(),
            file_name: name.to_string(),
            saved_path: saved.to_path_buf(),
        }
    }

    #[test]
    fn writes_header_and_rows_in_order() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("hits.xlsx");
        let rows = vec![
            row("王五", "a.pdf", &temp.path().join("a.pdf")),
            row("李·四", "b.docx", &temp.path().join("b.docx")),
        ];
        ReportExporter::new(&path).export(&rows).unwrap();

        let mut book: Xlsx<_> = open_workbook(&path).unwrap();
        let range = book.worksheet_range(SHEET_NAME).unwrap().unwrap();
        let cells: Vec<Vec<String>> = range
            .rows()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        assert_eq!(cells[0], HEADERS.map(String::from).to_vec());
        assert_eq!(cells[1][0], "王五");
        assert_eq!(cells[2][1], "b.docx");
        assert_eq!(cells[2][2], temp.path().join("b.docx").to_string_lossy());
        assert_eq!(cells.len(), 3);
    }

    #[test]
    fn empty_report_still_has_headers() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("hits.xlsx");
        ReportExporter::new(&path).export(&[]).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn missing_directory_is_an_export_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("nope/hits.xlsx");
        let err = ReportExporter::new(&path).export(&[]).unwrap_err();
        assert!(matches!(err, ExportError::MissingDirectory(_)));
    }
}

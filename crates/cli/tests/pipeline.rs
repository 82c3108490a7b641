use async_trait::async_trait;
use calamine::{open_workbook, Reader, Xlsx};
use image::DynamicImage;
use providers::{MarkdownConverter, OcrEngine, PageRenderer, ProviderError, Toolkit};
use scan_core::config::AppConfig;
use scan_core::report::SHEET_NAME;
use scan_core::{Pipeline, RunError};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

/// Treats each "pdf" as a single page whose vector text is the file body.
struct FileBodyRenderer;

#[async_trait]
impl PageRenderer for FileBodyRenderer {
    async fn page_count(&self, _path: &Path) -> Result<usize, ProviderError> {
        Ok(1)
    }

    async fn page_text(&self, path: &Path, _page: usize) -> Result<String, ProviderError> {
        Ok(fs::read_to_string(path)?)
    }

    async fn render_page(
        &self,
        _path: &Path,
        _page: usize,
        _dpi: u32,
    ) -> Result<DynamicImage, ProviderError> {
        Ok(DynamicImage::new_rgb8(8, 8))
    }
}

#[derive(Default)]
struct CountingOcr {
    calls: AtomicUsize,
}

#[async_trait]
impl OcrEngine for CountingOcr {
    async fn recognize(&self, _image: &DynamicImage, _lang: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(String::new())
    }
}

/// Office files convert to their body; PDFs convert to nothing.
struct FileBodyMarkdown;

#[async_trait]
impl MarkdownConverter for FileBodyMarkdown {
    async fn convert(&self, path: &Path) -> Result<String, ProviderError> {
        if path.extension().is_some_and(|e| e == "pdf") {
            return Ok(String::new());
        }
        Ok(fs::read_to_string(path)?)
    }
}

/// `FileBodyMarkdown` that runs `hook` on each source once it is converted.
struct HookedMarkdown {
    hook: Box<dyn Fn(&Path) + Send + Sync>,
}

impl HookedMarkdown {
    fn new(hook: impl Fn(&Path) + Send + Sync + 'static) -> Self {
        Self {
            hook: Box::new(hook),
        }
    }
}

#[async_trait]
impl MarkdownConverter for HookedMarkdown {
    async fn convert(&self, path: &Path) -> Result<String, ProviderError> {
        let text = FileBodyMarkdown.convert(path).await?;
        (self.hook)(path);
        Ok(text)
    }
}

struct Fixture {
    _temp: tempfile::TempDir,
    root: PathBuf,
    src: PathBuf,
}

impl Fixture {
    fn new(roster: &str) -> Self {
        let temp = tempdir().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let src = root.join("inbox");
        fs::create_dir_all(&src).unwrap();
        fs::write(root.join("students.json"), roster).unwrap();
        Self {
            _temp: temp,
            root,
            src,
        }
    }

    fn write(&self, rel: &str, body: &str) -> PathBuf {
        let path = self.src.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, body).unwrap();
        path
    }

    fn config(&self) -> AppConfig {
        AppConfig {
            input_paths: vec![self.src.clone()],
            exclude: vec![],
            output_root_dir: self.root.join("Output"),
            output_folder_format: "run_%Y%m%d".to_string(),
            report_filename: "hits.xlsx".to_string(),
            student_roster_path: self.root.join("students.json"),
            markdown_cache_dir: self.root.join(".md_cache"),
            ocr_skip_if_vector_text: false,
            ocr_vector_text_min_chars: 0,
            ocr_dpi: 72,
            ocr_max_side: 100,
            ocr_lang: "chi_sim+eng".to_string(),
            ocr_enabled: true,
            match_identifiers: false,
            workers: 1,
            timeout_sec: None,
            log_level: "info".to_string(),
            log_file: self.root.join("log.txt"),
        }
    }
}

fn toolkit(ocr: Arc<CountingOcr>) -> Toolkit {
    Toolkit::new(Arc::new(FileBodyRenderer), ocr, Arc::new(FileBodyMarkdown))
}

fn hooked_toolkit(markdown: HookedMarkdown) -> Toolkit {
    Toolkit::new(
        Arc::new(FileBodyRenderer),
        Arc::new(CountingOcr::default()),
        Arc::new(markdown),
    )
}

fn read_rows(report: &Path) -> Vec<Vec<String>> {
    let mut book: Xlsx<_> = open_workbook(report).unwrap();
    let range = book.worksheet_range(SHEET_NAME).unwrap().unwrap();
    range
        .rows()
        .skip(1)
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect()
}

#[tokio::test]
async fn single_pdf_hit_end_to_end() {
    let fx = Fixture::new(r#"{"students": {"王五": "123"}}"#);
    fx.write("scan.pdf", "学生：王五");
    let ocr = Arc::new(CountingOcr::default());

    let summary = Pipeline::new(fx.config(), toolkit(ocr.clone()))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.scanned, 1);
    assert_eq!(summary.matched_files, 1);
    assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
    let copied = summary.output_dir.join("scan.pdf");
    assert!(copied.is_file());
    assert_eq!(
        read_rows(&summary.report_path),
        vec![vec![
            "王五".to_string(),
            "scan.pdf".to_string(),
            copied.to_string_lossy().into_owned()
        ]]
    );
    assert!(!fx.root.join(".md_cache").exists());
}

#[tokio::test]
async fn same_named_hits_are_copied_with_suffixes() {
    let fx = Fixture::new(r#"{"students": {"张 三": "001", "李·四": "002"}}"#);
    fx.write("a/report.docx", "张三 and 李四");
    fx.write("b/report.docx", "张 三");
    fx.write("c/report.docx", "李·四");

    let summary = Pipeline::new(fx.config(), toolkit(Arc::default()))
        .run()
        .await
        .unwrap();

    let out = &summary.output_dir;
    let rows = read_rows(&summary.report_path);
    let saved: Vec<&str> = rows.iter().map(|r| r[2].as_str()).collect();
    let expected = [
        out.join("report.docx"),
        out.join("report.docx"),
        out.join("report_2.docx"),
        out.join("report_3.docx"),
    ];
    assert_eq!(
        saved,
        expected.iter().map(|p| p.to_str().unwrap()).collect::<Vec<_>>()
    );
    assert_eq!(rows[0][0], "张三");
    assert_eq!(rows[1][0], "李四");
    for path in &expected {
        assert!(path.is_file());
    }
}

#[tokio::test]
async fn documents_without_hits_are_not_copied() {
    let fx = Fixture::new(r#"{"students": {"王五": "123"}}"#);
    fx.write("notes.csv", "nobody here");
    fx.write("skip.txt", "王五");

    let summary = Pipeline::new(fx.config(), toolkit(Arc::default()))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.scanned, 1);
    assert_eq!(summary.rows, 0);
    assert!(read_rows(&summary.report_path).is_empty());
    let entries: Vec<_> = fs::read_dir(&summary.output_dir).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn two_runs_use_separate_consistent_folders() {
    let fx = Fixture::new(r#"{"students": {"王五": "123"}}"#);
    fx.write("scan.pdf", "王五");

    let first = Pipeline::new(fx.config(), toolkit(Arc::default()))
        .run()
        .await
        .unwrap();
    let second = Pipeline::new(fx.config(), toolkit(Arc::default()))
        .run()
        .await
        .unwrap();

    assert_ne!(first.output_dir, second.output_dir);
    for summary in [&first, &second] {
        let rows = read_rows(&summary.report_path);
        assert_eq!(rows.len(), 1);
        let saved = PathBuf::from(&rows[0][2]);
        assert!(saved.starts_with(&summary.output_dir));
        assert!(saved.is_file());
    }
}

#[tokio::test]
async fn worker_pool_keeps_collection_order() {
    let fx = Fixture::new(r#"{"students": {"王五": "1", "赵六": "2"}}"#);
    for i in 0..6 {
        fx.write(&format!("doc{i}.pdf"), if i % 2 == 0 { "王五" } else { "赵六" });
    }
    let mut cfg = fx.config();
    cfg.workers = 3;
    cfg.timeout_sec = Some(30.0);

    let summary = Pipeline::new(cfg, toolkit(Arc::default()))
        .run()
        .await
        .unwrap();

    let names: Vec<String> = read_rows(&summary.report_path)
        .into_iter()
        .map(|r| r[1].clone())
        .collect();
    let expected: Vec<String> = (0..6).map(|i| format!("doc{i}.pdf")).collect();
    assert_eq!(names, expected);
}

#[tokio::test]
async fn unreadable_roster_is_a_config_error() {
    let fx = Fixture::new("not json");
    fx.write("scan.pdf", "王五");

    let err = Pipeline::new(fx.config(), toolkit(Arc::default()))
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Config(_)));
    assert_eq!(err.exit_code(), 1);
    assert!(!fx.root.join("Output").exists());
}

#[tokio::test]
async fn failed_copy_keeps_its_row_and_later_files_are_copied() {
    let fx = Fixture::new(r#"{"students": {"王五": "123"}}"#);
    let gone = fx.write("a_gone.docx", "王五");
    fx.write("b_kept.docx", "王五");
    let target = gone.clone();
    let markdown = HookedMarkdown::new(move |path| {
        if path == target {
            fs::remove_file(path).unwrap();
        }
    });

    let summary = Pipeline::new(fx.config(), hooked_toolkit(markdown))
        .run()
        .await
        .unwrap();

    let out = &summary.output_dir;
    assert_eq!(summary.copy_failures, vec![gone]);
    assert_eq!(summary.matched_files, 2);
    assert_eq!(
        read_rows(&summary.report_path),
        vec![
            vec![
                "王五".to_string(),
                "a_gone.docx".to_string(),
                out.join("a_gone.docx").to_string_lossy().into_owned()
            ],
            vec![
                "王五".to_string(),
                "b_kept.docx".to_string(),
                out.join("b_kept.docx").to_string_lossy().into_owned()
            ],
        ]
    );
    assert!(!out.join("a_gone.docx").exists());
    assert!(out.join("b_kept.docx").is_file());
}

#[tokio::test]
async fn report_write_failure_exits_with_export_code_and_clears_cache() {
    let fx = Fixture::new(r#"{"students": {"王五": "123"}}"#);
    fx.write("a.docx", "王五");
    let last = fx.write("b.docx", "王五");
    let output_root = fx.root.join("Output");
    let cache_dir = fx.root.join(".md_cache");
    let cache_was_used = Arc::new(AtomicBool::new(false));
    let seen = cache_was_used.clone();
    let markdown = HookedMarkdown::new(move |path| {
        if path != last {
            return;
        }
        seen.store(cache_dir.is_dir(), Ordering::SeqCst);
        // Occupy the report path so the workbook cannot be saved.
        for run_dir in fs::read_dir(&output_root).unwrap() {
            fs::create_dir(run_dir.unwrap().path().join("hits.xlsx")).unwrap();
        }
    });

    let err = Pipeline::new(fx.config(), hooked_toolkit(markdown))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Export(_)));
    assert_eq!(err.exit_code(), 3);
    assert!(cache_was_used.load(Ordering::SeqCst));
    assert!(!fx.root.join(".md_cache").exists());
}

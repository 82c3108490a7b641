use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const REPORT_EXTENSION: &str = ".xlsx";

/// Upper bound for concurrent extractions.
pub const MAX_WORKERS: usize = 64;

/// Brings a worker count from the environment or the command line into
/// `1..=MAX_WORKERS`.
pub fn clamp_workers(workers: usize) -> usize {
    workers.clamp(1, MAX_WORKERS)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub input_paths: Vec<PathBuf>,
    #[serde(default)]
    pub exclude: Vec<String>,
    pub output_root_dir: PathBuf,
    pub output_folder_format: String,
    pub report_filename: String,
    pub student_roster_path: PathBuf,
    pub markdown_cache_dir: PathBuf,
    #[serde(default = "default_true")]
    pub ocr_skip_if_vector_text: bool,
    #[serde(default = "default_min_chars")]
    pub ocr_vector_text_min_chars: usize,
    #[serde(default = "default_dpi")]
    pub ocr_dpi: u32,
    #[serde(default = "default_max_side")]
    pub ocr_max_side: u32,
    #[serde(default = "default_lang")]
    pub ocr_lang: String,
    #[serde(default = "default_true")]
    pub ocr_enabled: bool,
    #[serde(default)]
    pub match_identifiers: bool,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub timeout_sec: Option<f64>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_min_chars() -> usize {
    200
}

fn default_dpi() -> u32 {
    200
}

fn default_max_side() -> u32 {
    3500
}

fn default_lang() -> String {
    "chi_sim+eng".to_string()
}

fn default_workers() -> usize {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("log.txt")
}

/// OCR knobs consumed by the PDF merger.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrSettings {
    pub enabled: bool,
    pub skip_if_vector_text: bool,
    pub vector_text_min_chars: usize,
    pub dpi: u32,
    pub max_side: u32,
    pub lang: String,
}

impl AppConfig {
    pub fn ocr(&self) -> OcrSettings {
        OcrSettings {
            enabled: self.ocr_enabled,
            skip_if_vector_text: self.ocr_skip_if_vector_text,
            vector_text_min_chars: self.ocr_vector_text_min_chars,
            dpi: self.ocr_dpi,
            max_side: self.ocr_max_side,
            lang: self.ocr_lang.clone(),
        }
    }

    /// Makes every relative path absolute against `base` (the directory the
    /// config file lives in).
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        let join = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base.join(p)
            }
        };
        self.input_paths = self.input_paths.iter().map(|p| join(p)).collect();
        self.output_root_dir = join(&self.output_root_dir);
        self.student_roster_path = join(&self.student_roster_path);
        self.markdown_cache_dir = join(&self.markdown_cache_dir);
        self.log_file = join(&self.log_file);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_paths.is_empty() {
            return Err(ConfigError::invalid("input_paths", "must be a non-empty list"));
        }
        if self.output_root_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid("output_root_dir", "must not be empty"));
        }
        if self.output_folder_format.trim().is_empty() {
            return Err(ConfigError::invalid("output_folder_format", "must not be empty"));
        }
        if !self.report_filename.ends_with(REPORT_EXTENSION)
            || self.report_filename.len() == REPORT_EXTENSION.len()
        {
            return Err(ConfigError::invalid(
                "report_filename",
                format!("must be a file name ending in {REPORT_EXTENSION}"),
            ));
        }
        if self.report_filename.contains(|c: char| c == '/' || c == '\\') {
            return Err(ConfigError::invalid("report_filename", "must not contain a directory"));
        }
        if self.markdown_cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid("markdown_cache_dir", "must not be empty"));
        }
        self.check_cache_dir()?;
        if self.ocr_dpi == 0 {
            return Err(ConfigError::invalid("ocr_dpi", "must be positive"));
        }
        if self.ocr_max_side == 0 {
            return Err(ConfigError::invalid("ocr_max_side", "must be positive"));
        }
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(ConfigError::invalid(
                "workers",
                format!("must be between 1 and {MAX_WORKERS}"),
            ));
        }
        if matches!(self.timeout_sec, Some(t) if t.is_nan() || t <= 0.0) {
            return Err(ConfigError::invalid("timeout_sec", "must be positive when set"));
        }
        if !self.input_paths.iter().any(|p| p.exists()) {
            return Err(ConfigError::NoInputs);
        }
        Ok(())
    }

    /// The cache directory is deleted after each run, so it must not be or
    /// enclose anything else the run reads or writes.
    fn check_cache_dir(&self) -> Result<(), ConfigError> {
        let cache = self.markdown_cache_dir.as_path();
        let guarded = self
            .input_paths
            .iter()
            .map(|p| ("input_paths", p.as_path()))
            .chain([
                ("output_root_dir", self.output_root_dir.as_path()),
                ("student_roster_path", self.student_roster_path.as_path()),
                ("log_file", self.log_file.as_path()),
            ]);
        for (key, path) in guarded {
            if path.starts_with(cache) {
                return Err(ConfigError::invalid(
                    "markdown_cache_dir",
                    format!("must not contain {key} ({})", path.display()),
                ));
            }
        }
        Ok(())
    }
}

/// Loads `path` (YAML), resolves relative paths against its directory,
/// applies the `PDF_WORKERS` override and validates the result.
pub fn load(path: &Path) -> Result<AppConfig, ConfigError> {
    let path = path
        .canonicalize()
        .map_err(|_| ConfigError::NotFound(path.to_path_buf()))?;
    let base = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();

    let settings = config::Config::builder()
        .add_source(config::File::from(path.clone()))
        .build()?;
    let mut cfg: AppConfig = settings.try_deserialize()?;
    if let Some(workers) = std::env::var("PDF_WORKERS")
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
    {
        cfg.workers = clamp_workers(workers);
    }
    let cfg = cfg.resolve_paths(&base);
    cfg.validate()?;
    Ok(cfg)
}

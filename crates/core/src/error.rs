use std::path::PathBuf;
use thiserror::Error;

/// Missing or invalid settings. Fatal: the run stops before any document is
/// touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(#[from] config::ConfigError),
    #[error("config file not found: {0:?}")]
    NotFound(PathBuf),
    #[error("{key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("none of the input_paths exist")]
    NoInputs,
    #[error("roster {path:?}: {reason}")]
    Roster { path: PathBuf, reason: String },
    #[error("cannot create output directory {path:?}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ConfigError {
    pub fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// A single document could not be read by any strategy. The document is
/// skipped and the run continues.
#[derive(Debug, Error)]
#[error("cannot extract text from {path:?}: {reason}")]
pub struct ExtractionError {
    pub path: PathBuf,
    pub reason: String,
}

impl ExtractionError {
    pub fn new(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// The report could not be written. Fatal.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("report directory {0:?} does not exist")]
    MissingDirectory(PathBuf),
    #[error("report directory {0:?} is not writable")]
    ReadOnly(PathBuf),
    #[error("failed to write report {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: rust_xlsxwriter::XlsxError,
    },
}

/// A hit file could not be copied. Logged; the report still records the
/// planned destination.
#[derive(Debug, Error)]
#[error("failed to copy {from:?} -> {to:?}: {source}")]
pub struct CopyError {
    pub from: PathBuf,
    pub to: PathBuf,
    pub source: std::io::Error,
}

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RunError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Config(_) => 1,
            RunError::Other(_) => 2,
            RunError::Export(_) => 3,
        }
    }
}

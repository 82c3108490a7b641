//! Core library: document collection, text extraction, roster matching,
//! hit copying and the xlsx report.

pub mod cache;
pub mod classifier;
pub mod config;
pub mod context;
pub mod copier;
pub mod error;
pub mod extractor;
pub mod matcher;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod roster;
pub mod scanner;

pub use error::{ConfigError, CopyError, ExportError, ExtractionError, RunError};
pub use pipeline::{Pipeline, RunSummary};

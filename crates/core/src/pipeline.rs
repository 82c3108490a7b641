use crate::config::{clamp_workers, AppConfig};
use crate::context::RunContext;
use crate::copier::HitFileCopier;
use crate::error::{ConfigError, ExtractionError, RunError};
use crate::extractor::TextExtractor;
use crate::matcher::RosterMatcher;
use crate::models::{Document, ExtractedText, ReportRow};
use crate::report::ReportExporter;
use crate::roster::Roster;
use crate::scanner;
use anyhow::Context;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use providers::Toolkit;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub scanned: usize,
    pub extracted: usize,
    pub matched_files: usize,
    pub rows: usize,
    /// Documents no strategy could read.
    pub failed: Vec<PathBuf>,
    /// Hit files whose copy failed; their report rows point at the planned
    /// destination.
    pub copy_failures: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub report_path: PathBuf,
}

pub struct Pipeline {
    config: AppConfig,
    toolkit: Toolkit,
    extractor: TextExtractor,
}

impl Pipeline {
    pub fn new(config: AppConfig, toolkit: Toolkit) -> Self {
        Self {
            config,
            toolkit,
            extractor: TextExtractor::new(),
        }
    }

    pub fn with_extractor(mut self, extractor: TextExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub async fn run(self) -> Result<RunSummary, RunError> {
        let Pipeline {
            config,
            toolkit,
            extractor,
        } = self;

        let roster = Roster::load(&config.student_roster_path)?;
        info!(
            "roster loaded: {} entries from {:?}",
            roster.len(),
            config.student_roster_path
        );

        info!("collecting documents...");
        let roots = config.input_paths.clone();
        let excludes = config.exclude.clone();
        let documents =
            tokio::task::spawn_blocking(move || scanner::collect_documents(&roots, &excludes))
                .await
                .context("document collection task")?
                .map_err(|e| ConfigError::invalid("exclude", format!("{e:#}")))?;
        info!("collected {} documents", documents.len());

        let output_dir = create_output_dir(
            &config.output_root_dir,
            &config.output_folder_format,
            Local::now(),
        )?;
        info!("output directory: {:?}", output_dir);

        // The context owns the markdown cache; it is cleared when this drops.
        let ctx = Arc::new(RunContext::from_config(&config, toolkit));
        let timeout = config.timeout_sec.map(Duration::from_secs_f64);
        let results = if config.workers > 1 {
            extract_pooled(&documents, extractor, ctx.clone(), config.workers, timeout).await
        } else {
            extract_sequential(&documents, &extractor, &ctx, timeout).await
        };
        drop(ctx);

        let mut summary = RunSummary {
            scanned: documents.len(),
            output_dir: output_dir.clone(),
            report_path: output_dir.join(&config.report_filename),
            ..RunSummary::default()
        };

        let matcher = RosterMatcher::new(&roster).with_identifiers(config.match_identifiers);
        let mut copier = HitFileCopier::new(&output_dir);
        let mut rows: Vec<ReportRow> = Vec::new();
        for result in results {
            let extracted = match result {
                Ok(extracted) => extracted,
                Err(e) => {
                    warn!("{}", e);
                    summary.failed.push(e.path);
                    continue;
                }
            };
            summary.extracted += 1;

            let source = extracted.document.path.as_path();
            let hits = matcher.find(&extracted.text, source);
            if hits.is_empty() {
                debug!("no hits in {:?}", source);
                continue;
            }
            info!("{} hit(s) in {:?}", hits.len(), source);

            let dest = match copier.copy(source) {
                Ok(dest) => dest,
                Err(e) => {
                    summary.copy_failures.push(source.to_path_buf());
                    e.to
                }
            };
            summary.matched_files += 1;
            rows.extend(hits.iter().map(|hit| ReportRow::new(hit, &dest)));
        }
        summary.rows = rows.len();

        let exporter = ReportExporter::new(&summary.report_path);
        if let Err(e) = exporter.export(&rows) {
            error!("{}", e);
            return Err(e.into());
        }

        info!(
            "done: {} scanned, {} with hits, {} rows, {} failed",
            summary.scanned,
            summary.matched_files,
            summary.rows,
            summary.failed.len()
        );
        Ok(summary)
    }
}

pub async fn run(config: AppConfig, toolkit: Toolkit) -> Result<RunSummary, RunError> {
    Pipeline::new(config, toolkit).run().await
}

async fn extract_one(
    extractor: &TextExtractor,
    document: &Document,
    ctx: &RunContext,
    timeout: Option<Duration>,
) -> Result<ExtractedText, ExtractionError> {
    info!("extracting {:?}", document.path);
    let fut = extractor.extract(document, ctx);
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(ExtractionError::new(
                &document.path,
                format!("timed out after {:.1}s", limit.as_secs_f64()),
            )),
        },
        None => fut.await,
    };
    if let Ok(extracted) = &result {
        for warning in &extracted.warnings {
            debug!("{:?}: tolerated {}", document.path, warning);
        }
    }
    result
}

async fn extract_sequential(
    documents: &[Document],
    extractor: &TextExtractor,
    ctx: &RunContext,
    timeout: Option<Duration>,
) -> Vec<Result<ExtractedText, ExtractionError>> {
    let mut results = Vec::with_capacity(documents.len());
    for document in documents {
        results.push(extract_one(extractor, document, ctx, timeout).await);
    }
    results
}

/// Extracts with at most `workers` documents in flight; results come back in
/// collection order.
async fn extract_pooled(
    documents: &[Document],
    extractor: TextExtractor,
    ctx: Arc<RunContext>,
    workers: usize,
    timeout: Option<Duration>,
) -> Vec<Result<ExtractedText, ExtractionError>> {
    let workers = clamp_workers(workers);
    info!("extracting with {} workers", workers);
    let semaphore = Arc::new(Semaphore::new(workers));
    let extractor = Arc::new(extractor);
    let mut set = JoinSet::new();
    for (index, document) in documents.iter().cloned().enumerate() {
        let semaphore = semaphore.clone();
        let extractor = extractor.clone();
        let ctx = ctx.clone();
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let result = extract_one(&extractor, &document, &ctx, timeout).await;
            (index, result)
        });
    }

    let mut slots: Vec<Option<Result<ExtractedText, ExtractionError>>> =
        documents.iter().map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(e) => error!("extraction task failed: {}", e),
        }
    }

    slots
        .into_iter()
        .zip(documents)
        .map(|(slot, document)| {
            slot.unwrap_or_else(|| {
                Err(ExtractionError::new(&document.path, "extraction task aborted"))
            })
        })
        .collect()
}

/// Renders `format` with `now` under `root` and creates the directory. An
/// existing directory of that name gets a `_2`, `_3`, ... suffix instead.
pub fn create_output_dir(
    root: &Path,
    format: &str,
    now: DateTime<Local>,
) -> Result<PathBuf, ConfigError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ConfigError::invalid(
            "output_folder_format",
            format!("invalid time format {format:?}"),
        ));
    }
    let name = now.format(format).to_string();
    if name.trim().is_empty() || name.contains('/') || name.contains('\\') {
        return Err(ConfigError::invalid(
            "output_folder_format",
            format!("renders to an unusable folder name {name:?}"),
        ));
    }

    let io_err = |path: &Path, source| ConfigError::OutputDir {
        path: path.to_path_buf(),
        source,
    };
    std::fs::create_dir_all(root).map_err(|e| io_err(root, e))?;
    let mut counter = 1;
    loop {
        let candidate = if counter == 1 {
            root.join(&name)
        } else {
            root.join(format!("{}_{}", name, counter))
        };
        match std::fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => counter += 1,
            Err(e) => return Err(io_err(&candidate, e)),
        }
    }
}

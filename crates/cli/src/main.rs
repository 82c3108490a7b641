use clap::{Parser, Subcommand};
use cli::{doctor, log_stats, logging};
use providers::Toolkit;
use scan_core::config::{self, AppConfig};
use scan_core::{Pipeline, RunError, RunSummary};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "roster-scan")]
#[command(about = "Find roster names in Office and PDF files", long_about = None)]
struct Cli {
    /// Path to config YAML
    #[arg(short, long, global = true, default_value = "config.yml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, match, copy hits and write the report (default)
    Scan {
        /// Never run OCR on PDF pages
        #[arg(long)]
        no_ocr: bool,
        /// Extract this many documents concurrently
        #[arg(long)]
        workers: Option<usize>,
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
    /// Check that the external tools can be found
    Doctor {
        /// Also OCR a blank test page with the configured languages
        #[arg(long, default_value_t = false)]
        run_ocr: bool,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Count lines, warnings and errors in the log file
    LogStats {
        /// Log file; defaults to `log_file` from the config
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Scan {
        no_ocr: false,
        workers: None,
        json: false,
    });

    match command {
        Commands::Scan {
            no_ocr,
            workers,
            json,
        } => run_scan(&cli.config, no_ocr, workers, json).await,
        Commands::Doctor { run_ocr, json } => run_doctor(&cli.config, run_ocr, json).await,
        Commands::LogStats { path } => run_log_stats(&cli.config, path),
    }
}

async fn run_scan(config_path: &Path, no_ocr: bool, workers: Option<usize>, json: bool) -> ExitCode {
    let mut cfg = match config::load(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            logging::init("info", None).ok();
            let err = RunError::from(e);
            error!("{}", err);
            return ExitCode::from(err.exit_code());
        }
    };
    init_logging(&cfg);

    if no_ocr {
        cfg.ocr_enabled = false;
    }
    if let Some(n) = workers {
        cfg.workers = config::clamp_workers(n);
    }
    info!("config loaded from {:?}", config_path);

    match Pipeline::new(cfg, Toolkit::from_env()).run().await {
        Ok(summary) => {
            if let Err(e) = print_summary(&summary, json) {
                error!("failed to print summary: {}", e);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_logging(cfg: &AppConfig) {
    if let Err(e) = logging::init(&cfg.log_level, Some(&cfg.log_file)) {
        eprintln!("log file unavailable ({e:#}), logging to console only");
        logging::init(&cfg.log_level, None).ok();
    }
}

fn print_summary(summary: &RunSummary, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }
    println!(
        "scanned {}, with hits {}, rows {}, failed {}",
        summary.scanned,
        summary.matched_files,
        summary.rows,
        summary.failed.len()
    );
    println!("report: {}", summary.report_path.display());
    for path in &summary.failed {
        println!("  unreadable: {}", path.display());
    }
    for path in &summary.copy_failures {
        println!("  not copied: {}", path.display());
    }
    Ok(())
}

async fn run_doctor(config_path: &Path, run_ocr: bool, json: bool) -> ExitCode {
    logging::init("warn", None).ok();
    let mut statuses = doctor::check_tools().await;
    if run_ocr {
        let lang = config::load(config_path)
            .map(|cfg| cfg.ocr_lang)
            .unwrap_or_else(|_| "chi_sim+eng".to_string());
        statuses.push(doctor::ocr_smoke_test(&lang).await);
    }

    if json {
        match serde_json::to_string_pretty(&statuses) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::from(2);
            }
        }
    } else {
        for s in &statuses {
            let mark = if s.available { "ok" } else { "MISSING" };
            println!("{:<22} {:<8} {} ({})", s.name, mark, s.command.display(), s.detail);
        }
    }
    if statuses.iter().all(|s| s.available) {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    }
}

fn run_log_stats(config_path: &Path, path: Option<PathBuf>) -> ExitCode {
    let path = path.unwrap_or_else(|| {
        config::load(config_path)
            .map(|cfg| cfg.log_file)
            .unwrap_or_else(|_| PathBuf::from("log.txt"))
    });
    match log_stats::read(&path) {
        Ok(stats) => {
            println!(
                "{}: {} lines, {} warnings, {} errors",
                path.display(),
                stats.lines,
                stats.warnings,
                stats.errors
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::from(2)
        }
    }
}

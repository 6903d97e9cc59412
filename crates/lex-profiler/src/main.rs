//! CLI entry point for the streaming data profiler.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use dotenv::dotenv;
use lex_profiler::{Profiler, ProfilerConfig, ProfilerResult, ProfilingStage, SlaLevel};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Environment variable holding the default time box in seconds.
const TIMEOUT_ENV: &str = "LEX_PROFILER_TIMEOUT_SECS";

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Streaming data-quality and sensitivity profiler",
    long_about = "Profiles CSV and JSONL uploads in a single streaming pass.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  LEX_PROFILER_TIMEOUT_SECS    Default time box when --timeout-secs is absent\n  \
                  RUST_LOG                     Overrides --log-level\n\n\
                  EXAMPLES:\n  \
                  # Profile a file and print the column summary\n  \
                  lex-profiler -i fretes.csv\n\n  \
                  # Machine-readable report\n  \
                  lex-profiler -i notas.jsonl --json\n\n  \
                  # Reproducible sampling, written to a file\n  \
                  lex-profiler -i fretes.csv --seed 42 --emit-report fretes_report.json"
)]
struct Args {
    /// Path to the CSV or JSONL file to profile
    #[arg(short, long)]
    input: String,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,

    /// Write the JSON report to this path
    #[arg(short = 'r', long)]
    emit_report: Option<String>,

    /// Load the whole file into columns instead of streaming it
    ///
    /// Dirty lines are skipped but reported; the report has no sample rows.
    #[arg(long)]
    sync: bool,

    /// Abort the run after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Seed for the sampling reservoirs
    #[arg(long)]
    seed: Option<u64>,

    /// Number of preview rows kept in the report
    #[arg(long, default_value = "50")]
    sample_rows: usize,

    /// Rows buffered between the reader thread and the aggregator
    #[arg(long, default_value = "100")]
    queue_capacity: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    dotenv().ok();

    let path = Path::new(&args.input);
    if !path.exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("input")
        .to_string();

    let config = build_config(&args)?;
    let profiler = Arc::new(build_profiler(config)?);

    let file = std::fs::File::open(path).with_context(|| format!("Opening {}", args.input))?;
    let size = file.metadata()?.len();
    info!("Profiling {} ({} bytes)", args.input, size);

    let result = if args.sync {
        let profiler = Arc::clone(&profiler);
        let name = file_name.clone();
        tokio::task::spawn_blocking(move || profiler.profile_reader_sync(file, &name)).await?
    } else {
        profiler.profile_reader(file, &file_name, size).await
    };

    match result {
        Ok(report) => handle_output(&report, &args),
        Err(e) => {
            error!("Profiling failed: {}", e);
            Err(anyhow!("Profiling failed [{}]: {}", e.error_code(), e))
        }
    }
}

fn build_config(args: &Args) -> Result<ProfilerConfig> {
    let mut builder = ProfilerConfig::builder()
        .row_sample_size(args.sample_rows)
        .queue_capacity(args.queue_capacity);

    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }

    let timeout_secs = match args.timeout_secs {
        Some(secs) => Some(secs),
        None => match std::env::var(TIMEOUT_ENV) {
            Ok(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("{TIMEOUT_ENV} must be a whole number of seconds"))?,
            ),
            Err(_) => None,
        },
    };
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }

    Ok(builder.build()?)
}

fn build_profiler(config: ProfilerConfig) -> Result<Profiler> {
    let profiler = Profiler::builder()
        .config(config)
        .on_progress(|update| match update.stage {
            ProfilingStage::Reading => {
                debug!("[{:>3.0}%] {}", update.percentage, update.message)
            }
            _ => info!(
                "[{:>3.0}%] {}: {}",
                update.percentage,
                update.stage.display_name(),
                update.message
            ),
        })
        .build()?;
    Ok(profiler)
}

/// Handle profiler output based on CLI flags.
///
/// Output behavior:
/// - Default: Print human-readable summary to stdout
/// - `--json`: Print JSON to stdout only (no logs)
/// - `--emit-report`: Write JSON report to file
fn handle_output(report: &ProfilerResult, args: &Args) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    if let Some(path) = &args.emit_report {
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(path, json).with_context(|| format!("Writing report to {path}"))?;
        info!("Report written to: {}", path);
    }

    print_human_readable_summary(report);
    Ok(())
}

/// Note: This function uses `println!` intentionally for user-facing CLI output.
fn print_human_readable_summary(report: &ProfilerResult) {
    println!();
    println!("{}", "=".repeat(96));
    println!("PROFILE: {}", report.name_file);
    println!("{}", "=".repeat(96));
    println!(
        "  Rows: {}   Columns: {}   Dirty lines: {}   Sample rows: {}",
        report.total_max_rows,
        report.total_columns,
        report.dirty_lines_count,
        report.sample_rows.len()
    );
    println!();

    println!(
        "{:<24} {:<14} {:<9} {:<13} {:>8} {:>12}",
        "Column", "Type", "SLA", "Sensitivity", "Filled %", "Consistent %"
    );
    println!("{}", "-".repeat(96));

    for col in &report.columns {
        println!(
            "{:<24} {:<14} {:<9} {:<13} {:>8.1} {:>12.1}",
            truncate_str(&col.name, 23),
            col.main_type.as_str(),
            col.sla.to_string(),
            col.sensitivity.to_string(),
            col.filled_ratio * 100.0,
            col.consistency_ratio * 100.0
        );
    }
    println!();

    let flagged: Vec<_> = report
        .columns
        .iter()
        .filter(|c| c.sla != SlaLevel::Good)
        .collect();
    if !flagged.is_empty() {
        println!("Quality findings:");
        for col in flagged {
            println!("  ! {} [{}] {}", col.name, col.sla, col.sla_reason);
        }
        println!();
    }

    if !report.dirty_lines.is_empty() {
        println!("Dirty lines (first {}):", report.dirty_lines.len().min(10));
        for dirty in report.dirty_lines.iter().take(10) {
            println!("  - line {}: {}", dirty.line, dirty.reason);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use --emit-report <path> to save the JSON report");
    println!("{}", "=".repeat(96));
}

/// Truncate a string to max length (in characters) with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

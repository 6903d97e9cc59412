//! Streaming Data Profiler Library
//!
//! A streaming data-quality and sensitivity profiler for tabular uploads
//! (CSV and JSONL), tuned for Brazilian logistics and fiscal documents.
//!
//! # Overview
//!
//! This library reads an upload once, with bounded memory, and produces a
//! per-column report:
//!
//! - **Encoding Normalization**: UTF-16 by BOM, UTF-8, Windows-1252 fallback
//! - **Format Sniffing**: CSV vs JSONL detection and CSV delimiter voting
//! - **Dirty-Line Recovery**: malformed records are logged, not fatal
//! - **Type Inference**: CPF, CNPJ, 44-digit fiscal keys, plates, CEP, dates and more
//! - **Quality Scoring**: GOOD / WARNING / CRITICAL from blanks and consistency
//! - **Sensitivity Tagging**: governance level per column
//! - **Progress Reporting**: throttled progress with cancellation and a time box
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_profiler::{Profiler, ProfilerConfig, CancellationToken};
//! use std::time::Duration;
//!
//! let file = std::fs::File::open("notas_fiscais.csv")?;
//! let size = file.metadata()?.len();
//!
//! // Streaming path: reader thread + bounded channel
//! let report = Profiler::builder()
//!     .config(ProfilerConfig::builder().timeout(Duration::from_secs(120)).build()?)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.percentage, update.message);
//!     })
//!     .build()?
//!     .profile_reader(file, "notas_fiscais.csv", size)
//!     .await?;
//!
//! for column in &report.columns {
//!     println!("{}: {} ({})", column.name, column.main_type, column.sla);
//! }
//! ```
//!
//! # Consuming Row Events Directly
//!
//! ```rust,ignore
//! use lex_profiler::{Profiler, RowEvent};
//!
//! let profiler = Profiler::builder().build()?;
//! let mut stream = profiler.open_stream(file)?;
//! println!("headers: {:?}", stream.headers());
//!
//! while let Some(event) = stream.events.recv().await {
//!     match event {
//!         RowEvent::Row { values, .. } => stream.pool.put(values),
//!         RowEvent::Dirty { line_number, reason } => eprintln!("{line_number}: {reason}"),
//!     }
//! }
//! ```
//!
//! # Configuration
//!
//! ```rust,ignore
//! use lex_profiler::ProfilerConfig;
//!
//! let config = ProfilerConfig::builder()
//!     .queue_capacity(100)        // Rows buffered between reader and aggregator
//!     .numeric_sample_size(1000)  // Reservoir size for histograms
//!     .row_sample_size(50)        // Preview rows in the report
//!     .max_dirty_lines(1000)      // Dirty lines kept in the report
//!     .seed(42)                   // Reproducible sampling
//!     .build()?;
//! ```

pub mod config;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod profiler;
pub mod quality;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use config::{ConfigValidationError, ProfilerConfig, ProfilerConfigBuilder};
pub use error::{ProfilerError, ResultExt};
pub use ingest::{
    DetectedEncoding, InputDescription, InputFormat, LoadedColumns, RowPool, RowStream,
    load_columns, open_rows, spawn_reader,
};
pub use pipeline::{
    CancellationToken, ClosureProgressReporter, Profiler, ProfilerBuilder, ProfilingStage,
    ProgressReporter, ProgressUpdate,
};
pub use profiler::{ColumnAccumulator, Reservoir, StreamAggregator, classify, profile, profile_async};
pub use quality::{QualityScorer, SensitivityClassifier};
pub use types::{
    ColumnResult, DataType, DirtyLine, ProfilerResult, RawColumn, RowEvent, SensitivityLevel,
    SlaLevel, StatKey,
};

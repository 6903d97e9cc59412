//! Progress reporting and cancellation support for profiling runs.
//!
//! This module provides types for tracking profiling progress and supporting
//! cancellation from external threads (e.g., an HTTP handler whose client
//! disconnected).
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_profiler::{Profiler, CancellationToken};
//!
//! let token = CancellationToken::new();
//! let token_clone = token.clone();
//!
//! // In another thread
//! std::thread::spawn(move || {
//!     std::thread::sleep(std::time::Duration::from_secs(5));
//!     token_clone.cancel();
//! });
//!
//! let result = Profiler::builder()
//!     .cancellation_token(token)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.percentage, update.message);
//!     })
//!     .build()?
//!     .profile_reader(file, "vendas.csv", size)
//!     .await;
//! ```

use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Share of the progress bar covered by reading the upload.
pub const READING_MAX_PERCENT: f64 = 80.0;
/// Progress reported once all rows are consumed.
pub const FINALIZING_PERCENT: f64 = 90.0;

/// Minimum delay between two reading updates with the same percentage.
const PROGRESS_HEARTBEAT: Duration = Duration::from_secs(1);

/// Stages of a profiling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfilingStage {
    /// Detecting encoding, format and header
    Initializing,
    /// Streaming rows into the column accumulators
    Reading,
    /// Computing per-column results
    Finalizing,
    /// Run completed successfully
    Complete,
    /// Run was cancelled or timed out
    Cancelled,
    /// Run failed with an error
    Failed,
}

impl ProfilingStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::Reading => "Reading Rows",
            Self::Finalizing => "Finalizing Columns",
            Self::Complete => "Complete",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }
}

/// A progress checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Current stage
    pub stage: ProfilingStage,

    /// Overall progress (0.0 - 100.0)
    pub percentage: f64,

    /// Raw bytes consumed from the upload so far
    pub bytes_read: u64,

    /// Human-readable message describing current activity
    pub message: String,
}

impl ProgressUpdate {
    /// Creates a new progress update.
    pub fn new(
        stage: ProfilingStage,
        percentage: f64,
        bytes_read: u64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            percentage: percentage.clamp(0.0, 100.0),
            bytes_read,
            message: message.into(),
        }
    }

    /// Creates a reading progress update.
    pub fn reading(percentage: f64, bytes_read: u64) -> Self {
        Self::new(
            ProfilingStage::Reading,
            percentage.min(READING_MAX_PERCENT),
            bytes_read,
            format!("Read {bytes_read} bytes"),
        )
    }

    /// Creates a finalizing progress update.
    pub fn finalizing(bytes_read: u64) -> Self {
        Self::new(
            ProfilingStage::Finalizing,
            FINALIZING_PERCENT,
            bytes_read,
            "Computing column results",
        )
    }

    /// Creates a completion progress update.
    pub fn complete(bytes_read: u64, message: impl Into<String>) -> Self {
        Self::new(ProfilingStage::Complete, 100.0, bytes_read, message)
    }

    /// Creates a cancelled progress update.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ProfilingStage::Cancelled, 0.0, 0, message)
    }

    /// Creates a failed progress update.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(ProfilingStage::Failed, 0.0, 0, message)
    }
}

/// Trait for receiving progress updates during profiling.
///
/// Implementations must be `Send + Sync`: reading updates are emitted from
/// the reader thread, the rest from the task driving the run.
///
/// # Example
///
/// ```rust,ignore
/// use lex_profiler::{ProgressReporter, ProgressUpdate};
/// use tokio::sync::broadcast;
///
/// struct SseReporter {
///     tx: broadcast::Sender<ProgressUpdate>,
/// }
///
/// impl ProgressReporter for SseReporter {
///     fn report(&self, update: ProgressUpdate) {
///         let _ = self.tx.send(update);
///     }
/// }
/// ```
pub trait ProgressReporter: Send + Sync {
    /// Called at each progress checkpoint.
    ///
    /// Runs inline on the reader thread, so implementations should be
    /// efficient and non-blocking.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    /// Creates a new closure-based progress reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

/// Cancellation flag shared by the caller, the reader thread and the
/// aggregation loop.
///
/// The reader thread polls [`is_cancelled`](Self::is_cancelled) between
/// records. The aggregation loop awaits [`cancelled`](Self::cancelled) next
/// to the row queue, so a stalled upload does not delay a cancel request.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenState>,
}

#[derive(Debug, Default)]
struct TokenState {
    cancelled: AtomicBool,
    wake: Notify,
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake every task waiting in
    /// [`cancelled`](Self::cancelled). Callable from any thread.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.wake.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called on this token
    /// or any clone. Resolves immediately if it already was.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.wake.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent cancel is not missed.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Byte counter shared between a [`ProgressReader`] and the run that owns it.
#[derive(Debug, Clone, Default)]
pub struct BytesCounter(Arc<std::sync::atomic::AtomicU64>);

impl BytesCounter {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn add(&self, n: u64) -> u64 {
        self.0.fetch_add(n, Ordering::Relaxed) + n
    }
}

/// Reader adapter that reports throttled reading progress.
///
/// Progress is `floor(bytes / total * 80)`. An update is emitted when that
/// integer advances, or when at least a second passed since the last one.
/// Nothing is reported when `total_size` is zero.
pub struct ProgressReader<R> {
    inner: R,
    total_size: u64,
    reporter: Arc<dyn ProgressReporter>,
    bytes: BytesCounter,
    last_percent: u64,
    last_report: Instant,
}

impl<R: Read> ProgressReader<R> {
    pub fn new(inner: R, total_size: u64, reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            inner,
            total_size,
            reporter,
            bytes: BytesCounter::default(),
            last_percent: 0,
            last_report: Instant::now(),
        }
    }

    /// Handle to the running byte count.
    pub fn bytes_counter(&self) -> BytesCounter {
        self.bytes.clone()
    }

    fn percent_of(&self, bytes: u64) -> u64 {
        let fraction = bytes as f64 / self.total_size as f64;
        ((fraction * READING_MAX_PERCENT).floor() as u64).min(READING_MAX_PERCENT as u64)
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        let bytes = self.bytes.add(n as u64);

        if self.total_size > 0 {
            let percent = self.percent_of(bytes);
            if percent > self.last_percent || self.last_report.elapsed() > PROGRESS_HEARTBEAT {
                self.last_percent = self.last_percent.max(percent);
                self.last_report = Instant::now();
                self.reporter
                    .report(ProgressUpdate::reading(self.last_percent as f64, bytes));
            }
        }

        Ok(n)
    }
}

//! Profiler facade.
//!
//! This module provides the [`Profiler`] struct and its builder, which tie
//! ingest, aggregation, progress reporting, cancellation and the time box
//! together.

use crate::config::{ConfigValidationError, ProfilerConfig};
use crate::error::{ProfilerError, Result};
use crate::ingest::encoding::BoxedReader;
use crate::ingest::loader::load_columns;
use crate::ingest::pool::RowPool;
use crate::ingest::sniff::separator_name;
use crate::ingest::stream::{RowStream, open_rows, spawn_reader};
use crate::pipeline::progress::{
    BytesCounter, CancellationToken, ClosureProgressReporter, ProfilingStage, ProgressReader,
    ProgressReporter, ProgressUpdate,
};
use crate::profiler::{profile, profile_async};
use crate::types::{ProfilerResult, RawColumn};
use std::io::Read;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Entry point for profiling an upload.
///
/// Use [`Profiler::builder()`] to create a profiler with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use lex_profiler::{Profiler, ProfilerConfig, CancellationToken};
/// use std::time::Duration;
///
/// let token = CancellationToken::new();
/// let file = std::fs::File::open("fretes.csv")?;
/// let size = file.metadata()?.len();
///
/// let report = Profiler::builder()
///     .config(ProfilerConfig::builder().timeout(Duration::from_secs(60)).build()?)
///     .cancellation_token(token.clone())
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.percentage, update.message);
///     })
///     .build()?
///     .profile_reader(file, "fretes.csv", size)
///     .await?;
/// ```
pub struct Profiler {
    config: ProfilerConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: CancellationToken,
}

// The async entry point is usually spawned onto a runtime worker.
static_assertions::assert_impl_all!(Profiler: Send, Sync);

impl Profiler {
    /// Create a new profiler builder.
    pub fn builder() -> ProfilerBuilder {
        ProfilerBuilder::default()
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Profile columns that are already in memory.
    pub fn profile_columns(&self, columns: &[RawColumn], file_name: &str) -> ProfilerResult {
        profile(columns, file_name, &self.config)
    }

    /// Load the whole upload into columns and profile them.
    ///
    /// Dirty lines are skipped but still reported. The report carries no
    /// sample rows. Blocks the calling thread.
    pub fn profile_reader_sync<R>(&self, reader: R, file_name: &str) -> Result<ProfilerResult>
    where
        R: Read + Send + 'static,
    {
        self.check_cancelled()?;
        let loaded = load_columns(reader, &self.config, &self.cancellation_token)?;
        info!(
            format = %loaded.description.format,
            encoding = %loaded.description.encoding,
            dirty = loaded.dirty_count,
            "Profiling loaded columns"
        );
        let mut result = self.profile_columns(&loaded.columns, file_name);
        result.dirty_lines_count = loaded.dirty_count;
        result.dirty_lines = loaded.dirty_lines;
        Ok(result)
    }

    /// Stream the upload through the reader thread and aggregate it.
    ///
    /// `total_size` is the upload size in bytes, used for progress only.
    ///
    /// # Errors
    ///
    /// Returns [`ProfilerError::Cancelled`] if the token was cancelled and
    /// [`ProfilerError::Timeout`] if the configured time box expired, even
    /// though a partial aggregate existed at that point.
    pub async fn profile_reader<R>(
        &self,
        reader: R,
        file_name: &str,
        total_size: u64,
    ) -> Result<ProfilerResult>
    where
        R: Read + Send + 'static,
    {
        let run = self.profile_reader_internal(reader, file_name, total_size);
        let outcome = match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .unwrap_or(Err(ProfilerError::Timeout(limit))),
            None => run.await,
        };

        match outcome {
            Ok((result, bytes_read)) => {
                self.report_progress(ProgressUpdate::complete(
                    bytes_read,
                    format!("Profiled {} rows", result.total_max_rows),
                ));
                Ok(result)
            }
            Err(e) => {
                if e.is_cancelled() || e.is_timeout() {
                    self.report_progress(ProgressUpdate::cancelled(e.to_string()));
                } else {
                    self.report_progress(ProgressUpdate::failed(e.to_string()));
                }
                error!("Profiling error: {}", e);
                Err(e)
            }
        }
    }

    /// Detect the input layout and start the reader thread.
    ///
    /// For callers that consume the row events themselves. Blocks while the
    /// encoding and format samples are read.
    pub fn open_stream<R>(&self, reader: R) -> Result<RowStream>
    where
        R: Read + Send + 'static,
    {
        self.check_cancelled()?;
        let source = open_rows(reader, &self.config, Arc::new(RowPool::new()))?;
        spawn_reader(
            source,
            self.config.queue_capacity,
            self.cancellation_token.clone(),
        )
    }

    /// Check if cancellation has been requested.
    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(ProfilerError::Cancelled);
        }
        Ok(())
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    async fn profile_reader_internal<R>(
        &self,
        reader: R,
        file_name: &str,
        total_size: u64,
    ) -> Result<(ProfilerResult, u64)>
    where
        R: Read + Send + 'static,
    {
        let start_time = Instant::now();
        self.check_cancelled()?;
        self.report_progress(ProgressUpdate::new(
            ProfilingStage::Initializing,
            0.0,
            0,
            "Detecting encoding and format...",
        ));

        let (reader, bytes) = self.wrap_reader(reader, total_size);

        // Sniffing reads from the upload, keep it off the runtime threads.
        let config = self.config.clone();
        let detection = tokio::task::spawn_blocking(move || {
            open_rows(reader, &config, Arc::new(RowPool::new()))
        });
        let source = tokio::select! {
            biased;
            _ = self.cancellation_token.cancelled() => return Err(ProfilerError::Cancelled),
            joined = detection => joined
                .map_err(|e| ProfilerError::Internal(format!("format detection task failed: {e}")))??,
        };

        let description = &source.description;
        info!(
            format = %description.format,
            encoding = %description.encoding,
            separator = %description.separator.map(separator_name).unwrap_or_default(),
            columns = description.headers.len(),
            "Input detected"
        );

        let mut stream = spawn_reader(
            source,
            self.config.queue_capacity,
            self.cancellation_token.clone(),
        )?;
        let result = profile_async(
            &stream.description.headers,
            &mut stream.events,
            &stream.pool,
            file_name,
            &self.config,
            &self.cancellation_token,
        )
        .await;
        self.check_cancelled()?;

        let bytes_read = bytes.get();
        self.report_progress(ProgressUpdate::finalizing(bytes_read));
        info!(
            rows = result.total_max_rows,
            dirty = result.dirty_lines_count,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Profiling complete"
        );
        Ok((result, bytes_read))
    }

    fn wrap_reader<R>(&self, reader: R, total_size: u64) -> (BoxedReader, BytesCounter)
    where
        R: Read + Send + 'static,
    {
        match &self.progress_reporter {
            Some(reporter) => {
                let reader = ProgressReader::new(reader, total_size, Arc::clone(reporter));
                let bytes = reader.bytes_counter();
                (Box::new(reader), bytes)
            }
            None => (Box::new(reader), BytesCounter::default()),
        }
    }
}

/// Builder for creating a [`Profiler`] instance.
///
/// Use [`Profiler::builder()`] to get started.
#[derive(Default)]
pub struct ProfilerBuilder {
    config: Option<ProfilerConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: Option<CancellationToken>,
}

static_assertions::assert_impl_all!(ProfilerBuilder: Send);

impl ProfilerBuilder {
    /// Set the profiler configuration.
    pub fn config(mut self, config: ProfilerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during profiling.
    ///
    /// Reading updates are emitted from the reader thread.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// This is a convenience method for simple progress handling.
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Set a cancellation token for stopping a run.
    ///
    /// Clone the token and call [`CancellationToken::cancel()`] from any
    /// thread. The run returns [`ProfilerError::Cancelled`] without waiting
    /// for the upload to produce more data.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Build the profiler.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Profiler, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Profiler {
            config,
            progress_reporter: self.progress_reporter,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use std::time::Duration;

    fn reader(text: &str) -> Cursor<Vec<u8>> {
        Cursor::new(text.as_bytes().to_vec())
    }

    fn seeded() -> ProfilerConfig {
        ProfilerConfig::builder().seed(11).build().unwrap()
    }

    /// Reader that hands out one line per read, slowly.
    struct SlowLines {
        remaining: usize,
    }

    impl Read for SlowLines {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.remaining == 0 {
                return Ok(0);
            }
            std::thread::sleep(Duration::from_millis(25));
            self.remaining -= 1;
            let line = b"1;2\n";
            let n = line.len().min(buf.len());
            buf[..n].copy_from_slice(&line[..n]);
            Ok(n)
        }
    }

    /// Reader that yields `head` and then stalls for `stall` before EOF.
    struct StalledAfter {
        head: Cursor<Vec<u8>>,
        stall: Duration,
    }

    impl Read for StalledAfter {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.head.read(buf)?;
            if n == 0 {
                std::thread::sleep(self.stall);
            }
            Ok(n)
        }
    }

    #[test]
    fn test_builder_default() {
        let profiler = Profiler::builder().build().unwrap();
        assert_eq!(profiler.config(), &ProfilerConfig::default());
        assert!(profiler.progress_reporter.is_none());
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let config = ProfilerConfig {
            queue_capacity: 0,
            ..ProfilerConfig::default()
        };
        assert!(Profiler::builder().config(config).build().is_err());
    }

    #[test]
    fn test_profile_columns() {
        let profiler = Profiler::builder().config(seeded()).build().unwrap();
        let columns = vec![RawColumn::new(
            "email",
            vec!["a@b.com".to_string(), "c@d.org".to_string()],
        )];
        let result = profiler.profile_columns(&columns, "contatos.csv");
        assert_eq!(result.columns[0].main_type, DataType::Email);
        assert_eq!(result.name_file, "contatos");
    }

    #[test]
    fn test_profile_reader_sync_reports_dirty_lines() {
        let profiler = Profiler::builder().config(seeded()).build().unwrap();
        let result = profiler
            .profile_reader_sync(reader("a;b\n1;2\n3;4;5\n6;7\n"), "f.csv")
            .unwrap();
        assert_eq!(result.total_max_rows, 2);
        assert_eq!(result.dirty_lines_count, 1);
        assert_eq!(result.dirty_lines.len(), 1);
        assert_eq!(result.dirty_lines[0].line, 3);
        assert!(result.sample_rows.is_empty());
        assert_eq!(result.total_columns, 2);
    }

    #[test]
    fn test_profile_reader_sync_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let profiler = Profiler::builder()
            .cancellation_token(token)
            .build()
            .unwrap();
        let err = profiler
            .profile_reader_sync(reader("a\n1\n"), "f.csv")
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_profile_reader_reports_progress() {
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&updates);
        let text = "nome;idade\nJoao;10\nMaria;20\n";

        let profiler = Profiler::builder()
            .config(seeded())
            .on_progress(move |update| sink.lock().push(update))
            .build()
            .unwrap();
        let result = profiler
            .profile_reader(reader(text), "pessoas.csv", text.len() as u64)
            .await
            .unwrap();

        assert_eq!(result.total_max_rows, 2);
        assert_eq!(result.column("idade").unwrap().main_type, DataType::Integer);

        let updates = updates.lock();
        let stages: Vec<ProfilingStage> = updates.iter().map(|u| u.stage).collect();
        assert_eq!(stages.first(), Some(&ProfilingStage::Initializing));
        assert_eq!(stages.last(), Some(&ProfilingStage::Complete));
        assert!(stages.contains(&ProfilingStage::Finalizing));
        assert!(
            updates
                .windows(2)
                .all(|pair| pair[0].percentage <= pair[1].percentage)
        );
        assert_eq!(updates.last().map(|u| u.bytes_read), Some(text.len() as u64));
    }

    #[tokio::test]
    async fn test_profile_reader_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let profiler = Profiler::builder()
            .cancellation_token(token)
            .build()
            .unwrap();
        let err = profiler
            .profile_reader(reader("a\n1\n"), "f.csv", 4)
            .await
            .unwrap_err();
        assert!(matches!(err, ProfilerError::Cancelled));
        assert_eq!(err.http_status(), 408);
    }

    #[tokio::test]
    async fn test_profile_reader_cancel_during_stalled_upload() {
        let token = CancellationToken::new();
        let profiler = Profiler::builder()
            .cancellation_token(token.clone())
            .build()
            .unwrap();
        let upload = StalledAfter {
            head: reader("a;b\n1;2\n"),
            stall: Duration::from_secs(3),
        };

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let started = Instant::now();
        let err = profiler
            .profile_reader(upload, "parado.csv", 8)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_profile_reader_times_out() {
        let config = ProfilerConfig::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        let profiler = Profiler::builder().config(config).build().unwrap();
        let err = profiler
            .profile_reader(SlowLines { remaining: 20 }, "lento.csv", 80)
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.error_code(), "TIMEOUT");
    }

    #[tokio::test]
    async fn test_profile_reader_empty_input() {
        let profiler = Profiler::builder().build().unwrap();
        let err = profiler
            .profile_reader(reader(""), "vazio.csv", 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ProfilerError::EmptyInput));
    }

    #[tokio::test]
    async fn test_open_stream() {
        let profiler = Profiler::builder().build().unwrap();
        let mut stream = profiler.open_stream(reader("a,b\n1,2\n3,4\n")).unwrap();
        assert_eq!(stream.headers(), ["a", "b"]);
        assert_eq!(stream.description.separator, Some(b','));

        let mut rows = 0;
        while let Some(event) = stream.events.recv().await {
            assert_eq!(event.line_number(), rows + 2);
            rows += 1;
        }
        assert_eq!(rows, 2);
    }
}

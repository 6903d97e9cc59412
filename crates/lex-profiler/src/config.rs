//! Configuration types for the profiling pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic profiler setup.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default capacity of the bounded row-event queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
/// Default numeric reservoir size per column.
pub const DEFAULT_NUMERIC_SAMPLE_SIZE: usize = 1000;
/// Default size of the row-preview reservoir.
pub const DEFAULT_ROW_SAMPLE_SIZE: usize = 50;
/// Default cap on retained dirty-line records.
pub const DEFAULT_MAX_DIRTY_LINES: usize = 1000;
/// Default number of bytes peeked for encoding and format detection.
pub const DEFAULT_SNIFF_SIZE: usize = 2048;
/// Default number of equal-width histogram buckets.
pub const DEFAULT_HISTOGRAM_BUCKETS: usize = 10;
/// Default maximum JSONL line length (1 MiB).
pub const DEFAULT_MAX_JSON_LINE_BYTES: usize = 1024 * 1024;

/// Configuration for the profiler.
///
/// Use [`ProfilerConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use lex_profiler::config::ProfilerConfig;
///
/// let config = ProfilerConfig::builder()
///     .queue_capacity(256)
///     .seed(42)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Capacity of the bounded queue between the reader thread and the
    /// aggregation loop.
    /// Default: 100
    pub queue_capacity: usize,

    /// Number of numeric observations kept per column for the histogram.
    /// Default: 1000
    pub numeric_sample_size: usize,

    /// Number of rows kept as a uniform preview of the dataset.
    /// Default: 50
    pub row_sample_size: usize,

    /// Maximum number of dirty-line records retained in the report.
    /// The total count is always exact.
    /// Default: 1000
    pub max_dirty_lines: usize,

    /// Number of leading bytes inspected for encoding, format and separator.
    /// Default: 2048
    pub sniff_size: usize,

    /// Number of equal-width histogram buckets for numeric columns.
    /// Default: 10
    pub histogram_buckets: usize,

    /// Longest accepted JSONL line in bytes. Longer lines are reported dirty.
    /// Default: 1 MiB
    pub max_json_line_bytes: usize,

    /// Seed for every reservoir in the run. `None` draws from OS entropy.
    /// Default: None
    pub seed: Option<u64>,

    /// Time box for a streaming run. `None` means no limit.
    /// Default: None
    pub timeout: Option<Duration>,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            numeric_sample_size: DEFAULT_NUMERIC_SAMPLE_SIZE,
            row_sample_size: DEFAULT_ROW_SAMPLE_SIZE,
            max_dirty_lines: DEFAULT_MAX_DIRTY_LINES,
            sniff_size: DEFAULT_SNIFF_SIZE,
            histogram_buckets: DEFAULT_HISTOGRAM_BUCKETS,
            max_json_line_bytes: DEFAULT_MAX_JSON_LINE_BYTES,
            seed: None,
            timeout: None,
        }
    }
}

impl ProfilerConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ProfilerConfigBuilder {
        ProfilerConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let non_zero = [
            ("queue_capacity", self.queue_capacity),
            ("sniff_size", self.sniff_size),
            ("histogram_buckets", self.histogram_buckets),
            ("max_json_line_bytes", self.max_json_line_bytes),
        ];
        for (field, value) in non_zero {
            if value == 0 {
                return Err(ConfigValidationError::ZeroValue {
                    field: field.to_string(),
                });
            }
        }

        if let Some(timeout) = self.timeout
            && timeout.is_zero()
        {
            return Err(ConfigValidationError::ZeroTimeout);
        }

        Ok(())
    }

    /// Seed for the reservoir of column `index`, if the run is seeded.
    ///
    /// Each column gets its own stream so that two identical columns do not
    /// keep identical samples.
    pub fn column_seed(&self, index: usize) -> Option<u64> {
        self.seed.map(|seed| seed.wrapping_add(index as u64 + 1))
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid value for '{field}': must be greater than zero")]
    ZeroValue { field: String },

    #[error("Invalid timeout: must be greater than zero")]
    ZeroTimeout,
}

/// Builder for [`ProfilerConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ProfilerConfigBuilder {
    queue_capacity: Option<usize>,
    numeric_sample_size: Option<usize>,
    row_sample_size: Option<usize>,
    max_dirty_lines: Option<usize>,
    sniff_size: Option<usize>,
    histogram_buckets: Option<usize>,
    max_json_line_bytes: Option<usize>,
    seed: Option<u64>,
    timeout: Option<Duration>,
}

impl ProfilerConfigBuilder {
    /// Set the capacity of the row-event queue.
    ///
    /// A full queue blocks the reader thread until the aggregation loop
    /// catches up.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Set the per-column numeric reservoir size.
    pub fn numeric_sample_size(mut self, size: usize) -> Self {
        self.numeric_sample_size = Some(size);
        self
    }

    /// Set the row-preview reservoir size.
    pub fn row_sample_size(mut self, size: usize) -> Self {
        self.row_sample_size = Some(size);
        self
    }

    /// Set the cap on retained dirty-line records.
    pub fn max_dirty_lines(mut self, max: usize) -> Self {
        self.max_dirty_lines = Some(max);
        self
    }

    /// Set the number of bytes inspected for detection.
    pub fn sniff_size(mut self, size: usize) -> Self {
        self.sniff_size = Some(size);
        self
    }

    /// Set the number of histogram buckets.
    pub fn histogram_buckets(mut self, buckets: usize) -> Self {
        self.histogram_buckets = Some(buckets);
        self
    }

    /// Set the longest accepted JSONL line.
    pub fn max_json_line_bytes(mut self, max: usize) -> Self {
        self.max_json_line_bytes = Some(max);
        self
    }

    /// Seed every reservoir for a reproducible run.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the time box for streaming runs.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ProfilerConfig` or an error if validation fails.
    pub fn build(self) -> Result<ProfilerConfig, ConfigValidationError> {
        let config = ProfilerConfig {
            queue_capacity: self.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY),
            numeric_sample_size: self
                .numeric_sample_size
                .unwrap_or(DEFAULT_NUMERIC_SAMPLE_SIZE),
            row_sample_size: self.row_sample_size.unwrap_or(DEFAULT_ROW_SAMPLE_SIZE),
            max_dirty_lines: self.max_dirty_lines.unwrap_or(DEFAULT_MAX_DIRTY_LINES),
            sniff_size: self.sniff_size.unwrap_or(DEFAULT_SNIFF_SIZE),
            histogram_buckets: self.histogram_buckets.unwrap_or(DEFAULT_HISTOGRAM_BUCKETS),
            max_json_line_bytes: self
                .max_json_line_bytes
                .unwrap_or(DEFAULT_MAX_JSON_LINE_BYTES),
            seed: self.seed,
            timeout: self.timeout,
        };

        config.validate()?;
        Ok(config)
    }
}

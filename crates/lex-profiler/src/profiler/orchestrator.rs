//! Wires accumulators to columns or to a row-event stream and assembles the
//! final report.

use crate::config::ProfilerConfig;
use crate::ingest::pool::RowPool;
use crate::pipeline::progress::CancellationToken;
use crate::profiler::accumulator::ColumnAccumulator;
use crate::profiler::reservoir::Reservoir;
use crate::types::{DirtyLine, ProfilerResult, RawColumn, RowEvent};
use crate::utils::report_name;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Profile fully materialized columns.
///
/// Columns may have different lengths; `total_max_rows` is the longest.
pub fn profile(columns: &[RawColumn], file_name: &str, config: &ProfilerConfig) -> ProfilerResult {
    let mut total_max_rows = 0;
    let results = columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            total_max_rows = total_max_rows.max(column.values.len());
            let mut acc = ColumnAccumulator::new(column.name.as_str(), index, config);
            for value in &column.values {
                acc.add(value);
            }
            let result = acc.finalize();
            debug!(column = %result.name, main_type = %result.main_type, sla = %result.sla, "Column profiled");
            result
        })
        .collect::<Vec<_>>();

    info!(
        columns = results.len(),
        rows = total_max_rows,
        "Profiled materialized columns"
    );

    ProfilerResult {
        name_file: report_name(file_name),
        total_max_rows,
        total_columns: results.len(),
        dirty_lines_count: 0,
        columns: results,
        sample_rows: Vec::new(),
        dirty_lines: Vec::new(),
    }
}

/// Drain `events` into a report.
///
/// Waits on the queue and on `token` together, so a cancel request ends the
/// run even while the reader is stalled on a slow upload. A cancelled run
/// and a queue closed before the end of input both yield whatever was
/// aggregated so far; the caller decides whether a partial report is an
/// error.
pub async fn profile_async(
    headers: &[String],
    events: &mut mpsc::Receiver<RowEvent>,
    pool: &RowPool,
    file_name: &str,
    config: &ProfilerConfig,
    token: &CancellationToken,
) -> ProfilerResult {
    let mut aggregator = StreamAggregator::new(headers, config);

    loop {
        let event = tokio::select! {
            biased;
            _ = token.cancelled() => {
                warn!(rows = aggregator.rows(), "Aggregation cancelled");
                break;
            }
            event = events.recv() => event,
        };
        match event {
            Some(event) => aggregator.ingest(event, pool),
            None => break,
        }
    }

    aggregator.finish(file_name)
}

/// Streaming aggregation state for one run.
///
/// Feeding events is synchronous so the same state serves the async
/// consumer and tests.
#[derive(Debug)]
pub struct StreamAggregator {
    accumulators: Vec<ColumnAccumulator>,
    preview: Reservoir<Vec<String>>,
    dirty_lines: Vec<DirtyLine>,
    dirty_count: usize,
    max_dirty_lines: usize,
    rows: usize,
}

impl StreamAggregator {
    pub fn new(headers: &[String], config: &ProfilerConfig) -> Self {
        let accumulators = headers
            .iter()
            .enumerate()
            .map(|(index, name)| ColumnAccumulator::new(name.as_str(), index, config))
            .collect();
        Self {
            accumulators,
            preview: Reservoir::with_optional_seed(config.row_sample_size, config.seed),
            dirty_lines: Vec::new(),
            dirty_count: 0,
            max_dirty_lines: config.max_dirty_lines,
            rows: 0,
        }
    }

    /// Row events processed so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty_count
    }

    /// Account for one event. Row buffers not kept for the preview go back
    /// to `pool`.
    pub fn ingest(&mut self, event: RowEvent, pool: &RowPool) {
        match event {
            RowEvent::Dirty {
                line_number,
                reason,
            } => self.record_dirty(line_number, reason),
            RowEvent::Row { values, .. } => {
                self.rows += 1;
                // Zip stops at the shorter side: extra values are ignored and
                // missing trailing ones are never added.
                for (acc, value) in self.accumulators.iter_mut().zip(&values) {
                    acc.add(value);
                }
                if let Some(rejected) = self.preview.offer(values) {
                    pool.put(rejected);
                }
            }
        }
    }

    fn record_dirty(&mut self, line: u64, reason: String) {
        self.dirty_count += 1;
        if self.dirty_lines.len() < self.max_dirty_lines {
            debug!(line, %reason, "Dirty line");
            self.dirty_lines.push(DirtyLine { line, reason });
        } else if self.dirty_count == self.max_dirty_lines + 1 {
            warn!(
                cap = self.max_dirty_lines,
                "Dirty line log is full, only counting from now on"
            );
        }
    }

    /// Finalize every column in header order.
    pub fn finish(self, file_name: &str) -> ProfilerResult {
        let columns = self
            .accumulators
            .into_iter()
            .map(|acc| {
                let result = acc.finalize();
                debug!(column = %result.name, main_type = %result.main_type, sla = %result.sla, "Column profiled");
                result
            })
            .collect::<Vec<_>>();

        info!(
            rows = self.rows,
            columns = columns.len(),
            dirty = self.dirty_count,
            "Stream aggregated"
        );

        ProfilerResult {
            name_file: report_name(file_name),
            total_max_rows: self.rows,
            total_columns: columns.len(),
            dirty_lines_count: self.dirty_count,
            columns,
            sample_rows: self.preview.into_items(),
            dirty_lines: self.dirty_lines,
        }
    }
}

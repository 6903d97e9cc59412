//! Whole-file loading for the synchronous profiling path.

use crate::config::ProfilerConfig;
use crate::error::{ProfilerError, Result};
use crate::ingest::pool::RowPool;
use crate::ingest::stream::{InputDescription, open_rows};
use crate::pipeline::progress::CancellationToken;
use crate::types::{DirtyLine, RawColumn, RowEvent};
use std::io::Read;
use std::sync::Arc;
use tracing::{info, warn};

/// Columns materialized from an upload.
#[derive(Debug, Clone)]
pub struct LoadedColumns {
    pub description: InputDescription,
    pub columns: Vec<RawColumn>,
    /// First `max_dirty_lines` records dropped because they could not be parsed.
    pub dirty_lines: Vec<DirtyLine>,
    /// Every dropped record, including those past the log cap.
    pub dirty_count: usize,
}

/// Read every row of `reader` into memory, one [`RawColumn`] per header.
///
/// Dirty records are skipped and logged up to `config.max_dirty_lines`.
/// Values past the header width are ignored and short rows leave the
/// trailing columns shorter.
pub fn load_columns<R>(
    reader: R,
    config: &ProfilerConfig,
    token: &CancellationToken,
) -> Result<LoadedColumns>
where
    R: Read + Send + 'static,
{
    let pool = Arc::new(RowPool::new());
    let source = open_rows(reader, config, Arc::clone(&pool))?;

    let mut columns: Vec<RawColumn> = source
        .description
        .headers
        .iter()
        .map(|name| RawColumn::new(name.clone(), Vec::new()))
        .collect();
    let mut dirty_lines = Vec::new();
    let mut dirty_count = 0usize;

    for event in source.rows {
        if token.is_cancelled() {
            return Err(ProfilerError::Cancelled);
        }
        match event {
            RowEvent::Row { mut values, .. } => {
                for (column, value) in columns.iter_mut().zip(values.drain(..)) {
                    column.values.push(value);
                }
                pool.put(values);
            }
            RowEvent::Dirty {
                line_number,
                reason,
            } => {
                dirty_count += 1;
                warn!(line = line_number, %reason, "Skipping dirty line");
                if dirty_lines.len() < config.max_dirty_lines {
                    dirty_lines.push(DirtyLine {
                        line: line_number,
                        reason,
                    });
                }
            }
        }
    }

    info!(
        columns = columns.len(),
        rows = columns.iter().map(|c| c.values.len()).max().unwrap_or(0),
        dirty_count,
        "Structure loaded"
    );

    Ok(LoadedColumns {
        description: source.description,
        columns,
        dirty_lines,
        dirty_count,
    })
}

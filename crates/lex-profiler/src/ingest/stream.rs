//! Format dispatch and the reader thread feeding the aggregation loop.
//!
//! [`open_rows`] turns a raw upload into a header plus a synchronous row
//! iterator. [`spawn_reader`] moves that iterator onto a dedicated OS thread
//! which pushes events, in file order, into a bounded tokio channel.

use crate::config::ProfilerConfig;
use crate::error::{ProfilerError, Result, ResultExt};
use crate::ingest::csv_rows::CsvRows;
use crate::ingest::encoding::{DetectedEncoding, normalize_encoding, read_prefix, rejoin};
use crate::ingest::jsonl_rows::JsonlRows;
use crate::ingest::pool::RowPool;
use crate::ingest::sniff::{InputFormat, detect_separator, sniff_format};
use crate::pipeline::progress::CancellationToken;
use crate::types::RowEvent;
use std::io::{BufReader, Read};
use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Name of the thread that parses the upload.
pub const READER_THREAD_NAME: &str = "lex-profiler-reader";

/// Boxed row iterator that can be moved to the reader thread.
pub type RowIter = Box<dyn Iterator<Item = RowEvent> + Send>;

/// What was detected about an upload before its first row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDescription {
    pub headers: Vec<String>,
    pub format: InputFormat,
    pub encoding: DetectedEncoding,
    /// Delimiter for CSV input, `None` for JSONL.
    pub separator: Option<u8>,
}

/// An opened upload whose rows have not been read yet.
pub struct RowSource {
    pub description: InputDescription,
    pub rows: RowIter,
    pub pool: Arc<RowPool>,
}

/// An upload being parsed on the reader thread.
pub struct RowStream {
    pub description: InputDescription,
    /// Row events in file order. Closed when the input ends, the run is
    /// cancelled or the reader fails.
    pub events: mpsc::Receiver<RowEvent>,
    /// Pool the row buffers come from; return them with [`RowPool::put`].
    pub pool: Arc<RowPool>,
}

impl RowStream {
    pub fn headers(&self) -> &[String] {
        &self.description.headers
    }
}

/// Detect encoding, format and delimiter, read the header and return the
/// remaining rows as an iterator.
pub fn open_rows<R>(reader: R, config: &ProfilerConfig, pool: Arc<RowPool>) -> Result<RowSource>
where
    R: Read + Send + 'static,
{
    let (mut decoded, encoding) = normalize_encoding(reader, config.sniff_size)?;
    let prefix = read_prefix(&mut decoded, config.sniff_size).context("Reading format sample")?;

    let format = sniff_format(&prefix);
    let (headers, rows, separator): (Vec<String>, RowIter, Option<u8>) = match format {
        InputFormat::Csv => {
            let separator = detect_separator(&prefix);
            let input = rejoin(prefix, decoded);
            let (headers, rows) = CsvRows::open(input, separator, Arc::clone(&pool))?;
            (headers, Box::new(rows), Some(separator))
        }
        InputFormat::Jsonl => {
            let input = BufReader::new(rejoin(prefix, decoded));
            let (headers, rows) =
                JsonlRows::open(input, config.max_json_line_bytes, Arc::clone(&pool))?;
            (headers, Box::new(rows), None)
        }
    };

    Ok(RowSource {
        description: InputDescription {
            headers,
            format,
            encoding,
            separator,
        },
        rows,
        pool,
    })
}

/// Move the row iterator of `source` onto the reader thread.
///
/// The thread stops within one row when `token` is cancelled and as soon as
/// the receiver is dropped. Backpressure comes from the channel capacity.
pub fn spawn_reader(
    source: RowSource,
    queue_capacity: usize,
    token: CancellationToken,
) -> Result<RowStream> {
    let (tx, rx) = mpsc::channel(queue_capacity.max(1));
    let RowSource {
        description,
        rows,
        pool,
    } = source;
    let thread_pool = Arc::clone(&pool);

    thread::Builder::new()
        .name(READER_THREAD_NAME.to_string())
        .spawn(move || produce(rows, tx, token, thread_pool))
        .map_err(|e| ProfilerError::Internal(format!("failed to spawn reader thread: {e}")))?;

    Ok(RowStream {
        description,
        events: rx,
        pool,
    })
}

fn produce(
    rows: RowIter,
    tx: mpsc::Sender<RowEvent>,
    token: CancellationToken,
    pool: Arc<RowPool>,
) {
    let mut sent = 0u64;
    for event in rows {
        if token.is_cancelled() {
            warn!(sent, "Reader cancelled");
            recycle(&pool, event);
            return;
        }
        if let Err(mpsc::error::SendError(event)) = tx.blocking_send(event) {
            debug!(sent, "Consumer went away, stopping reader");
            recycle(&pool, event);
            return;
        }
        sent += 1;
    }
    info!(sent, "Reader finished");
}

fn recycle(pool: &RowPool, event: RowEvent) {
    if let RowEvent::Row { values, .. } = event {
        pool.put(values);
    }
}

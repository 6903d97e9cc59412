//! Delimited-text row parser with per-record recovery.

use crate::error::{ProfilerError, Result};
use crate::ingest::pool::RowPool;
use crate::types::RowEvent;
use csv::{ByteRecord, Reader, ReaderBuilder};
use std::io::Read;
use std::sync::Arc;
use tracing::{info, warn};

/// Iterator over the data records of a CSV stream.
///
/// Records whose field count differs from the header become
/// [`RowEvent::Dirty`] and parsing resumes on the next line. An I/O error
/// yields one dirty event and ends the sequence.
pub struct CsvRows<R> {
    reader: Reader<R>,
    record: ByteRecord,
    expected_fields: usize,
    pool: Arc<RowPool>,
    records_read: u64,
    dirty: u64,
    done: bool,
}

impl<R: Read> CsvRows<R> {
    /// Read the header record and return it with an iterator over the rest.
    ///
    /// Quotes are handled leniently and records may have any length; length
    /// mismatches are reported per record instead of failing the run.
    pub fn open(input: R, separator: u8, pool: Arc<RowPool>) -> Result<(Vec<String>, Self)> {
        let mut reader = ReaderBuilder::new()
            .delimiter(separator)
            .has_headers(false)
            .flexible(true)
            .from_reader(input);

        let mut record = ByteRecord::new();
        let found = reader
            .read_byte_record(&mut record)
            .map_err(|e| ProfilerError::InvalidHeader(e.to_string()))?;
        if !found {
            return Err(ProfilerError::EmptyInput);
        }

        let headers: Vec<String> = record
            .iter()
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect();
        info!(columns = headers.len(), headers = ?headers, "CSV header read");

        let rows = Self {
            reader,
            record,
            expected_fields: headers.len(),
            pool,
            records_read: 1,
            dirty: 0,
            done: false,
        };
        Ok((headers, rows))
    }

    fn finish(&mut self) {
        self.done = true;
        info!(
            records = self.records_read.saturating_sub(1),
            dirty = self.dirty,
            "CSV streaming finished"
        );
    }
}

impl<R: Read> Iterator for CsvRows<R> {
    type Item = RowEvent;

    fn next(&mut self) -> Option<RowEvent> {
        if self.done {
            return None;
        }

        match self.reader.read_byte_record(&mut self.record) {
            Ok(false) => {
                self.finish();
                None
            }
            Ok(true) => {
                self.records_read += 1;
                let line_number = self
                    .record
                    .position()
                    .map_or(self.records_read, |p| p.line());

                if self.record.len() != self.expected_fields {
                    self.dirty += 1;
                    return Some(RowEvent::Dirty {
                        line_number,
                        reason: format!("record on line {line_number}: wrong number of fields"),
                    });
                }

                let mut values = self.pool.get();
                values.extend(
                    self.record
                        .iter()
                        .map(|field| String::from_utf8_lossy(field).into_owned()),
                );
                Some(RowEvent::Row {
                    line_number,
                    values,
                })
            }
            Err(e) => {
                let line_number = e
                    .position()
                    .map_or(self.records_read + 1, |p| p.line());
                warn!(line = line_number, error = %e, "CSV read failed, ending stream");
                self.dirty += 1;
                self.finish();
                Some(RowEvent::Dirty {
                    line_number,
                    reason: format!("I/O error: {e}"),
                })
            }
        }
    }
}

//! Line-delimited JSON row parser.
//!
//! The first non-empty line fixes the schema: its keys, sorted, become the
//! header. Later lines are projected onto that header by key.

use crate::error::{ProfilerError, Result};
use crate::ingest::pool::RowPool;
use crate::types::RowEvent;
use serde_json::{Map, Value};
use std::io::{self, BufRead};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of reading one physical line.
enum Line {
    Text,
    TooLong(usize),
    Eof,
}

/// Iterator over the rows of a JSONL stream.
pub struct JsonlRows<R> {
    reader: R,
    headers: Vec<String>,
    first: Option<(u64, Map<String, Value>)>,
    line: Vec<u8>,
    line_number: u64,
    max_line_bytes: usize,
    pool: Arc<RowPool>,
    dirty: u64,
    done: bool,
}

impl<R: BufRead> JsonlRows<R> {
    /// Infer the header from the first non-empty line.
    ///
    /// Fails with [`ProfilerError::InvalidJsonSchema`] when that line is not
    /// a JSON object and with [`ProfilerError::EmptyInput`] when there is no
    /// such line.
    pub fn open(reader: R, max_line_bytes: usize, pool: Arc<RowPool>) -> Result<(Vec<String>, Self)> {
        let mut rows = Self {
            reader,
            headers: Vec::new(),
            first: None,
            line: Vec::new(),
            line_number: 0,
            max_line_bytes,
            pool,
            dirty: 0,
            done: false,
        };

        let first = loop {
            match rows.read_line()? {
                Line::Eof => return Err(ProfilerError::EmptyInput),
                Line::TooLong(len) => {
                    return Err(ProfilerError::InvalidJsonSchema(format!(
                        "first line is {len} bytes, limit is {max_line_bytes}"
                    )));
                }
                Line::Text if is_blank(&rows.line) => continue,
                Line::Text => break parse_object(&rows.line).map_err(ProfilerError::InvalidJsonSchema)?,
            }
        };

        let mut headers: Vec<String> = first.keys().cloned().collect();
        headers.sort();
        info!(headers = ?headers, "JSONL schema inferred");

        rows.headers = headers.clone();
        rows.first = Some((rows.line_number, first));
        Ok((headers, rows))
    }

    /// Read the next physical line into `self.line`, without its terminator.
    ///
    /// Bytes past `max_line_bytes` are discarded up to the next newline.
    fn read_line(&mut self) -> io::Result<Line> {
        self.line.clear();
        let mut total = 0usize;
        let mut saw_any = false;

        loop {
            let available = self.reader.fill_buf()?;
            if available.is_empty() {
                break;
            }
            saw_any = true;

            let (chunk, found_newline) = match available.iter().position(|&b| b == b'\n') {
                Some(pos) => (&available[..pos], true),
                None => (available, false),
            };
            total += chunk.len();
            if total <= self.max_line_bytes {
                self.line.extend_from_slice(chunk);
            }
            let consumed = chunk.len() + usize::from(found_newline);
            self.reader.consume(consumed);
            if found_newline {
                break;
            }
        }

        if !saw_any {
            return Ok(Line::Eof);
        }
        self.line_number += 1;
        if total > self.max_line_bytes {
            self.line.clear();
            return Ok(Line::TooLong(total));
        }
        if self.line.last() == Some(&b'\r') {
            self.line.pop();
        }
        Ok(Line::Text)
    }

    fn project(&self, map: &Map<String, Value>) -> Vec<String> {
        let mut values = self.pool.get();
        values.extend(self.headers.iter().map(|h| stringify(map.get(h))));
        values
    }

    fn finish(&mut self) {
        self.done = true;
        info!(lines = self.line_number, dirty = self.dirty, "JSONL streaming finished");
    }
}

impl<R: BufRead> Iterator for JsonlRows<R> {
    type Item = RowEvent;

    fn next(&mut self) -> Option<RowEvent> {
        if let Some((line_number, first)) = self.first.take() {
            let values = self.project(&first);
            return Some(RowEvent::Row {
                line_number,
                values,
            });
        }
        if self.done {
            return None;
        }

        loop {
            match self.read_line() {
                Ok(Line::Eof) => {
                    self.finish();
                    return None;
                }
                Ok(Line::TooLong(len)) => {
                    self.dirty += 1;
                    return Some(RowEvent::Dirty {
                        line_number: self.line_number,
                        reason: format!(
                            "line exceeds {} bytes ({len} bytes)",
                            self.max_line_bytes
                        ),
                    });
                }
                Ok(Line::Text) if is_blank(&self.line) => continue,
                Ok(Line::Text) => {
                    return Some(match parse_object(&self.line) {
                        Ok(map) => RowEvent::Row {
                            line_number: self.line_number,
                            values: self.project(&map),
                        },
                        Err(reason) => {
                            self.dirty += 1;
                            RowEvent::Dirty {
                                line_number: self.line_number,
                                reason: format!("malformed JSON: {reason}"),
                            }
                        }
                    });
                }
                Err(e) => {
                    let line_number = self.line_number + 1;
                    warn!(line = line_number, error = %e, "JSONL read failed, ending stream");
                    self.dirty += 1;
                    self.finish();
                    return Some(RowEvent::Dirty {
                        line_number,
                        reason: format!("I/O error: {e}"),
                    });
                }
            }
        }
    }
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(|b| b.is_ascii_whitespace())
}

fn parse_object(line: &[u8]) -> std::result::Result<Map<String, Value>, String> {
    match serde_json::from_slice::<Value>(line) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("expected a JSON object".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// Render a JSON value as a cell.
///
/// Missing and `null` become `""`, strings are taken verbatim and every
/// other value uses its compact JSON text. Floats with an integral value
/// below 1e21 drop the fraction, so `1.0` and `1` read the same.
pub fn stringify(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{f:.0}"),
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}

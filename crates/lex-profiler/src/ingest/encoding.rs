//! Character-encoding normalization.
//!
//! Every upload is turned into a UTF-8 byte stream before parsing. UTF-16 is
//! recognized by its byte-order mark; anything else is checked against a
//! bounded sample and, if it is not valid UTF-8, decoded as Windows-1252.

use crate::error::{Result, ResultExt};
use encoding_rs::{CoderResult, Decoder, Encoding, UTF_16BE, UTF_16LE, WINDOWS_1252};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Cursor, Read};
use tracing::{debug, info, warn};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const DECODE_BUFFER_SIZE: usize = 8 * 1024;

/// Source encoding recognized by [`normalize_encoding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectedEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Windows1252,
}

impl fmt::Display for DetectedEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DetectedEncoding::Utf8 => "UTF-8",
            DetectedEncoding::Utf16Le => "UTF-16LE",
            DetectedEncoding::Utf16Be => "UTF-16BE",
            DetectedEncoding::Windows1252 => "Windows-1252",
        })
    }
}

/// A boxed byte stream that can be moved to the reader thread.
pub type BoxedReader = Box<dyn Read + Send>;

/// Read up to `limit` bytes from the front of `reader`.
///
/// Returns fewer bytes only when the stream ends first.
pub(crate) fn read_prefix<R: Read>(reader: &mut R, limit: usize) -> io::Result<Vec<u8>> {
    let mut prefix = Vec::with_capacity(limit);
    reader.by_ref().take(limit as u64).read_to_end(&mut prefix)?;
    Ok(prefix)
}

/// Put a previously read prefix back in front of the rest of the stream.
pub(crate) fn rejoin<R: Read + Send + 'static>(prefix: Vec<u8>, rest: R) -> BoxedReader {
    Box::new(Cursor::new(prefix).chain(rest))
}

/// Wrap `reader` so that it yields UTF-8.
///
/// `sample_size` bytes are inspected to choose between pass-through and the
/// Windows-1252 fallback. A multi-byte sequence cut by the end of a full
/// sample still counts as valid UTF-8. A UTF-8 BOM is stripped.
pub fn normalize_encoding<R>(mut reader: R, sample_size: usize) -> Result<(BoxedReader, DetectedEncoding)>
where
    R: Read + Send + 'static,
{
    let mut prefix =
        read_prefix(&mut reader, sample_size.max(UTF8_BOM.len())).context("Reading encoding sample")?;

    if prefix.starts_with(&[0xFF, 0xFE]) {
        info!(encoding = %DetectedEncoding::Utf16Le, "Encoding detected, transcoding to UTF-8");
        prefix.drain(..2);
        let decoded = DecodingReader::new(rejoin(prefix, reader), UTF_16LE);
        return Ok((Box::new(decoded), DetectedEncoding::Utf16Le));
    }
    if prefix.starts_with(&[0xFE, 0xFF]) {
        info!(encoding = %DetectedEncoding::Utf16Be, "Encoding detected, transcoding to UTF-8");
        prefix.drain(..2);
        let decoded = DecodingReader::new(rejoin(prefix, reader), UTF_16BE);
        return Ok((Box::new(decoded), DetectedEncoding::Utf16Be));
    }
    if prefix.starts_with(&UTF8_BOM) {
        debug!("Stripping UTF-8 byte-order mark");
        prefix.drain(..UTF8_BOM.len());
        info!(encoding = %DetectedEncoding::Utf8, "Encoding detected");
        return Ok((rejoin(prefix, reader), DetectedEncoding::Utf8));
    }

    let sample_full = prefix.len() >= sample_size;
    let sample = &prefix[..prefix.len().min(sample_size)];
    if is_utf8_sample(sample, sample_full) {
        info!(encoding = %DetectedEncoding::Utf8, "Encoding detected");
        return Ok((rejoin(prefix, reader), DetectedEncoding::Utf8));
    }

    warn!(
        "Invalid UTF-8 in sample, falling back to {}",
        DetectedEncoding::Windows1252
    );
    let decoded = DecodingReader::new(rejoin(prefix, reader), WINDOWS_1252);
    Ok((Box::new(decoded), DetectedEncoding::Windows1252))
}

/// Validate a sample, tolerating a sequence truncated by the sample boundary.
fn is_utf8_sample(sample: &[u8], truncated: bool) -> bool {
    match std::str::from_utf8(sample) {
        Ok(_) => true,
        // `error_len() == None` means the input ended mid-sequence.
        Err(e) => truncated && e.error_len().is_none(),
    }
}

/// Streaming transcoder from any `encoding_rs` encoding to UTF-8.
pub struct DecodingReader<R> {
    inner: R,
    decoder: Decoder,
    input: Vec<u8>,
    input_pos: usize,
    input_len: usize,
    output: Vec<u8>,
    output_pos: usize,
    output_len: usize,
    eof: bool,
    finished: bool,
}

impl<R: Read> DecodingReader<R> {
    /// The stream must not start with a BOM; callers strip it first.
    pub fn new(inner: R, encoding: &'static Encoding) -> Self {
        Self {
            inner,
            decoder: encoding.new_decoder_without_bom_handling(),
            input: vec![0; DECODE_BUFFER_SIZE],
            input_pos: 0,
            input_len: 0,
            output: vec![0; DECODE_BUFFER_SIZE],
            output_pos: 0,
            output_len: 0,
            eof: false,
            finished: false,
        }
    }
}

impl<R: Read> Read for DecodingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.output_pos < self.output_len {
                let pending = &self.output[self.output_pos..self.output_len];
                let n = pending.len().min(buf.len());
                buf[..n].copy_from_slice(&pending[..n]);
                self.output_pos += n;
                return Ok(n);
            }
            if self.finished {
                return Ok(0);
            }
            if self.input_pos == self.input_len && !self.eof {
                let n = self.inner.read(&mut self.input)?;
                self.input_pos = 0;
                self.input_len = n;
                self.eof = n == 0;
            }

            let (result, read, written, _) = self.decoder.decode_to_utf8(
                &self.input[self.input_pos..self.input_len],
                &mut self.output,
                self.eof,
            );
            self.input_pos += read;
            self.output_pos = 0;
            self.output_len = written;
            if result == CoderResult::InputEmpty && self.eof {
                self.finished = true;
            }
        }
    }
}

//! Ingest module.
//!
//! Turns an arbitrary upload into a header plus an ordered sequence of row
//! events: encoding normalization, format and delimiter sniffing, the CSV and
//! JSONL parsers, and the reader thread that feeds the aggregation loop.

pub mod csv_rows;
pub mod encoding;
pub mod jsonl_rows;
pub mod loader;
pub mod pool;
pub mod sniff;
pub mod stream;

pub use encoding::{DecodingReader, DetectedEncoding, normalize_encoding};
pub use loader::{LoadedColumns, load_columns};
pub use pool::RowPool;
pub use sniff::{InputFormat, detect_separator, sniff_format};
pub use stream::{InputDescription, RowSource, RowStream, open_rows, spawn_reader};

//! Format and delimiter sniffing over a bounded prefix of decoded input.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Delimiter used when the prefix gives no signal.
pub const DEFAULT_SEPARATOR: u8 = b';';

/// Candidate delimiters in preference order. A later candidate only wins
/// with a strictly greater count.
const SEPARATOR_CANDIDATES: [u8; 4] = [b';', b',', b'|', b'\t'];

/// Layout of the upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputFormat {
    /// Delimited text with a header line.
    Csv,
    /// One JSON object per line.
    Jsonl,
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InputFormat::Csv => "CSV",
            InputFormat::Jsonl => "JSONL",
        })
    }
}

/// Decide between CSV and JSONL from the first non-whitespace byte.
pub fn sniff_format(prefix: &[u8]) -> InputFormat {
    let format = match prefix.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') => InputFormat::Jsonl,
        _ => InputFormat::Csv,
    };
    info!(format = %format, "Input format detected");
    format
}

/// Pick the delimiter that occurs most often on the first line of `prefix`.
///
/// Ties go to the earlier candidate in `; , | \t`. An empty first line
/// yields [`DEFAULT_SEPARATOR`].
pub fn detect_separator(prefix: &[u8]) -> u8 {
    let first_line = prefix
        .iter()
        .position(|&b| b == b'\n' || b == b'\r')
        .map_or(prefix, |end| &prefix[..end]);

    if first_line.is_empty() {
        warn!(
            fallback = %separator_name(DEFAULT_SEPARATOR),
            "Separator detection had no header to inspect, using fallback"
        );
        return DEFAULT_SEPARATOR;
    }

    let mut best = DEFAULT_SEPARATOR;
    let mut best_count = 0usize;
    for candidate in SEPARATOR_CANDIDATES {
        let count = first_line.iter().filter(|&&b| b == candidate).count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }

    info!(separator = %separator_name(best), count = best_count, "Separator detected");
    best
}

/// Printable name for a delimiter byte.
pub fn separator_name(separator: u8) -> String {
    match separator {
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_format() {
        assert_eq!(sniff_format(b"{\"a\":1}\n"), InputFormat::Jsonl);
        assert_eq!(sniff_format(b"  \n\t{\"a\":1}"), InputFormat::Jsonl);
        assert_eq!(sniff_format(b"a;b\n1;2"), InputFormat::Csv);
        assert_eq!(sniff_format(b"[1,2]"), InputFormat::Csv);
        assert_eq!(sniff_format(b""), InputFormat::Csv);
        assert_eq!(sniff_format(b"   "), InputFormat::Csv);
    }

    #[test]
    fn test_detect_pipe_separator() {
        assert_eq!(detect_separator(b"a|b|c\n1|2|3"), b'|');
    }

    #[test]
    fn test_detect_common_separators() {
        assert_eq!(detect_separator(b"Nome;Idade;Cidade\nJoao;30;Aracaju"), b';');
        assert_eq!(detect_separator(b"id,name,age\r\n1,a,2"), b',');
        assert_eq!(detect_separator(b"id\tname\tage"), b'\t');
    }

    #[test]
    fn test_only_first_line_counts() {
        assert_eq!(detect_separator(b"a;b\n1,2,3,4,5,6"), b';');
    }

    #[test]
    fn test_ties_prefer_earlier_candidates() {
        assert_eq!(detect_separator(b"a;b,c"), b';');
        assert_eq!(detect_separator(b"a,b|c"), b',');
        assert_eq!(detect_separator(b"a|b\tc"), b'|');
    }

    #[test]
    fn test_default_separator() {
        assert_eq!(detect_separator(b""), b';');
        assert_eq!(detect_separator(b"\nabc"), b';');
        assert_eq!(detect_separator(b"single_column"), b';');
    }

    #[test]
    fn test_separator_name() {
        assert_eq!(separator_name(b'\t'), "\\t");
        assert_eq!(separator_name(b';'), ";");
    }
}

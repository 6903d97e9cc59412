//! Shared utilities for the profiling pipeline.
//!
//! This module contains common helper functions used across multiple modules
//! to reduce code duplication and ensure consistency.

use std::path::Path;

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Boolean spellings accepted by the type inferencer (compared lowercase).
pub const BOOLEAN_VALUES: [&str; 4] = ["true", "false", "s", "n"];

/// Check if a string represents a boolean value.
///
/// # Example
///
/// ```rust,ignore
/// use lex_profiler::utils::is_boolean_string;
///
/// assert!(is_boolean_string("TRUE"));
/// assert!(is_boolean_string("s"));
/// assert!(!is_boolean_string("yes"));
/// ```
pub fn is_boolean_string(s: &str) -> bool {
    BOOLEAN_VALUES.iter().any(|v| v.eq_ignore_ascii_case(s))
}

/// Normalize a decimal-comma value by replacing only the first `,` with `.`.
///
/// `"1,5"` becomes `"1.5"`, while `"1,234,5"` becomes `"1.234,5"` and
/// fails to parse later. Values without a comma are borrowed unchanged.
pub fn normalize_decimal(s: &str) -> std::borrow::Cow<'_, str> {
    if s.contains(',') {
        std::borrow::Cow::Owned(s.replacen(',', ".", 1))
    } else {
        std::borrow::Cow::Borrowed(s)
    }
}

/// Parse a numeric string that may use a decimal comma.
///
/// Only finite values are returned.
pub fn parse_decimal(s: &str) -> Option<f64> {
    normalize_decimal(s)
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Check whether `s` consists only of ASCII digits and has exactly `len` of them.
#[inline]
pub fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

/// Case-insensitive substring match of any keyword against a lowercase header.
#[inline]
pub fn header_mentions(header_lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| header_lower.contains(k))
}

// =============================================================================
// Formatting Utilities
// =============================================================================

/// Format a number with exactly two decimal places.
#[inline]
pub fn format_2dp(value: f64) -> String {
    format!("{value:.2}")
}

/// `part / whole`, or `default` when `whole` is zero.
#[inline]
pub fn ratio_or(part: usize, whole: usize, default: f64) -> f64 {
    if whole == 0 {
        default
    } else {
        part as f64 / whole as f64
    }
}

/// Display name for a report: the file name without directory or extension.
///
/// Falls back to the input when it has no stem (e.g. an empty string).
pub fn report_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}

// =============================================================================
// Tests
// =============================================================================

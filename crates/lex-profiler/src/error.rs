//! Custom error types for the profiling pipeline.
//!
//! Only failures that abort a whole run live here. Malformed individual
//! lines are not errors: they travel through the row stream as
//! [`RowEvent::Dirty`](crate::types::RowEvent::Dirty) and end up in the
//! report's dirty-line log.
//!
//! Errors are serializable so an outer transport can forward them to a
//! client as `{code, message}`.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::time::Duration;
use thiserror::Error;

/// The main error type for the profiler.
#[derive(Error, Debug)]
pub enum ProfilerError {
    /// Run was cancelled through its cancellation token.
    #[error("Profiling cancelled")]
    Cancelled,

    /// Run did not finish within the configured time box.
    #[error("Profiling timed out after {0:?}")]
    Timeout(Duration),

    /// Input has no header line at all.
    #[error("Input is empty: no header line found")]
    EmptyInput,

    /// CSV header line could not be parsed.
    #[error("Failed to read header line: {0}")]
    InvalidHeader(String),

    /// First JSONL line is not a JSON object, so no schema can be inferred.
    #[error("First JSONL line is not a valid JSON object: {0}")]
    InvalidJsonSchema(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal error (e.g., reader thread could not be spawned).
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ProfilerError>,
    },
}

impl ProfilerError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ProfilerError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for client-side handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::Timeout(_) => "TIMEOUT",
            Self::EmptyInput => "EMPTY_INPUT",
            Self::InvalidHeader(_) => "INVALID_HEADER",
            Self::InvalidJsonSchema(_) => "INVALID_JSON_SCHEMA",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error represents a caller-triggered cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Check if this error represents an expired time box.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::WithContext { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Suggested HTTP status for a transport sitting in front of the profiler.
    ///
    /// A parse failure before the first row is a server-side 500, a bad
    /// configuration is the caller's 400, and cancellation or timeout is 408.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Cancelled | Self::Timeout(_) => 408,
            Self::InvalidConfig(_) => 400,
            Self::EmptyInput | Self::InvalidHeader(_) | Self::InvalidJsonSchema(_) => 500,
            Self::Internal(_) | Self::Io(_) => 500,
            Self::WithContext { source, .. } => source.http_status(),
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for ProfilerError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ProfilerError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

impl From<crate::config::ConfigValidationError> for ProfilerError {
    fn from(err: crate::config::ConfigValidationError) -> Self {
        ProfilerError::InvalidConfig(err.to_string())
    }
}

/// Result type alias for profiling operations.
pub type Result<T> = std::result::Result<T, ProfilerError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ProfilerError::Io(e).with_context(context))
    }
}

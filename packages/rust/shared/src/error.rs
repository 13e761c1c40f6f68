//! Error types for ConceptLens.
//!
//! Library crates use [`ConceptLensError`] via `thiserror`.
//! The CLI wraps this with `color-eyre`; the HTTP server maps it to a
//! generic JSON failure body.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level error type for all ConceptLens operations.
#[derive(Debug, thiserror::Error)]
pub enum ConceptLensError {
    /// Configuration loading or validation error (including missing credentials).
    #[error("config error: {message}")]
    Config { message: String },

    /// Caller-supplied input was rejected.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The completion service failed and the caller chose not to fail open.
    #[error("completion error: {0}")]
    Completion(#[from] CompletionError),

    /// Response or file content could not be parsed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Unexpected internal failure (task panic, closed channel, ...).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ConceptLensError>;

impl ConceptLensError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Completion service errors
// ---------------------------------------------------------------------------

/// Failure of a single round trip to the generative completion service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    /// Network failure, rate limiting, or a 5xx from the service.
    #[error("transient service error: {0}")]
    Transient(String),

    /// The call did not finish within the configured timeout.
    #[error("completion timed out after {0} ms")]
    Timeout(u64),

    /// Authentication failure or another non-retryable rejection.
    #[error("permanent service error: {0}")]
    Permanent(String),

    /// The service answered, but not in the expected shape.
    #[error("malformed service response: {0}")]
    Malformed(String),
}

impl CompletionError {
    /// Whether a retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_))
    }
}

/// Why a generated field ended up empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Transient errors persisted through every retry.
    Transient,
    /// The service rejected the request outright.
    Permanent,
    /// The response did not conform to the prompt's contract.
    Malformed,
    /// The enrichment task itself crashed.
    Internal,
}

impl From<&CompletionError> for FailureKind {
    fn from(err: &CompletionError) -> Self {
        match err {
            CompletionError::Transient(_) | CompletionError::Timeout(_) => Self::Transient,
            CompletionError::Permanent(_) => Self::Permanent,
            CompletionError::Malformed(_) => Self::Malformed,
        }
    }
}

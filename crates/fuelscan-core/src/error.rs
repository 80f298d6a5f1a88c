//! Error types for fuelscan.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Store and configuration errors.
///
/// Extraction failures are not represented here; see [`ExtractionError`].
#[derive(Error, Debug)]
pub enum Error {
    /// A claim, write or read against PostgreSQL failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected request, such as a blank enqueue or an empty review patch.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Missing or malformed environment configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request error: {0}")]
    Request(String),

    /// Poisoned lock or another broken in-process invariant.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

/// Failure of a single extraction attempt.
///
/// Every variant is recoverable: the scheduler converts it into a FAILED job
/// with backoff rather than propagating it to the trigger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The extraction call did not finish within the configured timeout.
    #[error("extraction timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// The upstream service (image host or vision API) answered with a
    /// non-success status, or could not be reached at all (`status` is None).
    #[error("upstream error{}: {message}", status_suffix(.status))]
    Upstream { status: Option<u16>, message: String },

    /// The response carried no rows and no element number.
    #[error("extraction returned an empty response")]
    EmptyResponse,

    /// The response did not decode against the expected schema.
    #[error("failed to parse extraction response: {0}")]
    Parse(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

impl ExtractionError {
    /// Stable snake_case label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionError::Timeout { .. } => "timeout",
            ExtractionError::Upstream { .. } => "upstream_error",
            ExtractionError::EmptyResponse => "empty_response",
            ExtractionError::Parse(_) => "parse_error",
        }
    }

    /// Build an upstream error from a transport failure (no HTTP status).
    pub fn transport(message: impl Into<String>) -> Self {
        ExtractionError::Upstream {
            status: None,
            message: message.into(),
        }
    }
}

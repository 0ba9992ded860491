use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors raised while bringing the pipeline up.
///
/// Load failures abort the run and are never retried: a missing adapter
/// or an unreachable inference server is an operator problem, not a
/// transient one.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    /// The inference server could not be reached during connect.
    #[error("Failed to reach inference server at {api_base}: {reason}")]
    Connect { api_base: String, reason: String },

    /// The server is up but does not serve the requested model.
    #[error("Model '{model}' is not served by the inference server")]
    ModelUnavailable { model: String },

    /// An adapter path was given but does not point at an adapter directory.
    #[error("Adapter path does not exist or is not a directory: {0}")]
    AdapterNotFound(PathBuf),

    /// Configuration could not be resolved (e.g. unparseable env override).
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Errors that can occur during a single generation call.
///
/// Transient variants (timeout, rate limit, server errors) are retried by
/// the completion client; whatever survives the retry budget surfaces to
/// the caller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerateError {
    /// Transport-level failure (connection reset, DNS, TLS).
    #[error("HTTP transport error: {0}")]
    Http(String),

    /// Request exceeded the configured timeout.
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// Server returned 429.
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Server returned a non-success status.
    #[error("Server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Completion arrived but carried no text.
    #[error("No content in completion response")]
    NoContent,

    /// The request was rejected before being sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

impl GenerateError {
    /// Check if this error is retryable.
    ///
    /// Returns `true` for transient failures that may succeed on retry:
    /// timeouts, rate limits, transport hiccups and 5xx responses.
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerateError::Timeout(_) => true,
            GenerateError::RateLimit(_) => true,
            GenerateError::Http(_) => true,
            GenerateError::Status { status, .. } => *status >= 500,
            GenerateError::NoContent => false,
            GenerateError::InvalidRequest(_) => false,
            GenerateError::Other(_) => false,
        }
    }
}

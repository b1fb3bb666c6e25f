//! Question source error types.
//!
//! Defined in `nomenq-core` so the manager can downcast and classify
//! failures from any `QuestionSource` implementation without string
//! matching.

use thiserror::Error;

/// Errors that can occur when requesting questions from a source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The model answered but produced no content.
    #[error("empty response from model")]
    EmptyResponse,

    /// The model's payload could not be parsed into questions.
    #[error("invalid question payload: {0}")]
    InvalidPayload(String),
}

//! Error types.
//!
//! `EvalError` is what callers of the engine see. `ProviderError` describes
//! transport-level failures of a model backend; it lives here so the
//! model-assisted adapter can downcast and classify backend errors for retry
//! decisions without string matching.

use thiserror::Error;

/// Caller-facing errors produced by the scoring engine.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The task identifier is not in the catalog.
    #[error("unknown task id: {0}")]
    UnknownTask(String),

    /// A required field is missing or malformed.
    #[error("invalid submission: {0}")]
    Validation(String),

    /// The model backend failed or returned content that does not match the
    /// expected shape. Detail is logged, never carried to the caller.
    #[error("evaluation failed")]
    EvaluationBackend,

    /// The model backend answered with no content.
    #[error("evaluation failed: empty model response")]
    EmptyResponse,

    /// A referenced session or submission does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The session or submission store failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl EvalError {
    /// HTTP status equivalent, for callers that expose the engine over HTTP.
    pub fn http_status(&self) -> u16 {
        match self {
            EvalError::UnknownTask(_) | EvalError::Validation(_) => 400,
            EvalError::NotFound(_) => 404,
            EvalError::EvaluationBackend | EvalError::EmptyResponse => 502,
            EvalError::Storage(_) => 500,
        }
    }

    /// Returns `true` for errors caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status())
    }
}

/// Errors that can occur when talking to a model backend.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// No API key was configured.
    #[error("no API key configured for {0}")]
    MissingCredentials(String),

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
}

impl ProviderError {
    /// Returns `true` if a second attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::RateLimited { .. }
            | ProviderError::Timeout(_)
            | ProviderError::NetworkError(_) => true,
            ProviderError::ApiError { status, .. } => *status >= 500,
            ProviderError::AuthenticationFailed(_)
            | ProviderError::MissingCredentials(_)
            | ProviderError::ModelNotFound(_) => false,
        }
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

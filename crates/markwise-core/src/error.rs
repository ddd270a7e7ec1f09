//! Error types for evaluation and external judgment.
//!
//! `JudgeError` lives here rather than in `markwise-judges` so the batch
//! runner can downcast and classify failures for retry decisions without
//! string matching.

use thiserror::Error;

/// Errors that can occur when talking to an external judgment service.
#[derive(Debug, Error)]
pub enum JudgeError {
    /// The service returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The service returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The service answered, but not with a usable verdict.
    #[error("malformed verdict: {0}")]
    MalformedVerdict(String),
}

impl JudgeError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            JudgeError::AuthenticationFailed(_) | JudgeError::ModelNotFound(_)
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            JudgeError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

/// Errors returned by [`crate::Evaluator::evaluate`].
#[derive(Debug, Error)]
pub enum EvalError {
    /// A required input was missing or unusable.
    #[error("invalid input `{field}`: {reason}")]
    Validation { field: &'static str, reason: String },

    /// The external judgment call failed. No score is produced.
    #[error("external judgment failed: {0:#}")]
    Judge(anyhow::Error),

    /// The judge returned a verdict outside its contract.
    #[error("malformed verdict: {0}")]
    MalformedVerdict(String),
}

impl EvalError {
    /// Returns `true` if re-running the same evaluation could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            EvalError::Validation { .. } => false,
            EvalError::MalformedVerdict(_) => true,
            EvalError::Judge(e) => match e.downcast_ref::<JudgeError>() {
                Some(judge_err) => !judge_err.is_permanent(),
                None => true,
            },
        }
    }

    /// Returns the judge's retry-after hint, if it gave one.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            EvalError::Judge(e) => e
                .downcast_ref::<JudgeError>()
                .and_then(JudgeError::retry_after_ms),
            _ => None,
        }
    }
}

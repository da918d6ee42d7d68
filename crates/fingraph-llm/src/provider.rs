//! LLM Provider trait

use crate::types::{LlmCompletion, LlmRequest};

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

/// LLM error types
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("timed out")]
    Timeout,

    #[error("network error: {0}")]
    NetworkError(reqwest::Error),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else if e.is_decode() {
            LlmError::InvalidResponse(e.to_string())
        } else {
            LlmError::NetworkError(e)
        }
    }
}

/// LLM Provider trait
///
/// One call is one request/response exchange. Providers never retry.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: LlmRequest) -> LlmResult<LlmCompletion>;
}

/// Map a non-success HTTP status to an error. Shared by the HTTP providers.
pub(crate) fn status_error(status: reqwest::StatusCode, body: String, retry_after: Option<u64>) -> LlmError {
    match status.as_u16() {
        401 | 403 => LlmError::AuthFailed(body),
        429 => LlmError::RateLimited {
            retry_after_ms: retry_after.map(|s| s * 1000).unwrap_or(60_000),
        },
        _ => LlmError::RequestFailed(format!("{}: {}", status, body)),
    }
}

/// Parse a `retry-after` header given in whole seconds.
pub(crate) fn retry_after_secs(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

//! Error types for quizforge-llm

use std::time::Duration;
use thiserror::Error;

/// LLM error type
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Provider not configured
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// API error (malformed request, auth failure, ...)
    #[error("api error: {0}")]
    Api(String),

    /// Backend reported throttling
    #[error("rate limit exceeded")]
    RateLimit {
        /// Delay suggested by the backend before retrying, if it sent one
        retry_after: Option<Duration>,
    },

    /// Server error (5xx)
    #[error("server error: {0}")]
    ServerError(String),

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),
}

impl Error {
    /// Rate limit error without a backend hint.
    #[must_use]
    pub fn rate_limited() -> Self {
        Self::RateLimit { retry_after: None }
    }

    /// Rate limit error carrying the backend's suggested delay.
    #[must_use]
    pub fn rate_limited_for(retry_after: Duration) -> Self {
        Self::RateLimit {
            retry_after: Some(retry_after),
        }
    }

    /// Whether this is a rate-limit-class failure.
    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimit { .. })
    }

    /// Backend-suggested retry delay (only set on rate-limit errors).
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimit { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_classification() {
        assert!(Error::rate_limited().is_rate_limit());
        assert!(Error::rate_limited_for(Duration::from_secs(5)).is_rate_limit());
        assert!(!Error::Api("bad request".to_string()).is_rate_limit());
        assert!(!Error::ServerError("HTTP 503".to_string()).is_rate_limit());
    }

    #[test]
    fn test_retry_after_only_on_rate_limit() {
        let err = Error::rate_limited_for(Duration::from_secs(7));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
        assert_eq!(Error::rate_limited().retry_after(), None);
        assert_eq!(Error::Timeout(100).retry_after(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Error::rate_limited().to_string(), "rate limit exceeded");
        assert_eq!(Error::Timeout(250).to_string(), "timeout after 250ms");
    }
}

//! Error types for quizforge-core
//!
//! This module provides the core error type and the translation of
//! operational failures into messages a quiz user can act on.

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Quota pre-check refused the call
    #[error("admission denied: retry after {retry_after_secs}s")]
    AdmissionDenied {
        /// Seconds until the minute window resets
        retry_after_secs: u64,
    },

    /// Backend kept rate limiting until the retry budget ran out
    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Total dispatches made (first attempt included)
        attempts: u32,
        /// Backend's suggested delay on the final failure, in seconds
        retry_after_secs: Option<u64>,
        /// The final rate-limit error
        last_error: quizforge_llm::Error,
    },

    /// Non-retryable backend failure
    #[error("backend error: {0}")]
    Backend(#[from] quizforge_llm::Error),

    /// The request governor is shut down
    #[error("request governor is closed")]
    GovernorClosed,

    /// Invalid configuration
    #[error("invalid configuration: {field}: {message}")]
    InvalidConfig {
        /// Config field name
        field: String,
        /// Detailed message
        message: String,
    },

    /// Caller supplied unusable input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Requested record does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Fallback retry hint when nothing better is known.
const DEFAULT_BUSY_RETRY_SECS: u64 = 60;

impl Error {
    /// Invalid configuration helper
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether the caller should see a "service busy" response.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Error::AdmissionDenied { .. } | Error::RetriesExhausted { .. }
        )
    }

    /// Seconds the caller should wait before retrying, for busy errors.
    #[must_use]
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Error::AdmissionDenied { retry_after_secs } => Some(*retry_after_secs),
            Error::RetriesExhausted {
                retry_after_secs, ..
            } => Some(retry_after_secs.unwrap_or(DEFAULT_BUSY_RETRY_SECS)),
            _ => None,
        }
    }

    /// Message safe to show to an end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Error::AdmissionDenied { .. } | Error::RetriesExhausted { .. } => format!(
                "The quiz service is busy. Please retry after {} seconds.",
                self.retry_after_secs().unwrap_or(DEFAULT_BUSY_RETRY_SECS)
            ),
            Error::Backend(_) | Error::Internal(_) | Error::GovernorClosed => {
                "Something went wrong while processing your request. Please try again.".to_string()
            }
            Error::InvalidConfig { field, message } => {
                format!("Configuration error in '{}': {}", field, message)
            }
            Error::InvalidInput(msg) => msg.clone(),
            Error::NotFound(what) => format!("{} not found", what),
        }
    }
}

#[cfg(test)]
mod tests;

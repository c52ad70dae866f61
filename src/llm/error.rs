//! Completion error types

use std::time::Duration;
use thiserror::Error;

/// Completion error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Timeout, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::ServerError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::InvalidRequest, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Unknown, message)
    }

    /// Classify an HTTP error status from the completion endpoint
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            401 | 403 => LlmErrorKind::Auth,
            400 | 404 | 422 => LlmErrorKind::InvalidRequest,
            408 => LlmErrorKind::Timeout,
            429 => LlmErrorKind::RateLimit,
            500..=599 => LlmErrorKind::ServerError,
            _ => LlmErrorKind::Unknown,
        };
        Self::new(kind, message)
    }
}

/// Error classification for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Connection failures - retryable
    Network,
    /// No response within the per-attempt deadline - retryable
    Timeout,
    /// Rate limited (429) - retryable with backoff
    RateLimit,
    /// Server error (5xx) - retryable
    ServerError,
    /// Authentication failed (401, 403) - not retryable
    Auth,
    /// Malformed request (400) - not retryable
    InvalidRequest,
    /// Unknown error
    Unknown,
}

impl LlmErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::RateLimit | Self::ServerError
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(LlmError::from_status(401, "x").kind, LlmErrorKind::Auth);
        assert_eq!(LlmError::from_status(403, "x").kind, LlmErrorKind::Auth);
        assert_eq!(
            LlmError::from_status(400, "x").kind,
            LlmErrorKind::InvalidRequest
        );
        assert_eq!(LlmError::from_status(408, "x").kind, LlmErrorKind::Timeout);
        assert_eq!(LlmError::from_status(429, "x").kind, LlmErrorKind::RateLimit);
        assert_eq!(
            LlmError::from_status(503, "x").kind,
            LlmErrorKind::ServerError
        );
        assert_eq!(LlmError::from_status(302, "x").kind, LlmErrorKind::Unknown);
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(LlmErrorKind::Network.is_retryable());
        assert!(LlmErrorKind::Timeout.is_retryable());
        assert!(LlmErrorKind::RateLimit.is_retryable());
        assert!(LlmErrorKind::ServerError.is_retryable());
        assert!(!LlmErrorKind::Auth.is_retryable());
        assert!(!LlmErrorKind::InvalidRequest.is_retryable());
        assert!(!LlmErrorKind::Unknown.is_retryable());
    }
}

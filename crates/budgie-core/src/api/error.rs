//! The classified error type every failure is mapped into.

use std::time::Duration;

/// Closed set of failure kinds. Every failure, whatever its origin,
/// lands in exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request was malformed or rejected by validation (400).
    Validation,
    /// Resource does not exist (404).
    NotFound,
    /// Remote quota tripped (429).
    RateLimited,
    /// Credentials missing, invalid, or insufficient (401/403).
    Auth,
    /// Server-side API failure (5xx and unmapped statuses).
    Api,
    /// Request never produced a response (DNS, connect, reset).
    Network,
    /// The call timed out (client deadline or 408).
    Timeout,
    /// Anything that fits nowhere else.
    Unknown,
}

impl ErrorKind {
    /// Stable lowercase name, used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Auth => "auth",
            ErrorKind::Api => "api",
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully classified failure. Immutable once built; one is produced per
/// failed attempt and the orchestrator keeps only the most recent.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    /// Machine-readable code from the API error envelope (e.g. "429.1").
    pub code: Option<String>,
    pub message: String,
    pub status: Option<u16>,
    /// Server-supplied retry hint (Retry-After), already converted to a
    /// duration. Takes precedence over computed backoff.
    pub retry_after: Option<Duration>,
    pub correlation_id: Option<String>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
            status: None,
            retry_after: None,
            correlation_id: None,
            source: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Whether the retry loop may try again. Kind-based, with a status
    /// fallback so unmapped-but-transient statuses still retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::RateLimited | ErrorKind::Network | ErrorKind::Timeout
        ) || matches!(self.status, Some(408 | 429 | 500 | 502 | 503 | 504))
    }

    /// Stable, kind-specific message safe to show to a person. No stack
    /// traces, no transport internals.
    pub fn user_message(&self) -> String {
        match self.kind {
            ErrorKind::Validation => format!("Invalid request: {}", self.message),
            ErrorKind::NotFound => "The requested resource was not found.".to_string(),
            ErrorKind::RateLimited => match self.retry_after {
                Some(d) => format!(
                    "Rate limit reached. Try again in {} seconds.",
                    d.as_secs().max(1)
                ),
                None => "Rate limit reached. Try again shortly.".to_string(),
            },
            ErrorKind::Auth => {
                "Authentication failed. Check that the access token is valid.".to_string()
            }
            ErrorKind::Api => "The budgeting service reported an error. Try again later.".to_string(),
            ErrorKind::Network => "Could not reach the budgeting service. Check your connection.".to_string(),
            ErrorKind::Timeout => "The request timed out. Try again.".to_string(),
            ErrorKind::Unknown => "An unexpected error occurred.".to_string(),
        }
    }
}

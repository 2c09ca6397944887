//! Classify HTTP responses and transport errors into `ApiError`.
//!
//! Classification is an ordered chain of typed matchers, first match
//! wins: structured API error envelope, then status-code map, then
//! transport error shape. Every function here is total — malformed
//! input degrades to a generic classification, never a panic.

use std::time::Duration;

use serde::Deserialize;

use super::{ApiError, ErrorKind};

/// The budgeting service's structured error body:
/// `{"error": {"id": "...", "name": "...", "description": "..."}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    id: Option<String>,
    name: Option<String>,
    description: Option<String>,
}

/// Map an HTTP status code to an error kind.
pub fn kind_from_status(status: u16) -> ErrorKind {
    match status {
        400 => ErrorKind::Validation,
        401 | 403 => ErrorKind::Auth,
        404 => ErrorKind::NotFound,
        408 => ErrorKind::Timeout,
        429 => ErrorKind::RateLimited,
        _ => ErrorKind::Api,
    }
}

/// Map the `name` field of an API error envelope to a kind. The names
/// are not a closed set server-side, so this matches on substrings.
fn kind_from_name(name: &str) -> ErrorKind {
    let name = name.to_ascii_lowercase();
    if name.contains("validation") || name.contains("invalid") {
        ErrorKind::Validation
    } else if name.contains("not_found") {
        ErrorKind::NotFound
    } else if name.contains("rate") || name.contains("limit") {
        ErrorKind::RateLimited
    } else if name.contains("auth") || name.contains("unauthorized") {
        ErrorKind::Auth
    } else {
        ErrorKind::Api
    }
}

fn generic_message(status: u16) -> String {
    match status {
        400 => "request validation failed".to_string(),
        401 | 403 => "authentication failed".to_string(),
        404 => "resource not found".to_string(),
        408 => "request timed out".to_string(),
        429 => "rate limit exceeded".to_string(),
        500 | 502 | 503 | 504 => format!("server error (HTTP {status})"),
        _ => format!("unexpected API response (HTTP {status})"),
    }
}

/// Classify a non-success HTTP response.
///
/// The structured envelope, when the body parses as one, overrides the
/// status-code map: it is more specific about what actually failed.
/// `retry_after_secs` comes from the `Retry-After` header (whole
/// seconds per the API contract).
pub fn classify_response(
    status: u16,
    retry_after_secs: Option<u64>,
    body: &str,
    correlation_id: Option<&str>,
) -> ApiError {
    let mut err = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let detail = envelope.error;
            let kind = detail
                .name
                .as_deref()
                .map(kind_from_name)
                .unwrap_or_else(|| kind_from_status(status));
            let message = detail
                .description
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| generic_message(status));
            let mut err = ApiError::new(kind, message).with_status(status);
            if let Some(id) = detail.id {
                err = err.with_code(id);
            }
            err
        }
        Err(_) => ApiError::new(kind_from_status(status), generic_message(status)).with_status(status),
    };

    if let Some(secs) = retry_after_secs {
        err = err.with_retry_after(Duration::from_secs(secs));
    }
    if let Some(id) = correlation_id {
        err = err.with_correlation_id(id);
    }
    err
}

/// Classify a transport-level failure (no HTTP response was produced,
/// or the exchange died mid-flight).
pub fn classify_transport(err: reqwest::Error, correlation_id: Option<&str>) -> ApiError {
    let classified = if err.is_timeout() {
        ApiError::new(ErrorKind::Timeout, "request timed out").with_source(err)
    } else if err.is_connect() || err.is_request() || err.is_body() {
        ApiError::new(ErrorKind::Network, format!("network error: {err}")).with_source(err)
    } else if err.to_string().to_ascii_lowercase().contains("timeout") {
        ApiError::new(ErrorKind::Timeout, "request timed out").with_source(err)
    } else {
        ApiError::new(ErrorKind::Unknown, format!("unexpected error: {err}")).with_source(err)
    };
    match correlation_id {
        Some(id) => classified.with_correlation_id(id),
        None => classified,
    }
}

/// Parse a `Retry-After` header value. The API sends whole seconds;
/// anything else (HTTP-date form, garbage) is ignored.
pub fn parse_retry_after(value: Option<&str>) -> Option<u64> {
    value.and_then(|v| v.trim().parse::<u64>().ok())
}

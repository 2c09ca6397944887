//! Quota-aware, retrying HTTP client for the budgeting service API.
//!
//! One `Client` owns the reqwest connection pool, the token bucket, and
//! the default retry policy. Every request flows through `execute`:
//! acquire a permit, issue the call, classify any failure, and either
//! retry (backoff or server hint) or surface the classified error.
//! Callers never see a raw transport error.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::RETRY_AFTER;
pub use reqwest::Method;
use serde_json::Value;
use url::Url;

use crate::api::classify::{classify_response, classify_transport, parse_retry_after};
use crate::api::{ApiError, ErrorKind};
use crate::config::BudgieConfig;
use crate::quota::{QuotaError, QuotaStatus, TokenBucket};
use crate::retry::{RetryDecision, RetryPolicy};

/// Per-call knobs; everything unset falls back to the client defaults.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Per-attempt timeout override.
    pub timeout: Option<Duration>,
    /// Retry policy override for this call only.
    pub retry_policy: Option<RetryPolicy>,
    /// Skip the token bucket (health probes, quota introspection).
    pub bypass_quota: bool,
    /// Extra headers for this call.
    pub headers: Vec<(String, String)>,
}

/// Client for the budgeting service API.
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    access_token: Option<String>,
    bucket: Arc<TokenBucket>,
    policy: RetryPolicy,
    timeout: Duration,
}

impl Client {
    /// Build a client from config. The token bucket is created here and
    /// lives exactly as long as the client.
    pub fn new(cfg: &BudgieConfig) -> Result<Self> {
        let mut base = cfg.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .with_context(|| format!("invalid base_url {:?}", cfg.base_url))?;
        let http = reqwest::Client::builder()
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            http,
            base_url,
            access_token: cfg.access_token(),
            bucket: Arc::new(TokenBucket::new(cfg.quota)),
            policy: cfg.retry_policy(),
            timeout: Duration::from_secs(cfg.request_timeout_secs.max(1)),
        })
    }

    /// Current bucket state, for monitoring/health endpoints.
    pub async fn quota_status(&self) -> QuotaStatus {
        self.bucket.status().await
    }

    /// Refill the bucket to capacity (test harnesses).
    pub async fn reset_quota(&self) {
        self.bucket.reset().await;
    }

    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.execute(Method::GET, path, None, RequestOptions::default()).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.execute(Method::POST, path, Some(body), RequestOptions::default()).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.execute(Method::PUT, path, Some(body), RequestOptions::default()).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.execute(Method::PATCH, path, Some(body), RequestOptions::default()).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.execute(Method::DELETE, path, None, RequestOptions::default()).await
    }

    /// Issue one logical request: permit, attempt, classify, retry.
    ///
    /// Returns the parsed JSON payload on 2xx, or the classified error
    /// from the final attempt once retries are exhausted or the failure
    /// is not retryable.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        let url = self.url_for(path)?;
        let policy = options.retry_policy.as_ref().unwrap_or(&self.policy);
        let timeout = options.timeout.unwrap_or(self.timeout);
        // One correlation id per logical request, shared by all attempts.
        let correlation_id = format!("{:016x}", rand::random::<u64>());

        let mut attempt: u32 = 1;
        loop {
            if !options.bypass_quota {
                self.bucket
                    .acquire(1)
                    .await
                    .map_err(|e| quota_failure(e, &correlation_id))?;
            }

            let error = match self.attempt(&method, &url, body, timeout, &options, &correlation_id).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            match policy.decide(attempt, &error) {
                RetryDecision::NoRetry => {
                    tracing::debug!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        error_kind = %error.kind,
                        method = %method,
                        path,
                        correlation_id = %correlation_id,
                        "request failed, not retrying"
                    );
                    return Err(error);
                }
                RetryDecision::RetryAfter(delay) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error_kind = %error.kind,
                        method = %method,
                        path,
                        correlation_id = %correlation_id,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// One attempt: send, then turn any non-2xx outcome into `ApiError`.
    async fn attempt(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&Value>,
        timeout: Duration,
        options: &RequestOptions,
        correlation_id: &str,
    ) -> Result<Value, ApiError> {
        let mut req = self.http.request(method.clone(), url.clone()).timeout(timeout);
        if let Some(token) = &self.access_token {
            req = req.bearer_auth(token);
        }
        for (name, value) in &options.headers {
            req = req.header(name, value);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| classify_transport(e, Some(correlation_id)))?;

        let status = resp.status();
        if status.is_success() {
            let text = resp
                .text()
                .await
                .map_err(|e| classify_transport(e, Some(correlation_id)))?;
            if text.is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&text).map_err(|e| {
                ApiError::new(ErrorKind::Unknown, "response was not valid JSON")
                    .with_status(status.as_u16())
                    .with_correlation_id(correlation_id)
                    .with_source(e)
            });
        }

        let retry_after = parse_retry_after(
            resp.headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
        );
        let body_text = resp.text().await.unwrap_or_default();
        Err(classify_response(
            status.as_u16(),
            retry_after,
            &body_text,
            Some(correlation_id),
        ))
    }

    fn url_for(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| {
                ApiError::new(ErrorKind::Validation, format!("invalid request path {path:?}"))
                    .with_source(e)
            })
    }
}

/// Bucket failures are local programmer/contention errors, never
/// retried and never disguised as remote API failures.
fn quota_failure(err: QuotaError, correlation_id: &str) -> ApiError {
    ApiError::new(ErrorKind::Unknown, err.to_string())
        .with_correlation_id(correlation_id)
        .with_source(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_base(base: &str) -> Client {
        let cfg = BudgieConfig {
            base_url: base.to_string(),
            ..BudgieConfig::default()
        };
        Client::new(&cfg).unwrap()
    }

    #[test]
    fn base_url_join_keeps_version_prefix() {
        let c = client_with_base("https://budget.test/v1");
        assert_eq!(
            c.url_for("budgets").unwrap().as_str(),
            "https://budget.test/v1/budgets"
        );
        // A leading slash must not escape the /v1 prefix.
        assert_eq!(
            c.url_for("/budgets/123/months").unwrap().as_str(),
            "https://budget.test/v1/budgets/123/months"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let cfg = BudgieConfig {
            base_url: "not a url".to_string(),
            ..BudgieConfig::default()
        };
        assert!(Client::new(&cfg).is_err());
    }

    #[test]
    fn quota_failure_is_not_retryable() {
        let err = quota_failure(
            QuotaError::ExceedsCapacity {
                requested: 500,
                capacity: 200,
            },
            "cid",
        );
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert!(!err.is_retryable());
        assert_eq!(err.correlation_id.as_deref(), Some("cid"));
    }
}

//! `budgie request` – issue one API call through the resilient client.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use budgie_core::client::{Client, Method, RequestOptions};

pub async fn run_request(
    client: &Client,
    method: &str,
    path: &str,
    body: Option<&str>,
    bypass_quota: bool,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let method: Method = method
        .to_ascii_uppercase()
        .parse()
        .with_context(|| format!("invalid HTTP method {method:?}"))?;
    let body: Option<serde_json::Value> = body
        .map(serde_json::from_str)
        .transpose()
        .context("request body is not valid JSON")?;

    let options = RequestOptions {
        timeout: timeout_secs.map(Duration::from_secs),
        bypass_quota,
        ..RequestOptions::default()
    };

    match client.execute(method, path, body.as_ref(), options).await {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(err) => {
            tracing::debug!(error = %err, kind = %err.kind, "request failed");
            bail!("{}", err.user_message());
        }
    }
}

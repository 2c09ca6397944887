use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::quota::QuotaConfig;
use crate::retry::RetryPolicy;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per request (including the first).
    pub max_attempts: u32,
    /// Delay in seconds before the first retry (e.g. 0.5 = 500ms).
    pub initial_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
    /// Growth factor applied per attempt.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_secs: 1.0,
            max_delay_secs: 30,
            backoff_multiplier: 2.0,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        RetryPolicy {
            max_attempts: cfg.max_attempts.max(1),
            initial_delay: Duration::from_secs_f64(cfg.initial_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(cfg.max_delay_secs),
            backoff_multiplier: cfg.backoff_multiplier,
            ..RetryPolicy::default()
        }
    }
}

/// Global configuration loaded from `~/.config/budgie/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgieConfig {
    /// Base URL of the budgeting service API.
    pub base_url: String,
    /// Personal access token. `BUDGIE_ACCESS_TOKEN` overrides this.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Request timeout in seconds for a single attempt.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Quota (token bucket) parameters; defaults to the service's
    /// published limit when missing.
    #[serde(default)]
    pub quota: QuotaConfig,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for BudgieConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.budgetservice.example/v1".to_string(),
            access_token: None,
            request_timeout_secs: default_timeout_secs(),
            quota: QuotaConfig::default(),
            retry: None,
        }
    }
}

impl BudgieConfig {
    /// Effective access token: environment wins over the config file.
    pub fn access_token(&self) -> Option<String> {
        std::env::var("BUDGIE_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.access_token.clone())
    }

    /// Effective retry policy (config section or built-in defaults).
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
            .as_ref()
            .map(RetryPolicy::from)
            .unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("budgie")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<BudgieConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = BudgieConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: BudgieConfig = toml::from_str(&data)?;
    Ok(cfg)
}

//! `budgie config` – print the effective configuration.

use anyhow::Result;
use budgie_core::config::{config_path, BudgieConfig};

pub fn run_config(cfg: &BudgieConfig) -> Result<()> {
    println!("config file: {}", config_path()?.display());
    println!("base_url: {}", cfg.base_url);
    println!(
        "access_token: {}",
        if cfg.access_token().is_some() { "(set)" } else { "(not set)" }
    );
    println!("request_timeout_secs: {}", cfg.request_timeout_secs);
    println!(
        "quota: {} permits / {}s window",
        cfg.quota.capacity, cfg.quota.window_secs
    );
    let policy = cfg.retry_policy();
    println!(
        "retry: {} attempts, {}ms initial, {}s max, x{} backoff",
        policy.max_attempts,
        policy.initial_delay.as_millis(),
        policy.max_delay.as_secs(),
        policy.backoff_multiplier
    );
    Ok(())
}

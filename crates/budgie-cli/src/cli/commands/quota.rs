//! `budgie quota` – show the local token bucket state.

use anyhow::Result;
use budgie_core::client::Client;

pub async fn run_quota(client: &Client) -> Result<()> {
    let status = client.quota_status().await;
    println!("{:<12} {:<12} {:<12} {}", "AVAILABLE", "CAPACITY", "WINDOW", "NEXT PERMIT");
    println!(
        "{:<12} {:<12} {:<12} {}",
        status.available,
        status.capacity,
        format!("{}s", status.window_ms / 1000),
        if status.time_until_next_permit_ms == 0 {
            "now".to_string()
        } else {
            format!("in {:.1}s", status.time_until_next_permit_ms as f64 / 1000.0)
        }
    );
    Ok(())
}

//! CLI for the budgie budgeting service client.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use budgie_core::client::Client;
use budgie_core::config;

use commands::{run_config, run_quota, run_request};

/// Top-level CLI for the budgie client.
#[derive(Debug, Parser)]
#[command(name = "budgie")]
#[command(about = "budgie: quota-aware client for the budgeting service API", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Issue a request against the API and print the JSON response.
    Request {
        /// Path relative to the API base URL, e.g. "budgets".
        path: String,
        /// HTTP method (GET, POST, PUT, PATCH, DELETE).
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
        /// JSON request body.
        #[arg(long)]
        body: Option<String>,
        /// Skip the local quota bucket for this call.
        #[arg(long)]
        bypass_quota: bool,
        /// Per-attempt timeout in seconds.
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },

    /// Show the local quota bucket state.
    Quota,

    /// Print the effective configuration and its file path.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config for {}", cfg.base_url);

        match cli.command {
            CliCommand::Request {
                path,
                method,
                body,
                bypass_quota,
                timeout,
            } => {
                let client = Client::new(&cfg)?;
                run_request(&client, &method, &path, body.as_deref(), bypass_quota, timeout).await?;
            }
            CliCommand::Quota => {
                let client = Client::new(&cfg)?;
                run_quota(&client).await?;
            }
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

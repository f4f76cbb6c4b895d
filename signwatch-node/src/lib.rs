pub mod config;
pub mod constants;
pub mod health;
pub mod logging;
pub mod monitor;

use anyhow::{Context, Result};
use std::time::Duration;

/// Shared HTTP client for RPC reads and notifier posts.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(signwatch_rpc::DEFAULT_REQUEST_TIMEOUT_SECS))
        .build()
        .context("Failed to build http client")
}

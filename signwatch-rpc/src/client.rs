//! HTTP client for Tendermint `/block` queries.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{Result, RpcError};
use crate::types::{BlockResponse, BlockSnapshot};

/// Anything that can serve blocks for an endpoint.
///
/// [`RpcGateway`] is the HTTP implementation; the monitor only depends on
/// this trait so it can be driven by other sources.
#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn latest_block(&self, endpoint: &str) -> Result<BlockSnapshot>;

    async fn block_at_height(&self, endpoint: &str, height: u64) -> Result<BlockSnapshot>;
}

/// Fetches blocks over HTTP. Cheap to clone; the underlying client is shared.
#[derive(Debug, Clone)]
pub struct RpcGateway {
    client: Client,
}

impl RpcGateway {
    /// The client's own timeout bounds every call.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get_block(&self, endpoint: &str, height: Option<u64>) -> Result<BlockSnapshot> {
        let url = block_url(endpoint, height);
        log::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RpcError::transport(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::transport(
                endpoint,
                format!("unexpected status {}", status),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RpcError::transport(endpoint, e))?;
        let parsed: BlockResponse =
            serde_json::from_slice(&body).map_err(|e| RpcError::decode(endpoint, e))?;

        if let Some(error) = parsed.error {
            return Err(RpcError::decode(endpoint, format!("rpc error {}", error)));
        }
        let result = parsed
            .result
            .ok_or_else(|| RpcError::decode(endpoint, "missing result"))?;

        BlockSnapshot::try_from(result)
    }
}

#[async_trait]
impl BlockSource for RpcGateway {
    async fn latest_block(&self, endpoint: &str) -> Result<BlockSnapshot> {
        self.get_block(endpoint, None).await
    }

    async fn block_at_height(&self, endpoint: &str, height: u64) -> Result<BlockSnapshot> {
        self.get_block(endpoint, Some(height)).await
    }
}

pub fn block_url(endpoint: &str, height: Option<u64>) -> String {
    let base = endpoint.trim_end_matches('/');
    match height {
        Some(height) => format!("{}/block?height={}", base, height),
        None => format!("{}/block", base),
    }
}

//! Wire format of the `/block` endpoint and the snapshot derived from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RpcError;

/// Body of `GET /block` and `GET /block?height=<h>`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlockResponse {
    pub result: Option<BlockResult>,
    /// JSON-RPC error object some nodes return with a 200 status
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlockResult {
    pub block: Block,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Block {
    pub header: Header,
    pub last_commit: Option<LastCommit>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Header {
    pub chain_id: String,
    pub height: String,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LastCommit {
    #[serde(default)]
    pub signatures: Vec<CommitSig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommitSig {
    /// Null or empty for validators absent from the commit
    pub validator_address: Option<String>,
}

/// One block as seen by the monitor. Fetched per call, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSnapshot {
    pub chain_id: String,
    pub height: u64,
    pub time: DateTime<Utc>,
    /// Addresses present in the last commit, in commit order
    pub signers: Vec<String>,
}

impl BlockSnapshot {
    pub fn signed_by(&self, address: &str) -> bool {
        self.signers.iter().any(|signer| signer == address)
    }
}

impl TryFrom<BlockResult> for BlockSnapshot {
    type Error = RpcError;

    fn try_from(result: BlockResult) -> Result<Self, Self::Error> {
        let Block { header, last_commit } = result.block;
        let height = parse_height(&header.height)?;
        let signers = last_commit
            .unwrap_or_default()
            .signatures
            .into_iter()
            .filter_map(|sig| sig.validator_address)
            .filter(|address| !address.is_empty())
            .collect();

        Ok(BlockSnapshot {
            chain_id: header.chain_id,
            height,
            time: header.time,
            signers,
        })
    }
}

/// Heights travel as decimal strings.
pub fn parse_height(raw: &str) -> Result<u64, RpcError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| RpcError::HeightParse(raw.to_string()))
}

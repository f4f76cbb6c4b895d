//! Endpoint selection with chain identity verification.

use rand::seq::SliceRandom;

use crate::client::BlockSource;
use crate::error::{Result, RpcError};
use crate::types::BlockSnapshot;

/// Latest block from an endpoint that proved it serves the expected chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedBlock {
    pub endpoint: String,
    pub block: BlockSnapshot,
}

/// Try endpoints in random order, without replacement, until one returns a
/// latest block for `expected_chain_id`.
///
/// When every endpoint answered but with the wrong chain id the last
/// [`RpcError::ChainIdentityMismatch`] is returned, so a misconfigured
/// network is distinguishable from one whose nodes are down. Likewise, when
/// every endpoint reported an unparsable height, that [`RpcError::HeightParse`]
/// is returned. Any other exhaustion yields [`RpcError::NoHealthyEndpoint`].
pub async fn fetch_verified_latest<S>(
    source: &S,
    endpoints: &[String],
    expected_chain_id: &str,
) -> Result<VerifiedBlock>
where
    S: BlockSource + ?Sized,
{
    let mut order: Vec<&String> = endpoints.iter().collect();
    order.shuffle(&mut rand::thread_rng());

    let mut mismatch = None;
    let mut mismatches = 0;
    let mut bad_height = None;
    let mut bad_heights = 0;

    for endpoint in order {
        match source.latest_block(endpoint).await {
            Ok(block) if block.chain_id == expected_chain_id => {
                return Ok(VerifiedBlock {
                    endpoint: endpoint.clone(),
                    block,
                });
            }
            Ok(block) => {
                log::warn!(
                    "rpc {} serves chain {}, expected {}",
                    endpoint,
                    block.chain_id,
                    expected_chain_id
                );
                mismatches += 1;
                mismatch = Some(RpcError::ChainIdentityMismatch {
                    endpoint: endpoint.clone(),
                    expected: expected_chain_id.to_string(),
                    found: block.chain_id,
                });
            }
            Err(err) => {
                log_fetch_failure(&err);
                if let RpcError::HeightParse(_) = err {
                    bad_heights += 1;
                    bad_height = Some(err);
                }
            }
        }
    }

    match (mismatch, bad_height) {
        (Some(err), _) if mismatches == endpoints.len() => Err(err),
        (_, Some(err)) if bad_heights == endpoints.len() => Err(err),
        _ => Err(RpcError::NoHealthyEndpoint {
            chain_id: expected_chain_id.to_string(),
        }),
    }
}

/// Transport and decode failures are both "unreachable" to callers but logged apart.
pub fn log_fetch_failure(err: &RpcError) {
    match err {
        RpcError::Transport { .. } => log::warn!("transport error: {}", err),
        _ if err.is_unreachable() => log::warn!("decode error: {}", err),
        _ => log::warn!("{}", err),
    }
}

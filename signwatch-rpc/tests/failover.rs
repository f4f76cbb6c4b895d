use async_trait::async_trait;
use chrono::Utc;
use signwatch_rpc::{fetch_verified_latest, BlockSnapshot, BlockSource, RpcError};
use std::collections::HashMap;
use std::sync::Mutex;

enum Reply {
    Chain(&'static str),
    Down,
}

/// Serves latest blocks from a fixed table and records which endpoints were asked.
struct StaticSource {
    replies: HashMap<String, Reply>,
    calls: Mutex<Vec<String>>,
}

impl StaticSource {
    fn new(replies: Vec<(&str, Reply)>) -> Self {
        Self {
            replies: replies.into_iter().map(|(url, r)| (url.to_string(), r)).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlockSource for StaticSource {
    async fn latest_block(&self, endpoint: &str) -> signwatch_rpc::Result<BlockSnapshot> {
        self.calls.lock().unwrap().push(endpoint.to_string());
        match self.replies.get(endpoint) {
            Some(Reply::Chain(chain_id)) => Ok(BlockSnapshot {
                chain_id: chain_id.to_string(),
                height: 100,
                time: Utc::now(),
                signers: vec![],
            }),
            _ => Err(RpcError::transport(endpoint, "connection refused")),
        }
    }

    async fn block_at_height(&self, endpoint: &str, _height: u64) -> signwatch_rpc::Result<BlockSnapshot> {
        self.latest_block(endpoint).await
    }
}

fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn picks_the_endpoint_serving_the_expected_chain() {
    let source = StaticSource::new(vec![
        ("http://a", Reply::Down),
        ("http://b", Reply::Chain("other-1")),
        ("http://c", Reply::Chain("osmosis-1")),
    ]);

    let verified = fetch_verified_latest(&source, &urls(&["http://a", "http://b", "http://c"]), "osmosis-1")
        .await
        .unwrap();

    assert_eq!(verified.endpoint, "http://c");
    assert_eq!(verified.block.chain_id, "osmosis-1");
}

#[tokio::test]
async fn tries_each_endpoint_at_most_once() {
    let source = StaticSource::new(vec![
        ("http://a", Reply::Down),
        ("http://b", Reply::Down),
        ("http://c", Reply::Down),
    ]);

    let err = fetch_verified_latest(&source, &urls(&["http://a", "http://b", "http://c"]), "osmosis-1")
        .await
        .unwrap_err();

    assert_eq!(err, RpcError::NoHealthyEndpoint { chain_id: "osmosis-1".to_string() });
    let mut calls = source.calls();
    calls.sort();
    assert_eq!(calls, urls(&["http://a", "http://b", "http://c"]));
}

#[tokio::test]
async fn single_wrong_chain_endpoint_is_a_mismatch_not_an_outage() {
    let source = StaticSource::new(vec![("http://a", Reply::Chain("juno-1"))]);

    let err = fetch_verified_latest(&source, &urls(&["http://a"]), "osmosis-1")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RpcError::ChainIdentityMismatch {
            endpoint: "http://a".to_string(),
            expected: "osmosis-1".to_string(),
            found: "juno-1".to_string(),
        }
    );
}

#[tokio::test]
async fn mixed_mismatch_and_outage_is_no_healthy_endpoint() {
    let source = StaticSource::new(vec![
        ("http://a", Reply::Chain("juno-1")),
        ("http://b", Reply::Down),
    ]);

    let err = fetch_verified_latest(&source, &urls(&["http://a", "http://b"]), "osmosis-1")
        .await
        .unwrap_err();

    assert!(matches!(err, RpcError::NoHealthyEndpoint { .. }));
}

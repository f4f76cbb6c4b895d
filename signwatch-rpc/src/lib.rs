//! Tendermint RPC access for signwatch.
//!
//! Fetches latest and historical blocks from CometBFT/Tendermint RPC nodes,
//! and picks a healthy endpoint for a network by verifying the chain id it
//! actually serves.

pub mod client;
pub mod error;
pub mod failover;
pub mod types;

pub use client::{BlockSource, RpcGateway};
pub use error::{Result, RpcError};
pub use failover::{fetch_verified_latest, log_fetch_failure, VerifiedBlock};
pub use types::BlockSnapshot;

/// Per-request timeout for RPC calls in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

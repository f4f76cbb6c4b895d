//! Signature presence over a window of recent blocks.
//!
//! Fetch failures are counted as unreachable, never as misses: a node that
//! cannot serve history says nothing about the validator.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::ops::RangeInclusive;
use std::time::Duration;

use signwatch_rpc::{log_fetch_failure, BlockSource};

use crate::constants::{BACKCHECK_BUDGET, BACKCHECK_CONCURRENCY};

/// Contiguous heights `[end - depth + 1, end]`, clipped at height 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckWindow {
    pub start: u64,
    pub end: u64,
}

impl CheckWindow {
    pub fn ending_at(height: u64, depth: usize) -> Self {
        let back = (depth as u64).saturating_sub(1);
        let start = height.saturating_sub(back).max(1);
        Self { start, end: height }
    }

    pub fn len(&self) -> usize {
        if self.start > self.end {
            return 0;
        }
        (self.end - self.start).saturating_add(1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn heights(&self) -> RangeInclusive<u64> {
        self.start..=self.end
    }
}

/// Result of one back-check.
///
/// `signed + missed + unreachable == total_attempted` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthObservation {
    pub signed: usize,
    pub missed: usize,
    pub unreachable: usize,
    pub total_attempted: usize,
    /// Set for stall cycles, which check no heights
    pub stalled: bool,
    pub last_block_time: DateTime<Utc>,
    pub rpc_healthy: bool,
}

impl HealthObservation {
    pub fn new(signed: usize, missed: usize, unreachable: usize, last_block_time: DateTime<Utc>) -> Self {
        let total_attempted = signed + missed + unreachable;
        let effective = total_attempted - unreachable;
        Self {
            signed,
            missed,
            unreachable,
            total_attempted,
            stalled: false,
            last_block_time,
            rpc_healthy: effective > 0 && unreachable <= effective,
        }
    }

    /// Observation of a cycle whose latest block was too old to back-check.
    /// The endpoint verified, so the RPC counts as healthy.
    pub fn stalled_at(last_block_time: DateTime<Utc>) -> Self {
        Self {
            signed: 0,
            missed: 0,
            unreachable: 0,
            total_attempted: 0,
            stalled: true,
            last_block_time,
            rpc_healthy: true,
        }
    }

    /// Heights that were actually checked
    pub fn effective_window(&self) -> usize {
        self.total_attempted - self.unreachable
    }

    /// Misses strictly above `threshold` are alert-worthy. Never true when the RPC is unhealthy.
    pub fn exceeds(&self, threshold: usize) -> bool {
        self.rpc_healthy && self.missed > threshold
    }

    pub fn fully_signed(&self) -> bool {
        self.rpc_healthy && self.signed == self.effective_window()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackCheckLimits {
    /// Upper bound on in-flight block requests
    pub concurrency: usize,
    /// Heights still pending when this runs out count as unreachable
    pub budget: Duration,
}

impl Default for BackCheckLimits {
    fn default() -> Self {
        Self {
            concurrency: BACKCHECK_CONCURRENCY,
            budget: BACKCHECK_BUDGET,
        }
    }
}

pub async fn back_check<S>(
    source: &S,
    endpoint: &str,
    address: &str,
    window: CheckWindow,
    last_block_time: DateTime<Utc>,
    limits: BackCheckLimits,
) -> HealthObservation
where
    S: BlockSource + ?Sized,
{
    let total = window.len();
    let concurrency = limits.concurrency.clamp(1, total.max(1));
    let deadline = tokio::time::Instant::now() + limits.budget;

    let mut fetches = stream::iter(window.heights())
        .map(move |height| async move { (height, source.block_at_height(endpoint, height).await) })
        .buffer_unordered(concurrency);

    let (mut signed, mut missed, mut unreachable) = (0, 0, 0);
    loop {
        match tokio::time::timeout_at(deadline, fetches.next()).await {
            Ok(Some((_, Ok(block)))) if block.signed_by(address) => signed += 1,
            Ok(Some((height, Ok(_)))) => {
                log::debug!("{} did not sign block {} (via {})", address, height, endpoint);
                missed += 1;
            }
            Ok(Some((height, Err(err)))) => {
                log::debug!("block {} unreachable via {}", height, endpoint);
                log_fetch_failure(&err);
                unreachable += 1;
            }
            Ok(None) => break,
            Err(_) => {
                log::warn!(
                    "back-check via {} ran out of time after {:?}, {} blocks unchecked",
                    endpoint,
                    limits.budget,
                    total - (signed + missed + unreachable)
                );
                break;
            }
        }
    }
    unreachable += total - (signed + missed + unreachable);

    HealthObservation::new(signed, missed, unreachable, last_block_time)
}

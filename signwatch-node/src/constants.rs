//! Tunables for the monitor that are not part of the config file.

use std::time::Duration;

/// Poll interval used while a worker is alerted, if shorter than the configured one
pub const ALERTED_POLL_INTERVAL: Duration = Duration::from_secs(2 * 60);

/// Concurrent block fetches per back-check
pub const BACKCHECK_CONCURRENCY: usize = 5;

/// Time budget for all fetches of one back-check
pub const BACKCHECK_BUDGET: Duration = Duration::from_secs(60);

/// Consecutive chain-id mismatches before a configuration alert
pub const MISMATCH_ALERT_AFTER: u32 = 3;

/// Capacity of the queue between workers and the alert router
pub const ALERT_QUEUE_CAPACITY: usize = 256;

pub const DEFAULT_CONFIG_PATH: &str = "./config.json";

pub const LOG_FILE_NAME: &str = "signwatch.log";

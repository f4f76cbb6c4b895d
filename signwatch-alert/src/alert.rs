use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    /// Informational, logged and never delivered
    None,
    Missed,
    Cleared,
    Signed,
    Stall,
    RpcError,
    Error,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertKind::None => "none",
            AlertKind::Missed => "missed",
            AlertKind::Cleared => "cleared",
            AlertKind::Signed => "signed",
            AlertKind::Stall => "stall",
            AlertKind::RpcError => "rpc-error",
            AlertKind::Error => "error",
        };
        f.write_str(name)
    }
}

/// Stable identity of an alert, independent of its message text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubjectKey {
    pub subject: String,
    pub kind: AlertKind,
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.subject, self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
    /// Validator or chain the alert is about, e.g. `cosmoshub-4/ABCD..`
    pub subject: String,
}

impl Alert {
    pub fn new(kind: AlertKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            subject: subject.into(),
        }
    }

    pub fn key(&self) -> SubjectKey {
        SubjectKey {
            subject: self.subject.clone(),
            kind: self.kind,
        }
    }

    pub fn is_deliverable(&self) -> bool {
        self.kind != AlertKind::None
    }

    pub fn info(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(AlertKind::None, subject, message)
    }

    pub fn missed(subject: impl Into<String>, moniker: &str, missed: usize, window: usize) -> Self {
        Self::new(
            AlertKind::Missed,
            subject,
            format!("❌ {} missed {} of {} recent blocks", moniker, missed, window),
        )
    }

    pub fn cleared(subject: impl Into<String>, moniker: &str, signed: usize, window: usize) -> Self {
        Self::new(
            AlertKind::Cleared,
            subject,
            format!("♻️ {} recovered, signed {} of {} recent blocks", moniker, signed, window),
        )
    }

    pub fn signed(subject: impl Into<String>, moniker: &str, signed: usize, window: usize) -> Self {
        Self::new(
            AlertKind::Signed,
            subject,
            format!("✅ {} signed {} of {} recent blocks", moniker, signed, window),
        )
    }

    pub fn stalled(chain_id: &str, last_block_time: DateTime<Utc>) -> Self {
        Self::new(
            AlertKind::Stall,
            chain_subject(chain_id),
            format!(
                "⏰ {} may be stalled, last block produced at {}",
                chain_id,
                last_block_time.to_rfc2822()
            ),
        )
    }

    pub fn no_rpc(chain_id: &str, network_name: &str) -> Self {
        Self::new(
            AlertKind::RpcError,
            chain_subject(chain_id),
            format!("📡 no healthy rpc available for {}", network_name),
        )
    }

    pub fn rpc_down(chain_id: &str, endpoint: &str) -> Self {
        Self::new(
            AlertKind::RpcError,
            chain_subject(chain_id),
            format!("📡 rpc {} is down or malfunctioning", endpoint),
        )
    }

    pub fn chain_mismatch(chain_id: &str, endpoint: &str, found: &str) -> Self {
        Self::new(
            AlertKind::Error,
            chain_subject(chain_id),
            format!(
                "⚙️ rpc {} serves chain {}, expected {}; check the configuration",
                endpoint, found, chain_id
            ),
        )
    }

    pub fn invalid_height(chain_id: &str) -> Self {
        Self::new(
            AlertKind::Error,
            chain_subject(chain_id),
            format!("❓ invalid block height reported for {}", chain_id),
        )
    }

    pub fn peer_unreachable(url: &str) -> Self {
        Self::new(
            AlertKind::Error,
            format!("health:{}", url),
            format!("🩺 health check failed for {}", url),
        )
    }
}

pub fn chain_subject(chain_id: &str) -> String {
    format!("chain:{}", chain_id)
}

pub fn validator_subject(chain_id: &str, address: &str) -> String {
    format!("{}/{}", chain_id, address)
}

//! Fan-out of alerts to notifier backends with bounded retry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::alert::{Alert, SubjectKey};
use crate::error::NotifierError;
use crate::notifier::Notifier;

/// Attempts per backend before a message is dropped
pub const MAX_DELIVERY_ATTEMPTS: u32 = 5;

/// Pause between attempts to the same backend
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_DELIVERY_ATTEMPTS,
            delay: RETRY_DELAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { backend: String, attempts: u32 },
    Exhausted { backend: String, attempts: u32, last_error: NotifierError },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Delivers alerts to every backend. Backends never wait on each other.
pub struct Dispatcher {
    notifiers: Vec<Arc<dyn Notifier>>,
    policy: RetryPolicy,
    failures: Arc<Mutex<HashMap<SubjectKey, u32>>>,
}

impl Dispatcher {
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self::with_policy(notifiers, RetryPolicy::default())
    }

    pub fn with_policy(notifiers: Vec<Arc<dyn Notifier>>, policy: RetryPolicy) -> Self {
        Self {
            notifiers,
            policy,
            failures: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn backends(&self) -> usize {
        self.notifiers.len()
    }

    /// Spawn one delivery task per backend and return immediately.
    pub fn dispatch(&self, alert: Alert) -> Vec<JoinHandle<DeliveryOutcome>> {
        let alert = Arc::new(alert);
        self.notifiers
            .iter()
            .map(|notifier| {
                let notifier = notifier.clone();
                let alert = alert.clone();
                let policy = self.policy;
                let failures = self.failures.clone();
                tokio::spawn(async move {
                    let outcome = deliver(notifier.as_ref(), &alert.message, &policy).await;
                    record_outcome(&failures, alert.key(), &outcome).await;
                    outcome
                })
            })
            .collect()
    }

    /// Exhausted deliveries recorded for `key` since its last success.
    pub async fn failures(&self, key: &SubjectKey) -> u32 {
        self.failures.lock().await.get(key).copied().unwrap_or(0)
    }
}

/// Try one backend until it accepts the message or the policy runs out.
pub async fn deliver(notifier: &dyn Notifier, message: &str, policy: &RetryPolicy) -> DeliveryOutcome {
    let backend = notifier.name().to_string();
    let mut attempts = 0;

    loop {
        attempts += 1;
        match notifier.send(message).await {
            Ok(()) => {
                log::info!("sent alert to {} (attempt {}): {}", backend, attempts, message);
                return DeliveryOutcome::Delivered { backend, attempts };
            }
            Err(err) if attempts >= policy.max_attempts => {
                log::error!(
                    "giving up on {} after {} attempts: {} ({})",
                    backend,
                    attempts,
                    message,
                    err
                );
                return DeliveryOutcome::Exhausted {
                    backend,
                    attempts,
                    last_error: err,
                };
            }
            Err(err) => {
                log::warn!(
                    "attempt {} to send alert to {} failed: {}, retrying",
                    attempts,
                    backend,
                    err
                );
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}

/// Returns the consecutive exhausted deliveries now recorded for `key`.
async fn record_outcome(
    failures: &Mutex<HashMap<SubjectKey, u32>>,
    key: SubjectKey,
    outcome: &DeliveryOutcome,
) -> u32 {
    let mut failures = failures.lock().await;
    match outcome {
        DeliveryOutcome::Delivered { .. } => {
            failures.remove(&key);
            0
        }
        DeliveryOutcome::Exhausted { backend, .. } => {
            let count = failures.entry(key.clone()).or_insert(0);
            *count += 1;
            log::error!(
                "{} consecutive exhausted deliveries for {} (last via {})",
                count,
                key,
                backend
            );
            *count
        }
    }
}

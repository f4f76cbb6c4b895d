//! Suppression of repeated alerts before they reach notifiers.
//!
//! Workers already avoid repeating an alert within one degraded episode.
//! The router covers the other axis: recovery and stall messages that would
//! otherwise repeat across episodes that happen close together.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;

use crate::alert::{Alert, AlertKind, SubjectKey};
use crate::dispatch::Dispatcher;

/// Window within which a repeated recovery message is withheld
pub fn recovery_window() -> Duration {
    Duration::hours(24)
}

/// Window within which a repeated stall message is withheld
pub fn stall_window() -> Duration {
    Duration::minutes(60)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Deliver,
    Suppressed { last_sent: DateTime<Utc> },
    LogOnly,
}

/// Owns the last-sent times for every suppressible subject.
/// Lives for the process; nothing is persisted.
#[derive(Debug, Default)]
pub struct AlertRouter {
    last_sent: HashMap<SubjectKey, DateTime<Utc>>,
}

impl AlertRouter {
    pub fn new() -> Self {
        Self::default()
    }

    fn window_for(kind: AlertKind) -> Option<Duration> {
        match kind {
            AlertKind::Cleared | AlertKind::Signed => Some(recovery_window()),
            AlertKind::Stall => Some(stall_window()),
            _ => None,
        }
    }

    /// Decide what happens to `alert` at `now`, recording it as sent when delivered.
    pub fn evaluate(&mut self, alert: &Alert, now: DateTime<Utc>) -> Verdict {
        if !alert.is_deliverable() {
            return Verdict::LogOnly;
        }
        let Some(window) = Self::window_for(alert.kind) else {
            return Verdict::Deliver;
        };

        let key = alert.key();
        if let Some(&last_sent) = self.last_sent.get(&key) {
            if now - last_sent < window {
                return Verdict::Suppressed { last_sent };
            }
        }
        self.last_sent.insert(key, now);
        Verdict::Deliver
    }

    /// Drain `alerts` in arrival order until every sender is gone.
    pub async fn run(mut self, mut alerts: mpsc::Receiver<Alert>, dispatcher: Arc<Dispatcher>) {
        log::info!("alert router started with {} notifier(s)", dispatcher.backends());

        while let Some(alert) = alerts.recv().await {
            match self.evaluate(&alert, Utc::now()) {
                Verdict::LogOnly => log::info!("{}", alert.message),
                Verdict::Suppressed { last_sent } => log::info!(
                    "suppressing {} alert for {}, last sent {}: {}",
                    alert.kind,
                    alert.subject,
                    last_sent.to_rfc3339(),
                    alert.message
                ),
                Verdict::Deliver => {
                    log::info!("dispatching {} alert: {}", alert.kind, alert.message);
                    // Delivery tasks are detached so a retrying backend never blocks the queue.
                    drop(dispatcher.dispatch(alert));
                }
            }
        }

        log::info!("alert queue closed, router exiting");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{chain_subject, validator_subject};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn stall_repeats_inside_an_hour_are_suppressed() {
        let mut router = AlertRouter::new();
        let stall = Alert::stalled("osmosis-1", t0());

        assert_eq!(router.evaluate(&stall, t0()), Verdict::Deliver);
        assert_eq!(
            router.evaluate(&stall, t0() + Duration::minutes(59)),
            Verdict::Suppressed { last_sent: t0() }
        );
        assert_eq!(router.evaluate(&stall, t0() + Duration::minutes(60)), Verdict::Deliver);
    }

    #[test]
    fn stall_suppression_ignores_message_text() {
        let mut router = AlertRouter::new();
        let first = Alert::stalled("osmosis-1", t0());
        let later = Alert::stalled("osmosis-1", t0() + Duration::minutes(5));
        assert_ne!(first.message, later.message);

        assert_eq!(router.evaluate(&first, t0()), Verdict::Deliver);
        assert!(matches!(
            router.evaluate(&later, t0() + Duration::minutes(10)),
            Verdict::Suppressed { .. }
        ));
    }

    #[test]
    fn cleared_is_withheld_for_a_day() {
        let mut router = AlertRouter::new();
        let subject = validator_subject("osmosis-1", "AAAA");
        let cleared = Alert::cleared(subject, "val", 10, 10);

        assert_eq!(router.evaluate(&cleared, t0()), Verdict::Deliver);
        assert!(matches!(
            router.evaluate(&cleared, t0() + Duration::hours(23)),
            Verdict::Suppressed { .. }
        ));
        assert_eq!(router.evaluate(&cleared, t0() + Duration::hours(24)), Verdict::Deliver);
    }

    #[test]
    fn suppressed_alerts_do_not_extend_the_window() {
        let mut router = AlertRouter::new();
        let stall = Alert::stalled("osmosis-1", t0());

        router.evaluate(&stall, t0());
        router.evaluate(&stall, t0() + Duration::minutes(30));
        assert_eq!(router.evaluate(&stall, t0() + Duration::minutes(61)), Verdict::Deliver);
    }

    #[test]
    fn other_kinds_always_deliver() {
        let mut router = AlertRouter::new();
        let subject = validator_subject("osmosis-1", "AAAA");
        let missed = Alert::missed(subject, "val", 3, 10);
        let no_rpc = Alert::no_rpc("osmosis-1", "Osmosis");

        for _ in 0..3 {
            assert_eq!(router.evaluate(&missed, t0()), Verdict::Deliver);
            assert_eq!(router.evaluate(&no_rpc, t0()), Verdict::Deliver);
        }
    }

    #[test]
    fn none_is_log_only() {
        let mut router = AlertRouter::new();
        let info = Alert::info(chain_subject("osmosis-1"), "found 10 of 10 signed");
        assert_eq!(router.evaluate(&info, t0()), Verdict::LogOnly);
    }

    #[test]
    fn subjects_are_tracked_independently() {
        let mut router = AlertRouter::new();
        let a = Alert::stalled("osmosis-1", t0());
        let b = Alert::stalled("juno-1", t0());
        assert_eq!(router.evaluate(&a, t0()), Verdict::Deliver);
        assert_eq!(router.evaluate(&b, t0()), Verdict::Deliver);
    }
}

//! One poll loop per (network, validator).
//!
//! Each worker owns its alert flags. Nothing is shared with other workers;
//! the only way out is the alert queue.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use signwatch_alert::{validator_subject, Alert};
use signwatch_rpc::{fetch_verified_latest, BlockSource, RpcError};

use crate::config::{Network, Validator};
use crate::constants::{ALERTED_POLL_INTERVAL, MISMATCH_ALERT_AFTER};
use crate::monitor::backcheck::{back_check, BackCheckLimits, CheckWindow, HealthObservation};
use crate::monitor::stall::is_stalled;

/// Per-worker hysteresis flags. Reset to default on every start.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkerState {
    /// An rpc-health alert was raised and no fully healthy poll has happened since
    pub rpc_alerted: bool,
    /// A missed-blocks alert was raised and the validator has not fully recovered
    pub missed_alerted: bool,
    pub stalled: bool,
    /// The one-time "signed" confirmation went out (or a recovery replaced it)
    pub confirmed: bool,
    pub mismatch_streak: u32,
    pub mismatch_reported: bool,
}

impl WorkerState {
    pub fn is_alerted(&self) -> bool {
        self.rpc_alerted || self.missed_alerted || self.stalled
    }
}

pub struct PollWorker {
    network: Arc<Network>,
    validator: Validator,
    source: Arc<dyn BlockSource>,
    limits: BackCheckLimits,
    state: WorkerState,
}

impl PollWorker {
    pub fn new(network: Arc<Network>, validator: Validator, source: Arc<dyn BlockSource>) -> Self {
        Self {
            network,
            validator,
            source,
            limits: BackCheckLimits::default(),
            state: WorkerState::default(),
        }
    }

    pub fn with_limits(mut self, limits: BackCheckLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn state(&self) -> &WorkerState {
        &self.state
    }

    pub fn subject(&self) -> String {
        validator_subject(&self.network.chain_id, &self.validator.address)
    }

    /// Configured interval, shortened to [`ALERTED_POLL_INTERVAL`] while alerted.
    pub fn next_interval(&self) -> Duration {
        let base = self.network.interval();
        if self.state.is_alerted() && base > ALERTED_POLL_INTERVAL {
            ALERTED_POLL_INTERVAL
        } else {
            base
        }
    }

    pub async fn run(mut self, alerts: mpsc::Sender<Alert>) {
        log::info!(
            "watching {} ({}) on {} every {:?}",
            self.validator.moniker,
            self.validator.address,
            self.network.chain_id,
            self.network.interval()
        );

        loop {
            let alert = self.poll_at(Utc::now()).await;
            if alerts.send(alert).await.is_err() {
                log::warn!("alert queue closed, stopping worker for {}", self.subject());
                return;
            }
            tokio::time::sleep(self.next_interval()).await;
        }
    }

    /// Run one poll cycle as of `now` and return the alert it produced.
    pub async fn poll_at(&mut self, now: DateTime<Utc>) -> Alert {
        let network = self.network.clone();

        let verified = match fetch_verified_latest(
            self.source.as_ref(),
            &network.rpcs,
            &network.chain_id,
        )
        .await
        {
            Ok(verified) => verified,
            Err(err) => return self.on_rpc_failure(err),
        };
        self.state.mismatch_streak = 0;
        self.state.mismatch_reported = false;

        let latest = verified.block;
        let observation = if is_stalled(latest.time, now, network.stall_threshold()) {
            HealthObservation::stalled_at(latest.time)
        } else {
            let window = CheckWindow::ending_at(latest.height, network.back_check);
            let observation = back_check(
                self.source.as_ref(),
                &verified.endpoint,
                &self.validator.address,
                window,
                latest.time,
                self.limits,
            )
            .await;
            log::debug!(
                "{} over heights {}..={}: {:?}",
                self.validator.moniker,
                window.start,
                window.end,
                observation
            );
            observation
        };

        self.classify(&observation, &verified.endpoint)
    }

    fn classify(&mut self, observation: &HealthObservation, endpoint: &str) -> Alert {
        let network = self.network.clone();

        if observation.stalled {
            if !self.state.stalled {
                log::warn!(
                    "{} last produced a block at {}",
                    network.chain_id,
                    observation.last_block_time
                );
            }
            self.state.stalled = true;
            self.recover_rpc();
            return Alert::stalled(&network.chain_id, observation.last_block_time);
        }
        if self.state.stalled {
            log::info!("{} is producing blocks again", network.chain_id);
            self.state.stalled = false;
        }

        let subject = self.subject();
        let moniker = self.validator.moniker.clone();
        let moniker = moniker.as_str();
        let window = observation.effective_window();

        if !observation.rpc_healthy {
            if self.state.rpc_alerted {
                return Alert::info(
                    subject,
                    format!("repeat alert suppressed - rpc down on {}", network.name),
                );
            }
            self.state.rpc_alerted = true;
            return self.gate_rpc(Alert::rpc_down(&network.chain_id, endpoint));
        }
        self.recover_rpc();

        if observation.exceeds(network.alert_threshold) {
            if self.state.missed_alerted {
                return Alert::info(
                    subject,
                    format!(
                        "repeat alert suppressed - {} still missing {} of {} blocks",
                        moniker, observation.missed, window
                    ),
                );
            }
            self.state.missed_alerted = true;
            return Alert::missed(subject, moniker, observation.missed, window);
        }

        if self.state.missed_alerted {
            if observation.fully_signed() {
                self.state.missed_alerted = false;
                self.state.confirmed = true;
                return Alert::cleared(subject, moniker, observation.signed, window);
            }
            return Alert::info(
                subject,
                format!(
                    "{} recovering, signed {} of {} on {}",
                    moniker, observation.signed, window, network.name
                ),
            );
        }

        if !self.state.confirmed {
            self.state.confirmed = true;
            return Alert::signed(subject, moniker, observation.signed, window);
        }

        Alert::info(
            subject,
            format!(
                "found {} of {} signed by {} on {}",
                observation.signed, window, moniker, network.name
            ),
        )
    }

    fn on_rpc_failure(&mut self, err: RpcError) -> Alert {
        let network = self.network.clone();
        log::warn!("poll of {} failed: {}", network.chain_id, err);

        if let RpcError::ChainIdentityMismatch { endpoint, found, .. } = &err {
            self.state.mismatch_streak += 1;
            if self.state.mismatch_streak >= MISMATCH_ALERT_AFTER && !self.state.mismatch_reported {
                self.state.mismatch_reported = true;
                self.state.rpc_alerted = true;
                return Alert::chain_mismatch(&network.chain_id, endpoint, found);
            }
        } else {
            self.state.mismatch_streak = 0;
        }

        if self.state.rpc_alerted {
            return Alert::info(
                self.subject(),
                format!("repeat alert suppressed - {}", err),
            );
        }
        self.state.rpc_alerted = true;

        let alert = match err {
            RpcError::HeightParse(_) => Alert::invalid_height(&network.chain_id),
            _ => Alert::no_rpc(&network.chain_id, &network.name),
        };
        self.gate_rpc(alert)
    }

    fn recover_rpc(&mut self) {
        if self.state.rpc_alerted {
            log::info!("rpc for {} is healthy again", self.network.chain_id);
            self.state.rpc_alerted = false;
        }
    }

    /// Rpc-health alerts become log lines when the network has them turned off.
    fn gate_rpc(&self, alert: Alert) -> Alert {
        if self.network.rpc_alerts {
            alert
        } else {
            Alert::info(
                alert.subject,
                format!("rpc alerts disabled for {}: {}", self.network.name, alert.message),
            )
        }
    }
}

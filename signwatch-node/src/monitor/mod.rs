//! Validator liveness monitoring.
//!
//! [`Monitor::start`] spawns the alert router and one [`PollWorker`] per
//! configured validator. Workers only talk to the router through the queue.

pub mod backcheck;
pub mod stall;
pub mod worker;

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use signwatch_alert::{Alert, AlertRouter, Dispatcher};
use signwatch_rpc::BlockSource;

use crate::config::Network;
use crate::constants::ALERT_QUEUE_CAPACITY;

pub use backcheck::{back_check, BackCheckLimits, CheckWindow, HealthObservation};
pub use stall::is_stalled;
pub use worker::{PollWorker, WorkerState};

pub struct Monitor {
    alerts: mpsc::Sender<Alert>,
    workers: Vec<JoinHandle<()>>,
    router: JoinHandle<()>,
}

impl Monitor {
    pub fn start(
        networks: &[Network],
        source: Arc<dyn BlockSource>,
        dispatcher: Arc<Dispatcher>,
    ) -> Monitor {
        let (alerts, alerts_rx) = mpsc::channel(ALERT_QUEUE_CAPACITY);
        let router = tokio::spawn(AlertRouter::new().run(alerts_rx, dispatcher));

        let mut workers = Vec::new();
        for network in networks {
            let network = Arc::new(network.clone());
            for validator in &network.validators {
                let worker = PollWorker::new(network.clone(), validator.clone(), source.clone());
                workers.push(tokio::spawn(worker.run(alerts.clone())));
            }
        }
        log::info!(
            "started {} worker(s) across {} network(s)",
            workers.len(),
            networks.len()
        );

        Monitor {
            alerts,
            workers,
            router,
        }
    }

    /// Queue for alerts raised outside the poll workers.
    pub fn alert_sender(&self) -> mpsc::Sender<Alert> {
        self.alerts.clone()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stop all workers, then let the router drain what is already queued.
    pub async fn shutdown(self) {
        for worker in &self.workers {
            worker.abort();
        }
        for worker in self.workers {
            let _ = worker.await;
        }
        drop(self.alerts);
        if let Err(err) = self.router.await {
            log::warn!("alert router ended abnormally: {}", err);
        }
    }
}

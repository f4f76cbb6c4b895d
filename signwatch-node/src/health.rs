//! Process liveness endpoint and checks against other signwatch instances.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use warp::Filter;

use signwatch_alert::Alert;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub networks: usize,
    pub validators: usize,
}

impl HealthReport {
    pub fn ok(networks: usize, validators: usize) -> Self {
        Self {
            status: "ok".to_string(),
            networks,
            validators,
        }
    }
}

/// Serve `GET /health` on `port` (0 picks a free port). Returns the bound address.
pub async fn start_health_server(
    port: u16,
    report: HealthReport,
) -> Result<(SocketAddr, JoinHandle<()>)> {
    let health_route = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_report(report))
        .map(|report: HealthReport| warp::reply::json(&report));

    let (addr, server) = warp::serve(health_route)
        .try_bind_ephemeral(([0, 0, 0, 0], port))
        .with_context(|| format!("Failed to bind health server on port {}", port))?;

    log::info!("Starting health server on http://{}/health", addr);
    let handle = tokio::spawn(server);

    Ok((addr, handle))
}

fn with_report(
    report: HealthReport,
) -> impl Filter<Extract = (HealthReport,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || report.clone())
}

/// Polls other instances' health urls and raises one alert per outage.
pub struct PeerHealthCheck {
    client: reqwest::Client,
    nodes: Vec<String>,
    interval: Duration,
    down: HashSet<String>,
}

impl PeerHealthCheck {
    pub fn new(client: reqwest::Client, nodes: Vec<String>, interval: Duration) -> Self {
        Self {
            client,
            nodes,
            interval,
            down: HashSet::new(),
        }
    }

    async fn is_up(&self, url: &str) -> bool {
        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                log::warn!("health check of {} answered {}", url, response.status());
                false
            }
            Err(err) => {
                log::warn!("health check of {} failed: {}", url, err);
                false
            }
        }
    }

    /// Check every node once. Only state changes produce alerts.
    pub async fn check_once(&mut self) -> Vec<Alert> {
        let mut alerts = Vec::new();
        for url in self.nodes.clone() {
            let up = self.is_up(&url).await;
            if !up && self.down.insert(url.clone()) {
                alerts.push(Alert::peer_unreachable(&url));
            } else if up && self.down.remove(&url) {
                alerts.push(Alert::info(
                    format!("health:{}", url),
                    format!("health check of {} recovered", url),
                ));
            }
        }
        alerts
    }

    pub async fn run(mut self, alerts: mpsc::Sender<Alert>) {
        log::info!(
            "checking {} peer health endpoint(s) every {:?}",
            self.nodes.len(),
            self.interval
        );
        loop {
            for alert in self.check_once().await {
                if alerts.send(alert).await.is_err() {
                    return;
                }
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signwatch_alert::AlertKind;

    #[tokio::test]
    async fn serves_health_report() {
        let (addr, _handle) = start_health_server(0, HealthReport::ok(2, 5)).await.unwrap();
        let url = format!("http://127.0.0.1:{}/health", addr.port());

        let report: HealthReport = reqwest::get(&url).await.unwrap().json().await.unwrap();
        assert_eq!(report, HealthReport::ok(2, 5));
    }

    #[tokio::test]
    async fn peer_outage_alerts_once_per_episode() {
        let (addr, handle) = start_health_server(0, HealthReport::ok(1, 1)).await.unwrap();
        let url = format!("http://127.0.0.1:{}/health", addr.port());
        let mut check = PeerHealthCheck::new(
            reqwest::Client::builder()
                .timeout(Duration::from_secs(2))
                .pool_max_idle_per_host(0)
                .build()
                .unwrap(),
            vec![url.clone()],
            Duration::from_secs(60),
        );

        assert!(check.check_once().await.is_empty());

        handle.abort();
        let _ = handle.await;

        let alerts = check.check_once().await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Error);
        assert!(check.check_once().await.is_empty());
    }
}

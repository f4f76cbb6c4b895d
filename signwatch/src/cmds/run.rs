use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use signwatch_alert::Dispatcher;
use signwatch_node::config::Config;
use signwatch_node::constants::DEFAULT_CONFIG_PATH;
use signwatch_node::health::{start_health_server, HealthReport, PeerHealthCheck};
use signwatch_node::http_client;
use signwatch_node::logging::init_logging;
use signwatch_node::monitor::Monitor;
use signwatch_rpc::{BlockSource, RpcGateway};

#[derive(Debug, Parser)]
#[command(about = "Monitor every configured validator until interrupted")]
pub struct Opts {
    #[clap(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

pub async fn run(opts: &Opts) -> Result<()> {
    let config = Config::from_filepath(&opts.config)?;
    config.validate()?;
    init_logging(
        config.logs_path.clone(),
        config.logs_enabled,
        config.log_level.clone(),
    )?;
    for network in &config.networks {
        for warning in network.warnings() {
            log::warn!("{}", warning);
        }
    }

    let client = http_client()?;
    let notifiers = config.build_notifiers(&client);
    if notifiers.is_empty() {
        log::warn!("no notifiers configured, alerts will only be logged");
    }
    let dispatcher = Arc::new(Dispatcher::new(notifiers));
    let source: Arc<dyn BlockSource> = Arc::new(RpcGateway::new(client.clone()));

    let monitor = Monitor::start(&config.networks, source, dispatcher);

    let health_server = if config.health.port != 0 {
        let report = HealthReport::ok(config.networks.len(), config.validator_count());
        let (_, handle) = start_health_server(config.health.port, report).await?;
        Some(handle)
    } else {
        None
    };

    let peer_check = if config.health.interval_mins > 0 {
        let check = PeerHealthCheck::new(
            client,
            config.health.nodes.clone(),
            Duration::from_secs(config.health.interval_mins * 60),
        );
        Some(tokio::spawn(check.run(monitor.alert_sender())))
    } else {
        None
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;
    log::info!("shutting down");

    for handle in peer_check.into_iter().chain(health_server) {
        handle.abort();
    }
    monitor.shutdown().await;

    Ok(())
}

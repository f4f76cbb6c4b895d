use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;

use signwatch_node::config::Config;
use signwatch_node::constants::DEFAULT_CONFIG_PATH;
use signwatch_node::http_client;
use signwatch_rpc::{fetch_verified_latest, RpcGateway};

#[derive(Debug, Parser)]
#[command(about = "Validate the config and query every network once")]
pub struct Opts {
    #[clap(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

pub async fn run(opts: &Opts) -> Result<()> {
    let config = Config::from_filepath(&opts.config)?;
    config.validate()?;
    for network in &config.networks {
        for warning in network.warnings() {
            println!("⚠️  {}", warning);
        }
    }

    let gateway = RpcGateway::new(http_client()?);
    let mut failed = 0;
    for network in &config.networks {
        match fetch_verified_latest(&gateway, &network.rpcs, &network.chain_id).await {
            Ok(verified) => println!(
                "✅ {} ({}) at height {}, {} via {}",
                network.name,
                verified.block.chain_id,
                verified.block.height,
                verified.block.time.to_rfc3339(),
                verified.endpoint
            ),
            Err(err) => {
                failed += 1;
                println!("❌ {} ({}): {}", network.name, network.chain_id, err);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} network(s) unreachable", failed, config.networks.len());
    }
    Ok(())
}

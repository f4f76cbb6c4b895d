use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use signwatch_node::config::Config;
use signwatch_node::constants::DEFAULT_CONFIG_PATH;

#[derive(Debug, Parser)]
#[command(about = "Write a sample config file")]
pub struct Opts {
    #[clap(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

pub async fn run(opts: &Opts) -> Result<()> {
    Config::write_template(&opts.config)?;

    println!("✨ Wrote a sample config to {}", opts.config.display());
    println!("📝 Fill in your networks, validators and notifier credentials, then run `signwatch run`.");

    Ok(())
}

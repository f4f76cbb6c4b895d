mod cmds;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "signwatch")]
#[command(version)]
#[command(about = "Watch validators for missed blocks, stalled chains and broken RPCs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Run(cmds::run::Opts),

    Init(cmds::init::Opts),

    Check(cmds::check::Opts),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Commands::Run(opts) => cmds::run::run(opts).await?,
        Commands::Init(opts) => cmds::init::run(opts).await?,
        Commands::Check(opts) => cmds::check::run(opts).await?,
    }

    Ok(())
}

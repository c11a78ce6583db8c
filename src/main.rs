mod cli;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crossbeat::utils::logging;
use crossbeat::HeartbeatConfig;

#[derive(Parser)]
#[command(name = "crossbeat")]
#[command(about = "Cross-cloud heartbeat between two endpoints", long_about = None)]
struct Cli {
    #[command(flatten)]
    overrides: cli::Overrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the heartbeat responder
    Respond,
    /// Run a single heartbeat check against the peer
    Check,
    /// Check the peer on an interval
    Schedule,
    /// Serve the responder and check the peer on an interval
    Run,
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let command = match cli.command {
        Some(Commands::Version) | None => {
            println!("crossbeat {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(command) => command,
    };

    let config = HeartbeatConfig::from_env().context("Failed to load configuration")?;
    let config = cli.overrides.apply(config)?;

    // Initialize logging
    logging::init(config.log_format)?;

    match command {
        Commands::Respond => cli::cmd_respond(config).await,
        Commands::Check => cli::cmd_check(config).await,
        Commands::Schedule => cli::cmd_schedule(config).await,
        Commands::Run => cli::cmd_run(config).await,
        Commands::Version => Ok(()),
    }
}

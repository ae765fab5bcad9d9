//! Relay CLI
//!
//! Command-line interface for the Relay pipeline tracker.

mod commands;
mod config;
mod id_resolver;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Relay pipeline run tracker CLI", long_about = None)]
struct Cli {
    /// Tracker URL
    #[arg(long, env = "RELAY_TRACKER_URL", default_value = "http://localhost:8080")]
    tracker_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        tracker_url: cli.tracker_url,
    };

    handle_command(cli.command, &config).await
}

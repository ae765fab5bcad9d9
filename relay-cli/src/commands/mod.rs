//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod run;

pub use run::RunCommands;

use anyhow::Result;
use clap::Subcommand;
use colored::*;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Pipeline run management
    Run {
        #[command(subcommand)]
        command: RunCommands,
    },
    /// Check that the tracker is reachable
    Health,
}

/// Route a command to its handler
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Run { command } => run::handle_run_command(command, config).await,
        Commands::Health => health(config).await,
    }
}

async fn health(config: &Config) -> Result<()> {
    let health = config.client().health().await?;

    if health.is_ok() {
        println!(
            "{} Tracker at {} is up ({} runs tracked)",
            "✓".green(),
            config.tracker_url,
            health.runs
        );
    } else {
        println!(
            "{} Tracker at {} reports '{}'",
            "✗".red(),
            config.tracker_url,
            health.status
        );
    }

    Ok(())
}

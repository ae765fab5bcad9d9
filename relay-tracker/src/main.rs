use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod repository;
pub mod service;

use crate::config::TrackerConfig;
use crate::repository::RunStore;
use crate::service::fixtures;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_tracker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Relay Tracker...");

    let config = TrackerConfig::from_env().context("Failed to load tracker configuration")?;
    config.validate().context("Invalid tracker configuration")?;

    tracing::info!(
        "Stages: [{}], environments: [{}]",
        config.stages.join(", "),
        config.environments.join(", ")
    );

    let store = RunStore::new();

    if config.seed_runs > 0 {
        fixtures::seed_runs(&store, &config, config.seed_runs, config.seed)
            .map_err(|e| anyhow::anyhow!("Failed to seed demo runs: {}", e))?;
    }

    let addr = config.bind_addr.clone();

    // Build router with all API endpoints
    let app = api::create_router(api::AppState::new(store, config));

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Relay Tracker stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}

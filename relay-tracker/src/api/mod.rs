//! API Module
//!
//! HTTP API layer for the tracker.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod run;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::TrackerConfig;
use crate::repository::RunStore;

/// State shared by all handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<RunStore>,
    pub config: Arc<TrackerConfig>,
}

impl AppState {
    pub fn new(store: RunStore, config: TrackerConfig) -> Self {
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
        }
    }
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Run endpoints
        .route("/pipeline/runs", post(run::create_run).get(run::list_runs))
        .route("/pipeline/runs/{id}", get(run::get_run))
        .route("/pipeline/runs/{id}/advance", post(run::advance_stage))
        .route("/pipeline/runs/{id}/cancel", post(run::cancel_run))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

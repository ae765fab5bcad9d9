//! Health Check API Handler
//!
//! Liveness endpoint for monitoring.

use axum::{Json, extract::State};
use relay_core::dto::health::HealthStatus;

use crate::api::AppState;

/// GET /health
/// Health check endpoint; also reports how many runs are tracked
pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus::ok(state.store.len()))
}

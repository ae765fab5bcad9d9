//! Run API Handlers
//!
//! HTTP endpoints for the pipeline run lifecycle.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use relay_core::domain::run::PipelineRun;
use relay_core::dto::query::{ListRuns, RunPage};
use relay_core::dto::run::{AdvanceStage, CreateRun};
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::run_service;

/// POST /pipeline/runs
/// Trigger a new pipeline run
pub async fn create_run(
    State(state): State<AppState>,
    payload: Result<Json<CreateRun>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PipelineRun>)> {
    let Json(req) = payload?;
    tracing::info!(
        "Triggering run on {} for {} by {}",
        req.branch,
        req.environment,
        req.triggered_by
    );

    let run = run_service::create_run(&state.store, &state.config, req)?;

    Ok((StatusCode::CREATED, Json(run)))
}

/// GET /pipeline/runs
/// List runs with optional `status`, `branch`, `environment`, `page` and `limit`
pub async fn list_runs(
    State(state): State<AppState>,
    query: Result<Query<ListRuns>, QueryRejection>,
) -> ApiResult<Json<RunPage>> {
    let Query(query) = query?;
    tracing::debug!("Listing runs: {:?}", query);

    let page = run_service::list_runs(&state.store, &state.config, &query)?;

    Ok(Json(page))
}

/// GET /pipeline/runs/{id}
/// Get run by ID
pub async fn get_run(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<PipelineRun>> {
    let Path(id) = id?;
    tracing::debug!("Getting run: {}", id);

    let run = run_service::get_run(&state.store, id)?;

    Ok(Json(run))
}

/// POST /pipeline/runs/{id}/advance
/// Start the next pending stage, or finish the running one
pub async fn advance_stage(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<AdvanceStage>, JsonRejection>,
) -> ApiResult<Json<PipelineRun>> {
    let Path(id) = id?;
    let Json(req) = payload?;
    tracing::debug!("Advancing run {} stage '{}'", id, req.stage);

    let run = run_service::advance_stage(&state.store, id, req)?;

    Ok(Json(run))
}

/// POST /pipeline/runs/{id}/cancel
/// Cancel a run that has not finished
pub async fn cancel_run(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<PipelineRun>> {
    let Path(id) = id?;
    tracing::info!("Cancelling run: {}", id);

    let run = run_service::cancel_run(&state.store, id)?;

    Ok(Json(run))
}

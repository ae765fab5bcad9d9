//! Run-related API endpoints

use relay_core::domain::run::PipelineRun;
use relay_core::dto::health::HealthStatus;
use relay_core::dto::query::{ListRuns, RunPage};
use relay_core::dto::run::{AdvanceStage, CreateRun};
use uuid::Uuid;

use crate::TrackerClient;
use crate::error::Result;

impl TrackerClient {
    // =============================================================================
    // Run Lifecycle
    // =============================================================================

    /// Trigger a new pipeline run
    ///
    /// Fails with status 403 when a non-default branch targets production.
    pub async fn create_run(&self, req: CreateRun) -> Result<PipelineRun> {
        let response = self
            .client
            .post(self.url("/pipeline/runs"))
            .json(&req)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get a run by ID
    pub async fn get_run(&self, run_id: Uuid) -> Result<PipelineRun> {
        let url = self.url(&format!("/pipeline/runs/{}", run_id));
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Start or finish a stage of a run
    ///
    /// The first call for a stage starts it, the second finishes it with the
    /// request's outcome.
    pub async fn advance_stage(&self, run_id: Uuid, req: AdvanceStage) -> Result<PipelineRun> {
        let url = self.url(&format!("/pipeline/runs/{}/advance", run_id));
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    pub async fn cancel_run(&self, run_id: Uuid) -> Result<PipelineRun> {
        let url = self.url(&format!("/pipeline/runs/{}/cancel", run_id));
        let response = self.client.post(&url).send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Run History
    // =============================================================================

    /// List one page of runs, most recent first, with stats over every match
    pub async fn list_runs(&self, query: &ListRuns) -> Result<RunPage> {
        let response = self
            .client
            .get(self.url("/pipeline/runs"))
            .query(query)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Walk every page of a query and collect all matching runs
    pub async fn list_all_runs(&self, query: &ListRuns) -> Result<Vec<PipelineRun>> {
        let mut query = query.clone();
        let mut page = query.page.unwrap_or(1);
        let mut runs = Vec::new();

        loop {
            query.page = Some(page);
            let result = self.list_runs(&query).await?;
            let has_next = result.pagination.has_next();
            runs.extend(result.runs);

            if !has_next {
                return Ok(runs);
            }
            page += 1;
        }
    }

    // =============================================================================
    // Health
    // =============================================================================

    pub async fn health(&self) -> Result<HealthStatus> {
        let response = self.client.get(self.url("/health")).send().await?;

        self.handle_response(response).await
    }
}

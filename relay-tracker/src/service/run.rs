//! Run Service
//!
//! Business logic for the pipeline run lifecycle: trigger validation,
//! stage advancement, cancellation and history queries.

use chrono::{DateTime, Utc};
use relay_core::TransitionError;
use relay_core::domain::run::{CommitInfo, PipelineRun, StageTransition};
use relay_core::dto::query::{ListRuns, RunPage, RunStats};
use relay_core::dto::run::{AdvanceStage, CreateRun};
use uuid::Uuid;

use crate::config::TrackerConfig;
use crate::repository::RunStore;

/// Service error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    NotFound(Uuid),
    InvalidBranch(String),
    InvalidEnvironment(String),
    ProductionRestricted { branch: String, environment: String },
    UnknownStage(String),
    ValidationError(String),
    InvalidTransition(String),
    AlreadyTerminal(String),
}

impl From<TransitionError> for RunError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::UnknownStage(stage) => RunError::UnknownStage(stage),
            TransitionError::InvalidTransition { .. } => {
                RunError::InvalidTransition(err.to_string())
            }
            TransitionError::AlreadyTerminal { .. } => RunError::AlreadyTerminal(err.to_string()),
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::NotFound(id) => write!(f, "Run {} not found", id),
            RunError::InvalidBranch(branch) => write!(f, "Branch '{}' is not allowed", branch),
            RunError::InvalidEnvironment(env) => write!(f, "Unknown environment '{}'", env),
            RunError::ProductionRestricted {
                branch,
                environment,
            } => write!(
                f,
                "Deploys to '{}' are restricted to the default branch (got '{}')",
                environment, branch
            ),
            RunError::UnknownStage(stage) => write!(f, "Unknown stage '{}'", stage),
            RunError::ValidationError(msg)
            | RunError::InvalidTransition(msg)
            | RunError::AlreadyTerminal(msg) => f.write_str(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, RunError>;

/// Trigger a new run
pub fn create_run(store: &RunStore, config: &TrackerConfig, req: CreateRun) -> Result<PipelineRun> {
    create_run_at(store, config, req, Utc::now())
}

pub(crate) fn create_run_at(
    store: &RunStore,
    config: &TrackerConfig,
    req: CreateRun,
    at: DateTime<Utc>,
) -> Result<PipelineRun> {
    validate_create_request(config, &req)?;

    let commit = req
        .commit
        .unwrap_or_else(|| manual_commit(&req.triggered_by, at));

    let run = PipelineRun::new(
        store.next_number(),
        req.branch,
        req.environment,
        req.triggered_by,
        commit,
        &config.stages,
        at,
    );
    store.insert(run.clone());

    tracing::info!(
        "Run #{} created: {} ({} -> {})",
        run.number,
        run.id,
        run.branch,
        run.environment
    );

    Ok(run)
}

/// Get a run by ID
pub fn get_run(store: &RunStore, id: Uuid) -> Result<PipelineRun> {
    store.find_by_id(id).ok_or(RunError::NotFound(id))
}

/// List runs matching the query, most recent first
pub fn list_runs(store: &RunStore, config: &TrackerConfig, query: &ListRuns) -> Result<RunPage> {
    let page_request = query
        .page_request(config.max_page_size)
        .map_err(RunError::ValidationError)?;
    let filter = query.filter();

    let mut runs: Vec<PipelineRun> = store
        .list_all()
        .into_iter()
        .filter(|run| filter.matches(run))
        .collect();
    sort_most_recent_first(&mut runs);

    let stats = RunStats::collect(&runs);
    let (runs, pagination) = page_request.paginate(runs);

    Ok(RunPage {
        runs,
        pagination,
        stats,
    })
}

/// Start or finish a run's next stage
pub fn advance_stage(store: &RunStore, id: Uuid, req: AdvanceStage) -> Result<PipelineRun> {
    advance_stage_at(store, id, req, Utc::now())
}

pub(crate) fn advance_stage_at(
    store: &RunStore,
    id: Uuid,
    req: AdvanceStage,
    at: DateTime<Utc>,
) -> Result<PipelineRun> {
    let (transition, run) = store
        .update(id, |run| {
            run.advance_stage(&req.stage, req.outcome, req.logs, at)
        })
        .ok_or(RunError::NotFound(id))??;

    match transition {
        StageTransition::Started => {
            tracing::debug!("Run #{} stage '{}' started", run.number, req.stage)
        }
        StageTransition::Finished(status) => tracing::debug!(
            "Run #{} stage '{}' finished: {:?}",
            run.number,
            req.stage,
            status
        ),
    }
    if run.is_terminal() {
        tracing::info!(
            "Run #{} ({}) finished with status: {}",
            run.number,
            run.id,
            run.status
        );
    }

    Ok(run)
}

/// Cancel a run that has not finished
pub fn cancel_run(store: &RunStore, id: Uuid) -> Result<PipelineRun> {
    cancel_run_at(store, id, Utc::now())
}

pub(crate) fn cancel_run_at(store: &RunStore, id: Uuid, at: DateTime<Utc>) -> Result<PipelineRun> {
    let ((), run) = store
        .update(id, |run| run.cancel(at))
        .ok_or(RunError::NotFound(id))??;

    tracing::info!("Run #{} ({}) cancelled", run.number, run.id);

    Ok(run)
}

fn sort_most_recent_first(runs: &mut [PipelineRun]) {
    runs.sort_by(|a, b| {
        b.start_time
            .cmp(&a.start_time)
            .then_with(|| b.number.cmp(&a.number))
    });
}

/// Commit recorded for triggers that did not name one
fn manual_commit(triggered_by: &str, at: DateTime<Utc>) -> CommitInfo {
    let sha: String = Uuid::new_v4().simple().to_string().chars().take(7).collect();

    CommitInfo {
        sha,
        message: "Manual pipeline trigger".to_string(),
        author: triggered_by.to_string(),
        timestamp: at,
    }
}

// =============================================================================
// Validation
// =============================================================================

fn validate_create_request(config: &TrackerConfig, req: &CreateRun) -> Result<()> {
    if req.triggered_by.trim().is_empty() {
        return Err(RunError::ValidationError(
            "triggered_by cannot be empty".to_string(),
        ));
    }

    if !config.is_allowed_branch(&req.branch) {
        return Err(RunError::InvalidBranch(req.branch.clone()));
    }

    if !config.is_known_environment(&req.environment) {
        return Err(RunError::InvalidEnvironment(req.environment.clone()));
    }

    if req.environment == config.production_environment && req.branch != config.default_branch {
        return Err(RunError::ProductionRestricted {
            branch: req.branch.clone(),
            environment: req.environment.clone(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;
    use relay_core::domain::run::RunStatus;
    use relay_core::domain::stage::{StageOutcome, StageStatus};

    fn create_req(branch: &str, environment: &str) -> CreateRun {
        CreateRun {
            branch: branch.to_string(),
            environment: environment.to_string(),
            triggered_by: "Manual".to_string(),
            commit: None,
        }
    }

    fn drive_to_success(store: &RunStore, config: &TrackerConfig, id: Uuid) -> PipelineRun {
        let mut run = get_run(store, id).unwrap();
        for stage in &config.stages {
            advance_stage(store, id, AdvanceStage::new(stage)).unwrap();
            run = advance_stage(store, id, AdvanceStage::new(stage)).unwrap();
        }
        run
    }

    #[test]
    fn test_production_restricted_to_default_branch() {
        let store = RunStore::new();
        let config = TrackerConfig::default();

        assert_eq!(
            create_run(&store, &config, create_req("develop", "production")),
            Err(RunError::ProductionRestricted {
                branch: "develop".to_string(),
                environment: "production".to_string(),
            })
        );
        assert!(create_run(&store, &config, create_req("main", "production")).is_ok());
        assert!(create_run(&store, &config, create_req("develop", "staging")).is_ok());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_create_run_validation() {
        let store = RunStore::new();
        let config = TrackerConfig::default();

        assert_eq!(
            create_run(&store, &config, create_req("experiment", "staging")),
            Err(RunError::InvalidBranch("experiment".to_string()))
        );
        assert_eq!(
            create_run(&store, &config, create_req("main", "qa")),
            Err(RunError::InvalidEnvironment("qa".to_string()))
        );

        let mut req = create_req("main", "staging");
        req.triggered_by = "  ".to_string();
        assert!(matches!(
            create_run(&store, &config, req),
            Err(RunError::ValidationError(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_created_run_shape() {
        let store = RunStore::new();
        let config = TrackerConfig::default();

        let run = create_run(&store, &config, create_req("feature/auth", "staging")).unwrap();

        assert_eq!(run.number, 1);
        assert_eq!(run.status, RunStatus::Pending);
        assert_eq!(run.stages.len(), config.stages.len());
        assert!(run.stages.iter().all(|s| s.status == StageStatus::Pending));
        assert_eq!(run.commit.sha.len(), 7);
        assert_eq!(run.commit.author, "Manual");
        assert_eq!(run.commit.message, "Manual pipeline trigger");
        assert_eq!(get_run(&store, run.id), Ok(run));
    }

    #[test]
    fn test_explicit_commit_is_kept() {
        let store = RunStore::new();
        let config = TrackerConfig::default();
        let commit = CommitInfo {
            sha: "ghi789b".to_string(),
            message: "Update dashboard components".to_string(),
            author: "bob.wilson".to_string(),
            timestamp: Utc::now(),
        };
        let mut req = create_req("feature/ui", "development");
        req.commit = Some(commit.clone());

        let run = create_run(&store, &config, req).unwrap();
        assert_eq!(run.commit, commit);
    }

    #[test]
    fn test_advance_and_terminal_errors() {
        let store = RunStore::new();
        let config = TrackerConfig::default();
        let run = create_run(&store, &config, create_req("main", "staging")).unwrap();

        assert_eq!(
            advance_stage(&store, Uuid::nil(), AdvanceStage::new("checkout")),
            Err(RunError::NotFound(Uuid::nil()))
        );
        assert_eq!(
            advance_stage(&store, run.id, AdvanceStage::new("lint")),
            Err(RunError::UnknownStage("lint".to_string()))
        );
        assert!(matches!(
            advance_stage(&store, run.id, AdvanceStage::new("build")),
            Err(RunError::InvalidTransition(_))
        ));

        let finished = drive_to_success(&store, &config, run.id);
        assert_eq!(finished.status, RunStatus::Success);

        let result = advance_stage(&store, run.id, AdvanceStage::new("deploy"));
        assert!(matches!(result, Err(RunError::AlreadyTerminal(_))));
        assert_eq!(get_run(&store, run.id), Ok(finished));
    }

    #[test]
    fn test_cancel_run() {
        let store = RunStore::new();
        let config = TrackerConfig::default();
        let run = create_run(&store, &config, create_req("main", "staging")).unwrap();
        advance_stage(&store, run.id, AdvanceStage::new("checkout")).unwrap();

        let cancelled = cancel_run(&store, run.id).unwrap();
        assert_eq!(cancelled.status, RunStatus::Cancelled);
        assert!(cancelled.end_time.is_some());

        assert!(matches!(
            cancel_run(&store, run.id),
            Err(RunError::AlreadyTerminal(_))
        ));
        assert_eq!(
            cancel_run(&store, Uuid::nil()),
            Err(RunError::NotFound(Uuid::nil()))
        );
    }

    #[test]
    fn test_list_runs_sorted_and_filtered() {
        let store = RunStore::new();
        let config = TrackerConfig::default();
        let t0 = Utc::now() - Duration::hours(1);

        // Inserted oldest-last to show ordering does not follow insertion.
        let newest = create_run_at(&store, &config, create_req("main", "staging"), t0).unwrap();
        let oldest = create_run_at(
            &store,
            &config,
            create_req("develop", "staging"),
            t0 - Duration::minutes(30),
        )
        .unwrap();
        let middle = create_run_at(
            &store,
            &config,
            create_req("main", "production"),
            t0 - Duration::minutes(10),
        )
        .unwrap();

        let page = list_runs(&store, &config, &ListRuns::default()).unwrap();
        let ids: Vec<Uuid> = page.runs.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![newest.id, middle.id, oldest.id]);
        assert_eq!(page.pagination.total, 3);

        let query = ListRuns {
            branch: Some("main".to_string()),
            environment: Some("staging".to_string()),
            ..Default::default()
        };
        let page = list_runs(&store, &config, &query).unwrap();
        assert_eq!(page.runs.len(), 1);
        assert_eq!(page.runs[0].id, newest.id);
    }

    #[test]
    fn test_list_runs_stats_cover_all_matches() {
        let store = RunStore::new();
        let config = TrackerConfig::default();

        for _ in 0..3 {
            let run = create_run(&store, &config, create_req("main", "staging")).unwrap();
            drive_to_success(&store, &config, run.id);
        }
        let failed = create_run(&store, &config, create_req("main", "staging")).unwrap();
        advance_stage(&store, failed.id, AdvanceStage::new("checkout")).unwrap();
        advance_stage(
            &store,
            failed.id,
            AdvanceStage::new("checkout").with_outcome(StageOutcome::Failure),
        )
        .unwrap();

        let query = ListRuns {
            limit: Some(1),
            ..Default::default()
        };
        let page = list_runs(&store, &config, &query).unwrap();
        assert_eq!(page.runs.len(), 1);
        assert_eq!(page.pagination.total_pages, 4);
        assert_eq!(page.stats.total, 4);
        assert_eq!(page.stats.success, 3);
        assert_eq!(page.stats.failure, 1);
        assert_eq!(page.stats.success_rate, 0.75);
        assert!(page.stats.average_duration_ms.is_some());

        let query = ListRuns {
            status: Some(RunStatus::Success),
            ..Default::default()
        };
        let page = list_runs(&store, &config, &query).unwrap();
        assert_eq!(page.stats.total, 3);
        assert_eq!(page.stats.success_rate, 1.0);
    }

    #[test]
    fn test_list_runs_rejects_bad_pagination() {
        let store = RunStore::new();
        let config = TrackerConfig::default();
        let query = ListRuns {
            page: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            list_runs(&store, &config, &query),
            Err(RunError::ValidationError(_))
        ));
    }

    proptest! {
        #[test]
        fn paging_reproduces_full_listing(n in 0usize..40, limit in 1u32..12) {
            let store = RunStore::new();
            let config = TrackerConfig::default();
            let t0 = Utc::now();
            for i in 0..n {
                // Pairs of runs share a timestamp to exercise the tie-breaker.
                let at = t0 - Duration::seconds((i / 2) as i64);
                create_run_at(&store, &config, create_req("main", "staging"), at).unwrap();
            }

            let full = list_runs(&store, &config, &ListRuns {
                limit: Some(100),
                ..Default::default()
            })
            .unwrap();

            let mut collected = Vec::new();
            let mut page = 1;
            loop {
                let result = list_runs(&store, &config, &ListRuns {
                    page: Some(page),
                    limit: Some(limit),
                    ..Default::default()
                })
                .unwrap();
                if result.runs.is_empty() {
                    break;
                }
                collected.extend(result.runs.into_iter().map(|r| r.id));
                page += 1;
            }

            prop_assert_eq!((page - 1) as usize, n.div_ceil(limit as usize));
            let expected: Vec<Uuid> = full.runs.iter().map(|r| r.id).collect();
            prop_assert_eq!(collected, expected);
        }
    }
}

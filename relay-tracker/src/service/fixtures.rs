//! Demo Fixtures
//!
//! Seeds the store with a deterministic run history for demos. Runs are driven
//! through the regular service operations with synthetic timestamps, so seeded
//! data obeys the same rules as live data.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use relay_core::domain::run::CommitInfo;
use relay_core::domain::stage::StageOutcome;
use relay_core::dto::run::{AdvanceStage, CreateRun};

use crate::config::{MAX_SEED_RUNS, TrackerConfig};
use crate::repository::RunStore;
use crate::service::run_service::{self, RunError};

const AUTHORS: [&str; 5] = [
    "john.doe",
    "jane.smith",
    "bob.wilson",
    "alice.brown",
    "carol.white",
];

const MESSAGES: [&str; 6] = [
    "Fix authentication bug",
    "Add OAuth integration",
    "Update dashboard components",
    "Performance improvements",
    "Bump container base image",
    "Refactor deployment manifests",
];

const BRANCHES: [&str; 5] = [
    "main",
    "develop",
    "feature/auth",
    "feature/ui",
    "hotfix/login-redirect",
];

const STAGE_FAILURE_RATE: f64 = 0.08;
const CANCEL_RATE: f64 = 0.03;

/// Seed `count` runs generated from `seed`
///
/// The newest run is left mid-flight so the demo always has something running.
pub fn seed_runs(
    store: &RunStore,
    config: &TrackerConfig,
    count: usize,
    seed: u64,
) -> Result<usize, RunError> {
    if count > MAX_SEED_RUNS {
        return Err(RunError::ValidationError(format!(
            "cannot seed more than {} runs",
            MAX_SEED_RUNS
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let now = Utc::now();
    // Leaves room for the newest run's stages to finish before `now`.
    let mut at = now - Duration::minutes(30 * count as i64 + 15);

    for i in 0..count {
        at += Duration::minutes(rng.gen_range(5..30));
        let req = random_request(&mut rng, config, at);
        let run_id = run_service::create_run_at(store, config, req, at)?.id;

        let in_flight = i + 1 == count;
        drive(store, config, &mut rng, run_id, at, in_flight)?;
    }

    tracing::info!("Seeded {} demo runs (seed {})", count, seed);

    Ok(count)
}

fn random_request(rng: &mut StdRng, config: &TrackerConfig, at: DateTime<Utc>) -> CreateRun {
    let candidates: Vec<&str> = BRANCHES
        .iter()
        .copied()
        .filter(|b| config.is_allowed_branch(b))
        .collect();
    let mut branch = pick(rng, &candidates)
        .copied()
        .unwrap_or(config.default_branch.as_str())
        .to_string();

    let environment = pick(rng, &config.environments)
        .cloned()
        .unwrap_or_else(|| config.production_environment.clone());
    if environment == config.production_environment {
        branch = config.default_branch.clone();
    }

    let author = pick(rng, &AUTHORS).copied().unwrap_or("ci");
    let sha: String = (0..7)
        .map(|_| char::from_digit(rng.gen_range(0..16), 16).unwrap_or('0'))
        .collect();

    CreateRun {
        branch,
        environment,
        triggered_by: author.to_string(),
        commit: Some(CommitInfo {
            sha,
            message: pick(rng, &MESSAGES).copied().unwrap_or_default().to_string(),
            author: author.to_string(),
            timestamp: at - Duration::minutes(rng.gen_range(1..120)),
        }),
    }
}

fn drive(
    store: &RunStore,
    config: &TrackerConfig,
    rng: &mut StdRng,
    run_id: uuid::Uuid,
    mut at: DateTime<Utc>,
    in_flight: bool,
) -> Result<(), RunError> {
    // An in-flight run stops while its stopping stage is still running.
    let stop_at = in_flight.then(|| rng.gen_range(0..config.stages.len()));

    for (index, stage) in config.stages.iter().enumerate() {
        at += Duration::seconds(rng.gen_range(1..10));
        run_service::advance_stage_at(store, run_id, AdvanceStage::new(stage), at)?;

        if stop_at == Some(index) {
            return Ok(());
        }

        if !in_flight && rng.gen_bool(CANCEL_RATE) {
            let cancelled_at = at + Duration::seconds(rng.gen_range(1..60));
            run_service::cancel_run_at(store, run_id, cancelled_at)?;
            return Ok(());
        }

        at += Duration::seconds(rng.gen_range(15..180));
        let outcome = if !in_flight && rng.gen_bool(STAGE_FAILURE_RATE) {
            StageOutcome::Failure
        } else {
            StageOutcome::Success
        };
        let req = AdvanceStage {
            stage: stage.clone(),
            outcome,
            logs: vec![format!("{} finished: {:?}", stage, outcome).to_lowercase()],
        };
        run_service::advance_stage_at(store, run_id, req, at)?;

        if outcome == StageOutcome::Failure {
            return Ok(());
        }
    }

    Ok(())
}

fn pick<'a, T>(rng: &mut StdRng, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        None
    } else {
        items.get(rng.gen_range(0..items.len()))
    }
}

//! ID resolver module
//!
//! Resolves run numbers and UUID prefixes to full run IDs by querying the
//! tracker's run history.

use anyhow::{Context, Result, anyhow};
use relay_client::TrackerClient;
use relay_core::domain::run::PipelineRun;
use relay_core::dto::query::ListRuns;
use uuid::Uuid;

use crate::types::RunRef;

/// Resolve a run reference to a full UUID
///
/// Full UUIDs are returned without a round trip. Numbers and prefixes are
/// matched against every run the tracker knows about.
pub async fn resolve_run_id(client: &TrackerClient, run_ref: &RunRef) -> Result<Uuid> {
    if let RunRef::Full(uuid) = run_ref {
        return Ok(*uuid);
    }

    let runs = client
        .list_all_runs(&resolution_query())
        .await
        .context("Failed to fetch runs for ID resolution")?;

    match_run(&runs, run_ref)
}

/// Query used to walk the history
///
/// Page size is left to the tracker, whose maximum is configurable.
fn resolution_query() -> ListRuns {
    ListRuns::default()
}

fn match_run(runs: &[PipelineRun], run_ref: &RunRef) -> Result<Uuid> {
    let matches: Vec<&PipelineRun> = runs
        .iter()
        .filter(|run| match run_ref {
            RunRef::Full(uuid) => run.id == *uuid,
            RunRef::Number(number) => run.number == *number,
            RunRef::Prefix(prefix) => run.id.to_string().starts_with(prefix.as_str()),
        })
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!("No run found matching '{}'", run_ref)),
        [run] => Ok(run.id),
        _ => {
            let ids: Vec<String> = matches.iter().map(|r| r.id.to_string()).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple runs: {}",
                run_ref,
                ids.join(", ")
            ))
        }
    }
}

//! Run command handlers
//!
//! Triggering runs, browsing history, and driving stages by hand.

use anyhow::{Result, anyhow};
use clap::Subcommand;
use colored::*;
use relay_client::{ClientError, TrackerClient};
use relay_core::domain::run::{PipelineRun, RunStatus};
use relay_core::domain::stage::{Stage, StageOutcome, StageStatus};
use relay_core::dto::query::{ListRuns, RunPage, RunStats};
use relay_core::dto::run::{AdvanceStage, CreateRun};

use crate::config::Config;
use crate::id_resolver::resolve_run_id;
use crate::types::RunRef;

/// Run subcommands
#[derive(Subcommand)]
pub enum RunCommands {
    /// Trigger a new run
    Trigger {
        #[arg(short, long, default_value = "main")]
        branch: String,

        #[arg(short, long, default_value = "development")]
        environment: String,

        /// Who triggered the run
        #[arg(short = 'u', long, default_value = "Manual")]
        triggered_by: String,
    },
    /// List runs, most recent first
    List {
        #[arg(short, long)]
        status: Option<RunStatus>,

        #[arg(short, long)]
        branch: Option<String>,

        #[arg(short, long)]
        environment: Option<String>,

        #[arg(short, long)]
        page: Option<u32>,

        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Get run details
    Get {
        /// Run ID, `#number`, or unambiguous ID prefix
        id: String,
    },
    /// Start or finish a stage
    Advance {
        /// Run ID, `#number`, or unambiguous ID prefix
        id: String,

        /// Stage name; defaults to the running stage, else the next pending one
        #[arg(short, long)]
        stage: Option<String>,

        /// Outcome when finishing a stage (success or failure)
        #[arg(short, long, default_value = "success")]
        outcome: StageOutcome,

        /// Log line to attach to the stage (repeatable)
        #[arg(long = "log")]
        logs: Vec<String>,
    },
    /// Cancel a run that has not finished
    Cancel {
        /// Run ID, `#number`, or unambiguous ID prefix
        id: String,
    },
}

pub async fn handle_run_command(command: RunCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        RunCommands::Trigger {
            branch,
            environment,
            triggered_by,
        } => trigger_run(&client, branch, environment, triggered_by).await,
        RunCommands::List {
            status,
            branch,
            environment,
            page,
            limit,
        } => {
            let query = ListRuns {
                status,
                branch,
                environment,
                page,
                limit,
            };
            list_runs(&client, &query).await
        }
        RunCommands::Get { id } => get_run(&client, &id).await,
        RunCommands::Advance {
            id,
            stage,
            outcome,
            logs,
        } => advance_stage(&client, &id, stage, outcome, logs).await,
        RunCommands::Cancel { id } => cancel_run(&client, &id).await,
    }
}

async fn trigger_run(
    client: &TrackerClient,
    branch: String,
    environment: String,
    triggered_by: String,
) -> Result<()> {
    let run = client
        .create_run(CreateRun {
            branch,
            environment,
            triggered_by,
            commit: None,
        })
        .await?;

    println!(
        "{} Triggered run {} ({})",
        "✓".green(),
        format!("#{}", run.number).bold(),
        run.id.to_string().dimmed()
    );
    print_run_details(&run);

    Ok(())
}

async fn list_runs(client: &TrackerClient, query: &ListRuns) -> Result<()> {
    let page = client.list_runs(query).await?;

    if page.runs.is_empty() {
        println!("{}", "No runs found.".yellow());
    } else {
        println!(
            "{}",
            format!(
                "Page {}/{} ({} run(s) total):",
                page.pagination.page, page.pagination.total_pages, page.pagination.total
            )
            .bold()
        );
        println!();
        for run in &page.runs {
            print_run_summary(run);
        }
    }

    print_stats(&page);

    Ok(())
}

async fn get_run(client: &TrackerClient, id: &str) -> Result<()> {
    let run_id = resolve_run_id(client, &RunRef::parse(id)).await?;
    let run = client.get_run(run_id).await?;

    print_run_details(&run);

    Ok(())
}

async fn advance_stage(
    client: &TrackerClient,
    id: &str,
    stage: Option<String>,
    outcome: StageOutcome,
    logs: Vec<String>,
) -> Result<()> {
    let run_id = resolve_run_id(client, &RunRef::parse(id)).await?;

    let stage = match stage {
        Some(stage) => stage,
        None => {
            let run = client.get_run(run_id).await?;
            run.running_stage()
                .or_else(|| run.next_stage())
                .map(|s| s.name.clone())
                .ok_or_else(|| anyhow!("Run #{} has no stage left to advance", run.number))?
        }
    };

    let req = AdvanceStage {
        stage: stage.clone(),
        outcome,
        logs,
    };
    let run = client.advance_stage(run_id, req).await?;

    let status = run
        .stage(&stage)
        .map(|s| colorize_stage(s.status))
        .unwrap_or_else(|| "unknown".normal());
    println!(
        "{} Stage '{}' of run #{} is now {}",
        "✓".green(),
        stage,
        run.number,
        status
    );
    print_run_details(&run);

    Ok(())
}

async fn cancel_run(client: &TrackerClient, id: &str) -> Result<()> {
    let run_id = resolve_run_id(client, &RunRef::parse(id)).await?;

    let run = client
        .cancel_run(run_id)
        .await
        .map_err(|e| cancel_error(id, e))?;
    println!("{} Cancelled run #{}", "✓".green(), run.number);

    Ok(())
}

/// A run that already finished cannot be cancelled; say so plainly
fn cancel_error(id: &str, err: ClientError) -> anyhow::Error {
    match err {
        ClientError::ApiError {
            status: 409,
            message,
        } => anyhow!("Run {} cannot be cancelled: {}", id, message),
        other => other.into(),
    }
}

// =============================================================================
// Output
// =============================================================================

fn print_run_summary(run: &PipelineRun) {
    println!(
        "  {} #{} {}  {} → {}",
        "▸".cyan(),
        run.number,
        colorize_run(run.status),
        run.branch.bold(),
        run.environment
    );
    println!(
        "    {} {}  {}",
        run.commit.sha.dimmed(),
        run.commit.message,
        format!("by {}", run.triggered_by).dimmed()
    );
    println!(
        "    Started: {}  Duration: {}",
        run.start_time
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed(),
        format_duration(run.duration_ms)
    );
    println!();
}

fn print_run_details(run: &PipelineRun) {
    println!("{}", "Run Details:".bold());
    println!("  ID:           {}", run.id.to_string().cyan());
    println!("  Number:       #{}", run.number);
    println!("  Status:       {}", colorize_run(run.status));
    println!("  Branch:       {}", run.branch);
    println!("  Environment:  {}", run.environment);
    println!("  Triggered by: {}", run.triggered_by);
    println!(
        "  Commit:       {} {} ({})",
        run.commit.sha.dimmed(),
        run.commit.message,
        run.commit.author
    );
    println!(
        "  Started:      {}",
        run.start_time.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(end) = run.end_time {
        println!("  Finished:     {}", end.format("%Y-%m-%d %H:%M:%S"));
        println!("  Duration:     {}", format_duration(run.duration_ms));
    }

    println!("\n{}", "Stages:".bold());
    for stage in &run.stages {
        print_stage(stage);
    }
}

fn print_stage(stage: &Stage) {
    println!(
        "  {:<12} {:<10} {}",
        stage.name,
        colorize_stage(stage.status),
        format_duration(stage.duration_ms).dimmed()
    );
    for line in &stage.logs {
        println!("    {}", line.dimmed());
    }
}

fn print_stats(page: &RunPage) {
    let RunStats {
        total,
        pending,
        running,
        success,
        failure,
        cancelled,
        success_rate,
        average_duration_ms,
    } = &page.stats;

    println!("{}", "Stats:".bold());
    println!(
        "  {} total: {} pending, {} running, {} success, {} failure, {} cancelled",
        total,
        pending,
        running.to_string().cyan(),
        success.to_string().green(),
        failure.to_string().red(),
        cancelled
    );
    println!("  Success rate:     {:.1}%", success_rate * 100.0);
    println!(
        "  Average duration: {}",
        format_duration(average_duration_ms.map(|ms| ms.round() as u64))
    );
}

fn format_duration(ms: Option<u64>) -> String {
    match ms {
        None => "-".to_string(),
        Some(ms) if ms < 1_000 => format!("{}ms", ms),
        Some(ms) if ms < 60_000 => format!("{:.1}s", ms as f64 / 1_000.0),
        Some(ms) => format!("{}m {}s", ms / 60_000, (ms % 60_000) / 1_000),
    }
}

fn colorize_run(status: RunStatus) -> ColoredString {
    match status {
        RunStatus::Pending => status.as_str().yellow(),
        RunStatus::Running => status.as_str().cyan(),
        RunStatus::Success => status.as_str().green(),
        RunStatus::Failure => status.as_str().red(),
        RunStatus::Cancelled => status.as_str().dimmed(),
    }
}

fn colorize_stage(status: StageStatus) -> ColoredString {
    let status_str = format!("{:?}", status).to_lowercase();
    match status {
        StageStatus::Pending => status_str.yellow(),
        StageStatus::Running => status_str.cyan(),
        StageStatus::Success => status_str.green(),
        StageStatus::Failure => status_str.red(),
        StageStatus::Skipped => status_str.dimmed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: RunCommands,
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(None), "-");
        assert_eq!(format_duration(Some(250)), "250ms");
        assert_eq!(format_duration(Some(1_500)), "1.5s");
        assert_eq!(format_duration(Some(125_000)), "2m 5s");
    }

    #[test]
    fn test_parse_advance_args() {
        let cli = TestCli::try_parse_from([
            "relay", "advance", "#3", "--stage", "build", "--outcome", "failure", "--log", "a",
            "--log", "b",
        ])
        .unwrap();

        match cli.command {
            RunCommands::Advance {
                id,
                stage,
                outcome,
                logs,
            } => {
                assert_eq!(id, "#3");
                assert_eq!(stage.as_deref(), Some("build"));
                assert_eq!(outcome, StageOutcome::Failure);
                assert_eq!(logs, vec!["a", "b"]);
            }
            _ => panic!("expected advance"),
        }
    }

    #[test]
    fn test_parse_list_filters() {
        let cli =
            TestCli::try_parse_from(["relay", "list", "--status", "failure", "--limit", "5"])
                .unwrap();

        match cli.command {
            RunCommands::List { status, limit, .. } => {
                assert_eq!(status, Some(RunStatus::Failure));
                assert_eq!(limit, Some(5));
            }
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn test_cancel_of_finished_run_is_an_error() {
        let err = cancel_error(
            "#4",
            ClientError::api_error(409, "Run 1f0c is already success"),
        );
        assert_eq!(
            err.to_string(),
            "Run #4 cannot be cancelled: Run 1f0c is already success"
        );

        let err = cancel_error("#4", ClientError::api_error(404, "Run 1f0c not found"));
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_rejects_unknown_outcome() {
        assert!(TestCli::try_parse_from(["relay", "advance", "#1", "--outcome", "maybe"]).is_err());
    }
}

//! Pipeline run domain types and lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::stage::{Stage, StageOutcome, StageStatus, elapsed_ms};
use crate::error::TransitionError;

/// One execution attempt of the pipeline for a commit, branch and environment
///
/// Structure shared between the tracker (owns and mutates) and clients (read).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Uuid,
    /// Sequential display number (`#12`)
    pub number: u64,
    pub status: RunStatus,
    pub branch: String,
    pub environment: String,
    pub triggered_by: String,
    pub commit: CommitInfo,
    pub stages: Vec<Stage>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
}

/// Commit a run was built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

/// Run-level status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Success,
    Failure,
    Cancelled,
}

impl RunStatus {
    pub const ALL: [RunStatus; 5] = [
        RunStatus::Pending,
        RunStatus::Running,
        RunStatus::Success,
        RunStatus::Failure,
        RunStatus::Cancelled,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Success | RunStatus::Failure | RunStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Failure => "failure",
            RunStatus::Cancelled => "cancelled",
        }
    }

    /// Run status as a function of its stages
    ///
    /// `Cancelled` is never derived; only an explicit cancel produces it.
    pub fn derive(stages: &[Stage]) -> RunStatus {
        if stages.iter().any(|s| s.status == StageStatus::Failure) {
            RunStatus::Failure
        } else if stages.iter().all(|s| s.status == StageStatus::Pending) {
            RunStatus::Pending
        } else if stages.iter().all(|s| s.status == StageStatus::Success) {
            RunStatus::Success
        } else {
            RunStatus::Running
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        RunStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == lowered)
            .ok_or_else(|| format!("unknown run status '{}'", s))
    }
}

/// What a successful `advance_stage` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageTransition {
    Started,
    Finished(StageStatus),
}

impl PipelineRun {
    /// Create a pending run with every stage pending
    pub fn new(
        number: u64,
        branch: String,
        environment: String,
        triggered_by: String,
        commit: CommitInfo,
        stage_names: &[String],
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            number,
            status: RunStatus::Pending,
            branch,
            environment,
            triggered_by,
            commit,
            stages: stage_names.iter().map(Stage::pending).collect(),
            start_time: at,
            end_time: None,
            duration_ms: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// The stage currently running, if any
    pub fn running_stage(&self) -> Option<&Stage> {
        self.stages
            .iter()
            .find(|s| s.status == StageStatus::Running)
    }

    /// The stage that may move next: the running one, else the first pending one
    pub fn next_stage(&self) -> Option<&Stage> {
        self.running_stage().or_else(|| {
            self.stages
                .iter()
                .find(|s| s.status == StageStatus::Pending)
        })
    }

    /// Move one stage forward
    ///
    /// The first call on the next pending stage starts it; the next call on the
    /// same stage finishes it with `outcome`. A failed stage skips every stage
    /// after it. `logs` are appended to the stage either way.
    pub fn advance_stage(
        &mut self,
        stage_name: &str,
        outcome: StageOutcome,
        logs: Vec<String>,
        at: DateTime<Utc>,
    ) -> Result<StageTransition, TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::AlreadyTerminal {
                run_id: self.id,
                status: self.status,
            });
        }

        let index = self
            .stages
            .iter()
            .position(|s| s.name == stage_name)
            .ok_or_else(|| TransitionError::UnknownStage(stage_name.to_string()))?;

        let expected = self
            .stages
            .iter()
            .position(|s| s.status == StageStatus::Running)
            .or_else(|| {
                self.stages
                    .iter()
                    .position(|s| s.status == StageStatus::Pending)
            });

        if expected != Some(index) {
            return Err(TransitionError::InvalidTransition {
                stage: stage_name.to_string(),
                expected: expected
                    .map(|i| self.stages[i].name.clone())
                    .unwrap_or_else(|| "none".to_string()),
            });
        }

        // Stage timing never precedes the run's own start.
        let at = at.max(self.start_time);

        let transition = match self.stages[index].status {
            StageStatus::Pending => {
                self.stages[index].start(at);
                StageTransition::Started
            }
            _ => {
                let status = StageStatus::from(outcome);
                self.stages[index].finish(status, at);
                if status == StageStatus::Failure {
                    for later in &mut self.stages[index + 1..] {
                        later.finish(StageStatus::Skipped, at);
                    }
                }
                StageTransition::Finished(status)
            }
        };
        self.stages[index].logs.extend(logs);

        self.status = RunStatus::derive(&self.stages);
        if self.is_terminal() {
            self.close(at);
        }

        Ok(transition)
    }

    /// Cancel a run that has not finished yet
    ///
    /// The running stage and every pending stage are marked skipped.
    pub fn cancel(&mut self, at: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::AlreadyTerminal {
                run_id: self.id,
                status: self.status,
            });
        }

        let at = at.max(self.start_time);
        for stage in self.stages.iter_mut().filter(|s| !s.status.is_terminal()) {
            stage.finish(StageStatus::Skipped, at);
        }
        self.status = RunStatus::Cancelled;
        self.close(at);

        Ok(())
    }

    fn close(&mut self, at: DateTime<Utc>) {
        let end = at.max(self.start_time);
        self.end_time = Some(end);
        self.duration_ms = Some(elapsed_ms(self.start_time, end));
    }
}

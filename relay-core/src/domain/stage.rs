//! Stage domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One named, ordered step of a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub status: StageStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<String>,
}

/// Stage execution status
///
/// Stages only move forward: `Pending -> Running -> {Success, Failure, Skipped}`,
/// or straight from `Pending` to `Skipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Running,
    Success,
    Failure,
    Skipped,
}

impl StageStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StageStatus::Success | StageStatus::Failure | StageStatus::Skipped
        )
    }

    /// Position in the forward-only lifecycle. Terminal states share a rank.
    pub fn rank(self) -> u8 {
        match self {
            StageStatus::Pending => 0,
            StageStatus::Running => 1,
            StageStatus::Success | StageStatus::Failure | StageStatus::Skipped => 2,
        }
    }
}

/// How a running stage finished
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageOutcome {
    #[default]
    Success,
    Failure,
}

impl From<StageOutcome> for StageStatus {
    fn from(outcome: StageOutcome) -> Self {
        match outcome {
            StageOutcome::Success => StageStatus::Success,
            StageOutcome::Failure => StageStatus::Failure,
        }
    }
}

impl std::str::FromStr for StageOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "success" => Ok(StageOutcome::Success),
            "failure" => Ok(StageOutcome::Failure),
            other => Err(format!(
                "unknown outcome '{}' (expected success or failure)",
                other
            )),
        }
    }
}

impl Stage {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StageStatus::Pending,
            start_time: None,
            end_time: None,
            duration_ms: None,
            logs: Vec::new(),
        }
    }

    pub(crate) fn start(&mut self, at: DateTime<Utc>) {
        self.status = StageStatus::Running;
        self.start_time = Some(at);
    }

    pub(crate) fn finish(&mut self, status: StageStatus, at: DateTime<Utc>) {
        debug_assert!(status.is_terminal());
        self.status = status;

        // Never-started stages (skipped while pending) carry no timing.
        if let Some(start) = self.start_time {
            let end = at.max(start);
            self.end_time = Some(end);
            self.duration_ms = Some(elapsed_ms(start, end));
        }
    }
}

/// Milliseconds between two instants, with `end >= start`
pub(crate) fn elapsed_ms(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    end.signed_duration_since(start)
        .num_milliseconds()
        .max(0) as u64
}

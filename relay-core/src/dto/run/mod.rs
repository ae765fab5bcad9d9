//! Run DTOs

use serde::{Deserialize, Serialize};

use crate::domain::run::CommitInfo;
use crate::domain::stage::StageOutcome;

/// Request to trigger a new pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRun {
    pub branch: String,
    pub environment: String,
    pub triggered_by: String,
    /// Omitted for manual triggers; the tracker synthesizes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<CommitInfo>,
}

/// Request to move a run's stage one step forward
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceStage {
    pub stage: String,
    /// Only consulted when the call finishes a running stage
    #[serde(default)]
    pub outcome: StageOutcome,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<String>,
}

impl AdvanceStage {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            outcome: StageOutcome::Success,
            logs: Vec::new(),
        }
    }

    pub fn with_outcome(mut self, outcome: StageOutcome) -> Self {
        self.outcome = outcome;
        self
    }
}

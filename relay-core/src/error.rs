//! Error types for run state transitions

use thiserror::Error;
use uuid::Uuid;

use crate::domain::run::RunStatus;

/// Reasons a run refuses a stage transition or cancellation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The run already reached `success`, `failure` or `cancelled`
    #[error("Run {run_id} is already {status}")]
    AlreadyTerminal { run_id: Uuid, status: RunStatus },

    /// The pipeline has no stage with this name
    #[error("Unknown stage '{0}'")]
    UnknownStage(String),

    /// The stage exists but is not the one that may move next
    #[error("Stage '{stage}' cannot advance now (expected '{expected}')")]
    InvalidTransition { stage: String, expected: String },
}

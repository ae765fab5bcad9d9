//! Health DTO

use serde::{Deserialize, Serialize};

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    /// Number of runs currently tracked
    pub runs: usize,
}

impl HealthStatus {
    pub fn ok(runs: usize) -> Self {
        Self {
            status: "ok".to_string(),
            runs,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

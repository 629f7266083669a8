use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::DashboardError;

/// The sub-collections a task moves through inside a queue. Each one is a
/// list of task ids under `<prefix>:<queue>:<stage>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleStage {
    Pending,
    Scheduled,
    Active,
    Completed,
    Failed,
}

// -----------------------------------------------------------------------------
// ----- LifecycleStage: Static ------------------------------------------------

impl LifecycleStage {
    pub const ALL: [LifecycleStage; 5] = [
        LifecycleStage::Pending,
        LifecycleStage::Scheduled,
        LifecycleStage::Active,
        LifecycleStage::Completed,
        LifecycleStage::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleStage::Pending => "pending",
            LifecycleStage::Scheduled => "scheduled",
            LifecycleStage::Active => "active",
            LifecycleStage::Completed => "completed",
            LifecycleStage::Failed => "failed",
        }
    }
}

impl FromStr for LifecycleStage {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LifecycleStage::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DashboardError::InvalidStage(s.to_string()))
    }
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------

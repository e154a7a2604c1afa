//! Task state machine for the in-memory broker.

use serde::{Deserialize, Serialize};

use crate::domain::TaskStatus;

/// State transitions:
/// - Open -> Processing -> Completed
/// - Open -> Processing -> Failed
/// - Open -> Processing -> Open (recovered after the holder stalled)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Waiting to be claimed.
    Open,

    /// Claimed by a worker.
    Processing,

    Completed,

    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }

    pub fn is_claimable(self) -> bool {
        matches!(self, TaskState::Open)
    }
}

impl From<TaskStatus> for TaskState {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Completed => TaskState::Completed,
            TaskStatus::Failed => TaskState::Failed,
        }
    }
}

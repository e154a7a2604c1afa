//! Completion report shapes: what a finished task hands back to the broker.

use serde::{Deserialize, Serialize};

use super::errors::ExecutionError;

/// Terminal status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Completed,
    Failed,
}

/// Error as reported to the broker: name and message only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedError {
    pub name: String,
    pub message: String,
}

impl From<&ExecutionError> for SerializedError {
    fn from(error: &ExecutionError) -> Self {
        Self {
            name: error.name().to_string(),
            message: error.message().to_string(),
        }
    }
}

/// Successful runner result.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkflowResponse {
    #[serde(default)]
    pub output: serde_json::Value,
}

impl WorkflowResponse {
    pub fn new(output: serde_json::Value) -> Self {
        Self { output }
    }
}

/// Payload passed to `TaskContext::complete`.
///
/// Serializes as `{"status": "completed", "output": ..}` or
/// `{"status": "failed", "error": {"name": .., "message": ..}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskResult {
    Completed { output: serde_json::Value },
    Failed { error: SerializedError },
}

impl TaskResult {
    pub fn completed(output: serde_json::Value) -> Self {
        Self::Completed { output }
    }

    pub fn failed(error: &ExecutionError) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    pub fn status(&self) -> TaskStatus {
        match self {
            Self::Completed { .. } => TaskStatus::Completed,
            Self::Failed { .. } => TaskStatus::Failed,
        }
    }
}

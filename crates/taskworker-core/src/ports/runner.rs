//! WorkflowRunner port - task の中身を解釈して実行する

use async_trait::async_trait;

use super::broker::TaskContext;
use crate::domain::{ExecutionError, WorkflowResponse};

/// Executes a task's specification.
///
/// The worker has already validated `api_version` before calling this.
/// Errors are reported on the task, never retried here.
#[async_trait]
pub trait WorkflowRunner: Send + Sync {
    async fn execute(&self, task: &dyn TaskContext) -> Result<WorkflowResponse, ExecutionError>;
}

//! TaskExecutor - 1 件の task を最後まで面倒を見る
//!
//! audit open → apiVersion 検証 → runner 実行 → complete と audit finalize.
//! どんな結果でも `complete` はちょうど 1 回呼ばれ、エラーはここから外へ出ない。
//! Retry はしない（broker か上位層の仕事）。

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::domain::{ExecutionError, TaskId, TaskResult, TaskStatus, WorkflowResponse};
use crate::ports::{
    AuditError, AuditEvent, AuditEventDescriptor, Auditor, TaskContext, WorkflowRunner,
};

pub struct TaskExecutor {
    runner: Arc<dyn WorkflowRunner>,
    auditor: Option<Arc<dyn Auditor>>,
}

impl TaskExecutor {
    pub fn new(runner: Arc<dyn WorkflowRunner>, auditor: Option<Arc<dyn Auditor>>) -> Self {
        Self { runner, auditor }
    }

    /// Run one claimed task and report its outcome to the broker.
    ///
    /// Returns the status that was reported.
    pub async fn run_one_task(&self, task: Box<dyn TaskContext>) -> TaskStatus {
        let task_id = task.task_id();
        let audit_event = self.open_audit_event(task.as_ref()).await;

        let (report, error) = match self.execute(task.as_ref()).await {
            Ok(response) => (TaskResult::completed(response.output), None),
            Err(error) => (TaskResult::failed(&error), Some(error)),
        };
        let status = report.status();

        match &error {
            None => info!(task_id = %task_id, "task completed"),
            Some(error) => info!(
                task_id = %task_id,
                error.name = error.name(),
                error.message = error.message(),
                "task failed"
            ),
        }

        // 成功時は complete → audit、失敗時は audit → complete
        match error {
            None => {
                report_completion(task, report).await;
                if let Some(event) = audit_event {
                    finalize_audit(task_id, event.success().await);
                }
            }
            Some(error) => {
                if let Some(event) = audit_event {
                    finalize_audit(task_id, event.fail(&error).await);
                }
                report_completion(task, report).await;
            }
        }

        status
    }

    async fn open_audit_event(&self, task: &dyn TaskContext) -> Option<Box<dyn AuditEvent>> {
        let auditor = self.auditor.as_ref()?;
        let spec = task.spec();
        let descriptor = AuditEventDescriptor::task_execution(
            task.task_id(),
            task.created_by(),
            &spec.parameters,
            spec.template_ref(),
        );
        match auditor.create_event(descriptor).await {
            Ok(event) => Some(event),
            Err(e) => {
                // 監査は best effort: 失敗しても実行は続ける
                warn!(task_id = %task.task_id(), error = %e, "failed to open audit event");
                None
            }
        }
    }

    async fn execute(&self, task: &dyn TaskContext) -> Result<WorkflowResponse, ExecutionError> {
        let spec = task.spec();
        if !spec.is_supported() {
            return Err(ExecutionError::unsupported_api_version(&spec.api_version));
        }

        debug!(task_id = %task.task_id(), "executing task");
        match AssertUnwindSafe(self.runner.execute(task)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(ExecutionError::panicked(panic_message(payload.as_ref()))),
        }
    }
}

async fn report_completion(task: Box<dyn TaskContext>, report: TaskResult) {
    let task_id = task.task_id();
    if let Err(e) = task.complete(report).await {
        warn!(task_id = %task_id, error = %e, "failed to report task completion");
    }
}

fn finalize_audit(task_id: TaskId, finalized: Result<(), AuditError>) {
    if let Err(e) = finalized {
        warn!(task_id = %task_id, error = %e, "failed to finalize audit event");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "runner panicked".to_string()
    }
}

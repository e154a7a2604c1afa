//! TaskBroker port - タスクの供給・回収・完了記録
//!
//! Broker は task のライフサイクルの正本。Worker は claim で所有権を受け取り、
//! `complete` で返すだけ。

use async_trait::async_trait;

use crate::domain::{TaskId, TaskResult, TaskSpec};

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("task {0} is no longer held by this claim")]
    StaleClaim(TaskId),

    #[error("task {0} not found")]
    NotFound(TaskId),

    #[error("broker unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Other(String),
}

/// A claimed task.
///
/// The worker owns the box between claim and completion. `complete` consumes
/// it, so a task can be completed at most once.
#[async_trait]
pub trait TaskContext: Send + Sync {
    fn task_id(&self) -> TaskId;

    /// Identity of whoever created the task, if known.
    fn created_by(&self) -> Option<&str>;

    fn spec(&self) -> &TaskSpec;

    /// Report the terminal outcome.
    async fn complete(self: Box<Self>, result: TaskResult) -> Result<(), BrokerError>;
}

/// Task queue seen from the worker.
#[async_trait]
pub trait TaskBroker: Send + Sync {
    /// Wait until a task is available and take exclusive ownership of it.
    async fn claim(&self) -> Result<Box<dyn TaskContext>, BrokerError>;

    /// Whether `recover_tasks` does anything. Queried once when the worker is built.
    fn supports_recovery(&self) -> bool {
        false
    }

    /// Requeue tasks whose holder died or stalled. Best effort and idempotent.
    async fn recover_tasks(&self) -> Result<(), BrokerError> {
        Ok(())
    }
}

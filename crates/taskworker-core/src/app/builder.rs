//! TaskWorkerBuilder - worker の組み立て
//!
//! Fail-fast: runner がない・設定が不正、は build() の時点でエラーにする。

use std::sync::Arc;

use super::worker::TaskWorker;
use crate::config::{ConcurrencyLimit, ConfigError, WorkerConfig};
use crate::ports::{Auditor, TaskBroker, WorkflowRunner};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no workflow runner configured")]
    MissingRunner,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// # 使用例
/// ```ignore
/// let worker = TaskWorkerBuilder::new(broker)
///     .runner(runner)
///     .auditor(auditor)
///     .concurrent_tasks_limit(ConcurrencyLimit::Unbounded)
///     .build()?;
/// worker.start();
/// ```
pub struct TaskWorkerBuilder {
    broker: Arc<dyn TaskBroker>,
    runner: Option<Arc<dyn WorkflowRunner>>,
    auditor: Option<Arc<dyn Auditor>>,
    config: WorkerConfig,
}

impl TaskWorkerBuilder {
    pub fn new(broker: Arc<dyn TaskBroker>) -> Self {
        Self {
            broker,
            runner: None,
            auditor: None,
            config: WorkerConfig::default(),
        }
    }

    pub fn runner(mut self, runner: Arc<dyn WorkflowRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn auditor(mut self, auditor: Arc<dyn Auditor>) -> Self {
        self.auditor = Some(auditor);
        self
    }

    /// Replace the whole config.
    pub fn config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn concurrent_tasks_limit(mut self, limit: ConcurrencyLimit) -> Self {
        self.config.concurrent_tasks_limit = limit;
        self
    }

    pub fn graceful_shutdown(mut self, graceful: bool) -> Self {
        self.config.graceful_shutdown = graceful;
        self
    }

    pub fn build(self) -> Result<TaskWorker, BuildError> {
        let runner = self.runner.ok_or(BuildError::MissingRunner)?;
        self.config.validate()?;
        Ok(TaskWorker::new(self.broker, runner, self.auditor, self.config))
    }
}

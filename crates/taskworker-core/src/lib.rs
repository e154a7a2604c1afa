//! taskworker-core
//!
//! Bounded-concurrency task worker: claims tasks from a broker, runs them
//! through a pluggable runner, reports each outcome exactly once.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（TaskId, TaskSpec, TaskResult, ExecutionError）
//! - **ports**: 外部との境界（TaskBroker, TaskContext, WorkflowRunner, Auditor, Clock）
//! - **app**: worker 本体（gate, executor, dispatch/recovery loop, shutdown, builder）
//! - **config**: WorkerConfig
//! - **queue**: 開発・テスト用の InMemoryTaskBroker
//! - **audit**: tracing に書き出す Auditor

pub mod app;
pub mod audit;
pub mod config;
pub mod domain;
pub mod ports;
pub mod queue;

#[cfg(test)]
mod testing;

pub use app::{BuildError, TaskWorker, TaskWorkerBuilder, WorkerState, WorkerStatus};
pub use config::{ConcurrencyLimit, ConfigError, WorkerConfig};

//! Status - worker の状態を外から見るための型

use serde::Serialize;

/// Lifecycle of a worker.
///
/// `Idle` until `start()`, `Running` until `stop()`, then `Draining` while
/// executions are still in flight and `Stopped` once none are left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Idle,
    Running,
    Draining,
    Stopped,
}

impl WorkerState {
    pub(crate) fn derive(started: bool, stopped: bool, outstanding: usize) -> Self {
        match (started, stopped) {
            (false, false) => WorkerState::Idle,
            (true, false) => WorkerState::Running,
            (_, true) if outstanding > 0 => WorkerState::Draining,
            (_, true) => WorkerState::Stopped,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerStatus {
    pub state: WorkerState,
    pub active: usize,
    pub pending: usize,
    /// `None` when unbounded.
    pub limit: Option<usize>,
}

//! TaskWorker - dispatch / recovery / shutdown をまとめた公開 API
//!
//! `start()` で 2 本のバックグラウンドループを spawn し、handle は保持しておく。
//! `stop()` は停止シグナルを立て、graceful なら in-flight task の完了を待つ。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::warn;

use super::dispatch_loop::DispatchLoop;
use super::executor::TaskExecutor;
use super::gate::ConcurrencyGate;
use super::recovery_loop::{self, RecoveryLoop};
use super::shutdown::{ShutdownController, StopSignal};
use super::status::{WorkerState, WorkerStatus};
use crate::config::{ConcurrencyLimit, WorkerConfig};
use crate::ports::{Auditor, TaskBroker, WorkflowRunner};

struct LoopHandles {
    dispatch: JoinHandle<()>,
    recovery: JoinHandle<()>,
}

/// Claims tasks from a broker and runs them with bounded concurrency.
///
/// Build one with [`TaskWorkerBuilder`](super::TaskWorkerBuilder).
pub struct TaskWorker {
    broker: Arc<dyn TaskBroker>,
    executor: Arc<TaskExecutor>,
    gate: Arc<ConcurrencyGate>,
    stop: StopSignal,
    shutdown: ShutdownController,
    config: WorkerConfig,
    recovery_supported: bool,
    started: AtomicBool,
    loops: Mutex<Option<LoopHandles>>,
}

impl TaskWorker {
    pub(crate) fn new(
        broker: Arc<dyn TaskBroker>,
        runner: Arc<dyn WorkflowRunner>,
        auditor: Option<Arc<dyn Auditor>>,
        config: WorkerConfig,
    ) -> Self {
        let gate = ConcurrencyGate::new(config.concurrent_tasks_limit);
        let stop = StopSignal::new();
        let shutdown = ShutdownController::new(
            stop.clone(),
            Arc::clone(&gate),
            config.graceful_shutdown,
            config.drain_poll_interval(),
        );
        Self {
            recovery_supported: broker.supports_recovery(),
            broker,
            executor: Arc::new(TaskExecutor::new(runner, auditor)),
            gate,
            stop,
            shutdown,
            config,
            started: AtomicBool::new(false),
            loops: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Spawn the dispatch and recovery loops. Returns right away.
    ///
    /// Must be called from within a tokio runtime. A second call is ignored.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("task worker already started");
            return;
        }

        let recovery = RecoveryLoop::new(
            Arc::clone(&self.broker),
            self.recovery_supported,
            self.stop.clone(),
            self.config.recovery_interval(),
        );
        let dispatch = DispatchLoop::new(
            Arc::clone(&self.broker),
            Arc::clone(&self.gate),
            Arc::clone(&self.executor),
            self.stop.clone(),
            self.config.claim_retry_backoff(),
        );

        let handles = LoopHandles {
            recovery: tokio::spawn(recovery.run()),
            dispatch: tokio::spawn(dispatch.run()),
        };
        *self.loops.lock().unwrap_or_else(|e| e.into_inner()) = Some(handles);
    }

    /// Stop claiming. See [`ShutdownController::stop`] for graceful mode.
    pub async fn stop(&self) {
        self.shutdown.stop().await;
    }

    /// Wait for both background loops to exit.
    ///
    /// The dispatch loop only exits after an in-progress claim returns, so
    /// this can wait until the broker hands out one more task.
    pub async fn join(&self) {
        let handles = self.loops.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(handles) = handles else {
            return;
        };
        for (name, handle) in [("dispatch", handles.dispatch), ("recovery", handles.recovery)] {
            if let Err(e) = handle.await {
                warn!(loop_name = name, error = %e, "background loop ended abnormally");
            }
        }
    }

    /// Run one recovery attempt now. Errors are logged, never returned.
    pub async fn recover_tasks(&self) {
        recovery_loop::recover_tasks(self.broker.as_ref(), self.recovery_supported).await;
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::derive(
            self.started.load(Ordering::SeqCst),
            self.stop.is_stopped(),
            self.gate.outstanding(),
        )
    }

    pub fn status(&self) -> WorkerStatus {
        WorkerStatus {
            state: self.state(),
            active: self.gate.active(),
            pending: self.gate.pending(),
            limit: match self.gate.limit() {
                ConcurrencyLimit::Bounded(n) => Some(n.get()),
                ConcurrencyLimit::Unbounded => None,
            },
        }
    }
}

//! In-memory broker implementation.
//!
//! claim 中の task は heartbeat を打ち続ける。holder が落ちる（claim が drop
//! される）と heartbeat が止まり、`stale_after` 経過後の recover で再投入される。

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::{QueueCounts, TaskRecord, TaskSnapshot, TaskState};
use crate::domain::{TaskId, TaskResult, TaskSpec};
use crate::ports::{
    BrokerError, Clock, IdGenerator, SystemClock, TaskBroker, TaskContext, UlidGenerator,
};

/// Claims without a heartbeat for this long are considered abandoned by `recover_tasks`.
pub const DEFAULT_STALE_AFTER_SECS: i64 = 30;

/// How often a live claim refreshes its heartbeat.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Finished tasks are dropped by `recover_tasks` after this long.
pub const DEFAULT_RETAIN_FINISHED_SECS: i64 = 60 * 60;

const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Default)]
struct BrokerState {
    records: HashMap<TaskId, TaskRecord>,
    open: VecDeque<TaskId>,
}

impl BrokerState {
    fn counts(&self) -> QueueCounts {
        let mut counts = QueueCounts::default();
        for record in self.records.values() {
            match record.state {
                TaskState::Open => counts.open += 1,
                TaskState::Processing => counts.processing += 1,
                TaskState::Completed => counts.completed += 1,
                TaskState::Failed => counts.failed += 1,
            }
        }
        counts
    }

    /// Requeue every stale claim. Returns the requeued ids.
    fn requeue_stale(&mut self, cutoff: DateTime<Utc>) -> Vec<TaskId> {
        let mut recovered = Vec::new();
        for record in self.records.values_mut() {
            if record.is_stale(cutoff) {
                record.requeue();
                recovered.push(record.task_id);
            }
        }
        // 古い順に再配送
        recovered.sort();
        self.open.extend(recovered.iter().copied());
        recovered
    }

    /// Forget finished tasks. Returns how many were dropped.
    fn prune_finished(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_expired(cutoff));
        before - self.records.len()
    }
}

/// Process-local broker for development and tests.
///
/// Nothing is persisted. Finished tasks stay observable through `snapshot`
/// and `counts` until the retention window passes, then the next
/// `recover_tasks` drops them.
pub struct InMemoryTaskBroker {
    state: Arc<Mutex<BrokerState>>,
    notify: Arc<Notify>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    stale_after: chrono::Duration,
    heartbeat_interval: Duration,
    retain_finished: chrono::Duration,
}

impl InMemoryTaskBroker {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(BrokerState::default())),
            notify: Arc::new(Notify::new()),
            ids: Arc::new(UlidGenerator::new(Arc::clone(&clock))),
            clock,
            stale_after: chrono::Duration::seconds(DEFAULT_STALE_AFTER_SECS),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            retain_finished: chrono::Duration::seconds(DEFAULT_RETAIN_FINISHED_SECS),
        }
    }

    /// Also shortens the heartbeat interval so that a live claim beats at
    /// least three times per `stale_after`.
    pub fn with_stale_after(mut self, stale_after: chrono::Duration) -> Self {
        self.stale_after = stale_after;
        let third = (stale_after / 3).to_std().unwrap_or(MIN_HEARTBEAT_INTERVAL);
        self.heartbeat_interval = self.heartbeat_interval.min(third).max(MIN_HEARTBEAT_INTERVAL);
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval.max(MIN_HEARTBEAT_INTERVAL);
        self
    }

    pub fn with_retention(mut self, retain_finished: chrono::Duration) -> Self {
        self.retain_finished = retain_finished;
        self
    }

    /// Add a task to the open queue.
    pub async fn dispatch(&self, spec: TaskSpec, created_by: Option<&str>) -> TaskId {
        let task_id = self.ids.generate_task_id();
        let record = TaskRecord::new(
            task_id,
            spec,
            created_by.map(str::to_string),
            self.clock.now(),
        );
        {
            let mut state = self.state.lock().await;
            state.records.insert(task_id, record);
            state.open.push_back(task_id);
        }
        self.notify.notify_one();
        debug!(task_id = %task_id, "task dispatched");
        task_id
    }

    pub async fn snapshot(&self, task_id: TaskId) -> Option<TaskSnapshot> {
        let state = self.state.lock().await;
        state.records.get(&task_id).map(TaskRecord::snapshot)
    }

    pub async fn counts(&self) -> QueueCounts {
        self.state.lock().await.counts()
    }

    fn start_heartbeat(&self, task_id: TaskId, claim: u64) -> Heartbeat {
        let state = Arc::clone(&self.state);
        let clock = Arc::clone(&self.clock);
        let every = self.heartbeat_interval;
        Heartbeat(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let mut state = state.lock().await;
                let held = state
                    .records
                    .get_mut(&task_id)
                    .is_some_and(|record| record.beat(claim, clock.now()));
                if !held {
                    debug!(task_id = %task_id, claim, "claim superseded, heartbeat stopped");
                    break;
                }
            }
        }))
    }
}

impl Default for InMemoryTaskBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskBroker for InMemoryTaskBroker {
    async fn claim(&self) -> Result<Box<dyn TaskContext>, BrokerError> {
        loop {
            {
                let mut state = self.state.lock().await;
                while let Some(task_id) = state.open.pop_front() {
                    let Some(record) = state.records.get_mut(&task_id) else {
                        continue;
                    };
                    if !record.state.is_claimable() {
                        continue;
                    }
                    let claim = record.start_claim(self.clock.now());
                    return Ok(Box::new(InMemoryClaim {
                        task_id,
                        claim,
                        spec: record.spec.clone(),
                        created_by: record.created_by.clone(),
                        state: Arc::clone(&self.state),
                        clock: Arc::clone(&self.clock),
                        _heartbeat: self.start_heartbeat(task_id, claim),
                    }));
                }
            }
            self.notify.notified().await;
        }
    }

    fn supports_recovery(&self) -> bool {
        true
    }

    async fn recover_tasks(&self) -> Result<(), BrokerError> {
        let now = self.clock.now();
        let (recovered, pruned) = {
            let mut state = self.state.lock().await;
            let recovered = state.requeue_stale(now - self.stale_after);
            let pruned = state.prune_finished(now - self.retain_finished);
            (recovered, pruned)
        };
        if pruned > 0 {
            debug!(count = pruned, "pruned finished tasks");
        }
        if !recovered.is_empty() {
            info!(count = recovered.len(), "requeued stalled tasks");
            for _ in &recovered {
                self.notify.notify_one();
            }
        }
        Ok(())
    }
}

/// Heartbeat ticker of one claim. Stops when the claim goes away.
struct Heartbeat(JoinHandle<()>);

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// A claim handed out by `InMemoryTaskBroker`.
struct InMemoryClaim {
    task_id: TaskId,
    claim: u64,
    spec: TaskSpec,
    created_by: Option<String>,
    state: Arc<Mutex<BrokerState>>,
    clock: Arc<dyn Clock>,
    _heartbeat: Heartbeat,
}

#[async_trait]
impl TaskContext for InMemoryClaim {
    fn task_id(&self) -> TaskId {
        self.task_id
    }

    fn created_by(&self) -> Option<&str> {
        self.created_by.as_deref()
    }

    fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    async fn complete(self: Box<Self>, result: TaskResult) -> Result<(), BrokerError> {
        let mut state = self.state.lock().await;
        let record = state
            .records
            .get_mut(&self.task_id)
            .ok_or(BrokerError::NotFound(self.task_id))?;

        // recover 後に別の claim が発行されていたら、この報告は無効
        if !record.is_held_by(self.claim) {
            return Err(BrokerError::StaleClaim(self.task_id));
        }
        record.finish(result, self.clock.now());
        Ok(())
    }
}

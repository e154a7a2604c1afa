//! Task record: spec + broker-side bookkeeping.

use chrono::{DateTime, Utc};

use super::TaskState;
use crate::domain::{TaskId, TaskResult, TaskSpec};

/// Single source of truth for one task inside the broker.
/// The open queue holds TaskIds only; every transition happens here.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub spec: TaskSpec,
    pub created_by: Option<String>,
    pub state: TaskState,

    /// Bumped on every claim. A completion must carry the current value.
    pub claim: u64,

    /// Last sign of life from the current holder. Set on claim.
    pub heartbeat_at: Option<DateTime<Utc>>,

    pub result: Option<TaskResult>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    pub fn new(
        task_id: TaskId,
        spec: TaskSpec,
        created_by: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id,
            spec,
            created_by,
            state: TaskState::Open,
            claim: 0,
            heartbeat_at: None,
            result: None,
            created_at: now,
            finished_at: None,
        }
    }

    /// Open -> Processing. Returns the new claim generation.
    pub fn start_claim(&mut self, now: DateTime<Utc>) -> u64 {
        self.state = TaskState::Processing;
        self.claim += 1;
        self.heartbeat_at = Some(now);
        self.claim
    }

    /// Whether `claim` is the generation currently holding the task.
    pub fn is_held_by(&self, claim: u64) -> bool {
        self.state == TaskState::Processing && self.claim == claim
    }

    /// Refresh the holder's heartbeat. False once `claim` no longer holds the task.
    pub fn beat(&mut self, claim: u64, now: DateTime<Utc>) -> bool {
        if !self.is_held_by(claim) {
            return false;
        }
        self.heartbeat_at = Some(now);
        true
    }

    pub fn finish(&mut self, result: TaskResult, now: DateTime<Utc>) {
        self.state = result.status().into();
        self.result = Some(result);
        self.finished_at = Some(now);
    }

    /// Processing -> Open.
    pub fn requeue(&mut self) {
        self.state = TaskState::Open;
        self.heartbeat_at = None;
    }

    /// Still processing, and the last heartbeat is at or before `cutoff`.
    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        self.state == TaskState::Processing && self.heartbeat_at.is_some_and(|at| at <= cutoff)
    }

    /// Finished at or before `cutoff`.
    pub fn is_expired(&self, cutoff: DateTime<Utc>) -> bool {
        self.state.is_terminal() && self.finished_at.is_some_and(|at| at <= cutoff)
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            state: self.state,
            claims: self.claim,
            result: self.result.clone(),
            created_at: self.created_at,
            finished_at: self.finished_at,
        }
    }
}

/// What callers outside the broker get to see.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot {
    pub state: TaskState,
    pub claims: u64,
    pub result: Option<TaskResult>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

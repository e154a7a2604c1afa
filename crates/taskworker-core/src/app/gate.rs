//! ConcurrencyGate - 同時実行数の上限管理
//!
//! カウンタだけを持ち、task のデータは持たない。
//! `active` は実行中の数、`pending` は admit を待っている数。
//! Slot が空くたびに `Notify` で待機者を1つ起こす。
//!
//! Counters live behind a `std::sync::Mutex` that is never held across `.await`.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;

use crate::config::ConcurrencyLimit;

#[derive(Debug, Default)]
struct GateState {
    active: usize,
    pending: usize,
}

/// Bounded pool of execution slots.
#[derive(Debug)]
pub struct ConcurrencyGate {
    limit: ConcurrencyLimit,
    state: Mutex<GateState>,
    slot_freed: Notify,
}

impl ConcurrencyGate {
    pub fn new(limit: ConcurrencyLimit) -> Arc<Self> {
        Arc::new(Self {
            limit,
            state: Mutex::new(GateState::default()),
            slot_freed: Notify::new(),
        })
    }

    fn state(&self) -> MutexGuard<'_, GateState> {
        // counters stay consistent even if a holder panicked
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn limit(&self) -> ConcurrencyLimit {
        self.limit
    }

    pub fn active(&self) -> usize {
        self.state().active
    }

    pub fn pending(&self) -> usize {
        self.state().pending
    }

    /// Work the gate still has to see through: running plus waiting for a slot.
    pub fn outstanding(&self) -> usize {
        let state = self.state();
        state.active + state.pending
    }

    pub fn has_capacity(&self) -> bool {
        self.limit.has_room(self.state().active)
    }

    /// Take a slot if one is free right now.
    pub fn try_admit(self: &Arc<Self>) -> Option<GatePermit> {
        let mut state = self.state();
        if !self.limit.has_room(state.active) {
            return None;
        }
        state.active += 1;
        Some(GatePermit {
            gate: Arc::clone(self),
        })
    }

    /// Wait until a slot is free, without taking it.
    ///
    /// Returns immediately when there is room. Otherwise resolves on the next
    /// release that leaves room.
    pub async fn ready(&self) {
        loop {
            let notified = self.slot_freed.notified();
            tokio::pin!(notified);
            // register before checking so a release in between is not missed
            notified.as_mut().enable();
            if self.has_capacity() {
                return;
            }
            notified.await;
        }
    }

    /// Take a slot, waiting for one if the gate is full.
    pub async fn admit(self: &Arc<Self>) -> GatePermit {
        let _pending = PendingGuard::new(self);
        loop {
            let notified = self.slot_freed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if let Some(permit) = self.try_admit() {
                return permit;
            }
            notified.await;
        }
    }

    fn release(&self) {
        {
            let mut state = self.state();
            state.active = state.active.saturating_sub(1);
        }
        self.slot_freed.notify_one();
    }
}

/// One occupied slot. Dropping it releases the slot.
#[derive(Debug)]
pub struct GatePermit {
    gate: Arc<ConcurrencyGate>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.gate.release();
    }
}

struct PendingGuard<'a> {
    gate: &'a ConcurrencyGate,
}

impl<'a> PendingGuard<'a> {
    fn new(gate: &'a ConcurrencyGate) -> Self {
        gate.state().pending += 1;
        Self { gate }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.gate.state();
        state.pending = state.pending.saturating_sub(1);
    }
}

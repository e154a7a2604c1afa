//! In-memory task broker: state machine, records, and the broker itself.
//!
//! 開発・テスト用。永続化はしない（プロセスが落ちれば task も消える）。

mod memory;
mod record;
mod state;

pub use memory::InMemoryTaskBroker;
pub use record::{TaskRecord, TaskSnapshot};
pub use state::TaskState;

use serde::{Deserialize, Serialize};

/// Number of tasks per state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub open: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

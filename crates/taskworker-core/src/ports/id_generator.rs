//! IdGenerator port - TaskId の発行
//!
//! Clock から timestamp 部分を作るので、FixedClock を使うと時刻部分が決定的になる。

use std::sync::Arc;

use ulid::Ulid;

use super::Clock;
use crate::domain::TaskId;

pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> TaskId;
}

/// ULID based generator.
pub struct UlidGenerator {
    clock: Arc<dyn Clock>,
}

impl UlidGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl IdGenerator for UlidGenerator {
    fn generate_task_id(&self) -> TaskId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        TaskId::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}

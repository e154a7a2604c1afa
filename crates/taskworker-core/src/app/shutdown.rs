//! Shutdown - 停止シグナルと graceful drain
//!
//! 停止シグナルは write-once: 一度 true になったら戻らない。
//! Loop はイテレーションの境目でしか見ないので、進行中の claim や sleep は中断しない。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use super::gate::ConcurrencyGate;

/// Process-wide stop flag shared by the background loops.
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn stop(&self) {
        // send_replace works with no receivers alive
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Raises the stop signal and, when graceful, waits for the gate to drain.
pub struct ShutdownController {
    signal: StopSignal,
    gate: Arc<ConcurrencyGate>,
    graceful: bool,
    poll_interval: Duration,
}

impl ShutdownController {
    pub fn new(
        signal: StopSignal,
        gate: Arc<ConcurrencyGate>,
        graceful: bool,
        poll_interval: Duration,
    ) -> Self {
        Self {
            signal,
            gate,
            graceful,
            poll_interval,
        }
    }

    /// Stop taking new work.
    ///
    /// Graceful mode polls until no execution is outstanding. There is no
    /// timeout: a stuck execution keeps this waiting.
    pub async fn stop(&self) {
        self.signal.stop();
        info!(graceful = self.graceful, "stop requested");
        if !self.graceful {
            return;
        }

        loop {
            let outstanding = self.gate.outstanding();
            if outstanding == 0 {
                break;
            }
            debug!(outstanding, "waiting for in-flight tasks");
            tokio::time::sleep(self.poll_interval).await;
        }
        info!("all in-flight tasks finished");
    }
}

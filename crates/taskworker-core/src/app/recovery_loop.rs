//! RecoveryLoop - 定期的に broker へ孤児 task の再投入を頼む
//!
//! エラーはログに出して次の周期でまたやる。ループは止めない。

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use super::shutdown::StopSignal;
use crate::ports::TaskBroker;

pub struct RecoveryLoop {
    broker: Arc<dyn TaskBroker>,
    supported: bool,
    stop: StopSignal,
    interval: Duration,
}

impl RecoveryLoop {
    /// `supported` is the broker's capability, resolved once by the caller.
    pub fn new(
        broker: Arc<dyn TaskBroker>,
        supported: bool,
        stop: StopSignal,
        interval: Duration,
    ) -> Self {
        Self {
            broker,
            supported,
            stop,
            interval,
        }
    }

    pub async fn run(self) {
        info!(interval = ?self.interval, supported = self.supported, "recovery loop started");
        while !self.stop.is_stopped() {
            tokio::time::sleep(self.interval).await;
            if self.stop.is_stopped() {
                break;
            }
            recover_tasks(self.broker.as_ref(), self.supported).await;
        }
        info!("recovery loop stopped");
    }
}

/// One recovery attempt. Never fails: errors are logged and dropped.
pub(crate) async fn recover_tasks(broker: &dyn TaskBroker, supported: bool) {
    if !supported {
        return;
    }
    match broker.recover_tasks().await {
        Ok(()) => debug!("task recovery finished"),
        Err(e) => error!(error = %e, "task recovery failed"),
    }
}

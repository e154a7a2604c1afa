//! DispatchLoop - 空き slot 待ち → claim → 実行を投げる、の繰り返し
//!
//! # フロー
//! 1. Gate に空きができるまで待つ（backpressure）
//! 2. 起きたら停止シグナルを再確認
//! 3. Broker から claim（ブロックする。stop では中断しない）
//! 4. Gate に admit して executor を spawn（完了は待たない）

use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, error, info, info_span};

use super::executor::TaskExecutor;
use super::gate::ConcurrencyGate;
use super::shutdown::StopSignal;
use crate::ports::TaskBroker;

pub struct DispatchLoop {
    broker: Arc<dyn TaskBroker>,
    gate: Arc<ConcurrencyGate>,
    executor: Arc<TaskExecutor>,
    stop: StopSignal,
    claim_retry_backoff: Duration,
}

impl DispatchLoop {
    pub fn new(
        broker: Arc<dyn TaskBroker>,
        gate: Arc<ConcurrencyGate>,
        executor: Arc<TaskExecutor>,
        stop: StopSignal,
        claim_retry_backoff: Duration,
    ) -> Self {
        Self {
            broker,
            gate,
            executor,
            stop,
            claim_retry_backoff,
        }
    }

    pub async fn run(self) {
        info!(limit = %self.gate.limit(), "dispatch loop started");
        while !self.stop.is_stopped() {
            self.gate.ready().await;
            if self.stop.is_stopped() {
                break;
            }

            let task = match self.broker.claim().await {
                Ok(task) => task,
                Err(e) => {
                    error!(error = %e, "failed to claim task");
                    tokio::time::sleep(self.claim_retry_backoff).await;
                    continue;
                }
            };

            // stop が claim 中に来ても、受け取った task は実行する（手放すと孤児になる）
            let permit = self.gate.admit().await;
            let executor = Arc::clone(&self.executor);
            let span = info_span!("task", task_id = %task.task_id());
            tokio::spawn(
                async move {
                    let _permit = permit;
                    executor.run_one_task(task).await;
                }
                .instrument(span),
            );
        }
        info!("dispatch loop stopped");
    }
}

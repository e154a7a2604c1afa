use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use taskworker_core::audit::TracingAuditor;
use taskworker_core::domain::{ExecutionError, TaskSpec, WorkflowResponse};
use taskworker_core::ports::{TaskContext, WorkflowRunner};
use taskworker_core::queue::InMemoryTaskBroker;
use taskworker_core::{TaskWorkerBuilder, WorkerConfig};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HelloParameters {
    name: String,
    #[serde(default)]
    delay_ms: u64,
}

/// Greets `parameters.name` after `parameters.delayMs`.
struct HelloRunner;

#[async_trait]
impl WorkflowRunner for HelloRunner {
    async fn execute(&self, task: &dyn TaskContext) -> Result<WorkflowResponse, ExecutionError> {
        let params: HelloParameters = serde_json::from_value(task.spec().parameters.clone())
            .map_err(|e| ExecutionError::new("InputError", format!("bad parameters: {e}")))?;
        if params.name.is_empty() {
            return Err(ExecutionError::new("InputError", "name must not be empty"));
        }

        tokio::time::sleep(Duration::from_millis(params.delay_ms)).await;
        Ok(WorkflowResponse::new(serde_json::json!({
            "greeting": format!("Hello, {}!", params.name),
        })))
    }
}

fn load_config() -> anyhow::Result<WorkerConfig> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(WorkerConfig::default());
    };
    let json = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    WorkerConfig::from_json(&json).with_context(|| format!("parsing {path}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // (A) 設定と broker
    let config = WorkerConfig {
        graceful_shutdown: true,
        ..load_config()?
    };
    let broker = Arc::new(InMemoryTaskBroker::new());

    // (B) worker を組み立てて起動
    let worker = TaskWorkerBuilder::new(broker.clone())
        .runner(Arc::new(HelloRunner))
        .auditor(Arc::new(TracingAuditor::new()))
        .config(config)
        .build()?;
    worker.start();

    // (C) タスク投入: 成功・入力エラー・未対応 apiVersion
    let names = ["world", "tokio", "", "ferris", "serde"];
    for (i, name) in names.iter().enumerate() {
        let params = serde_json::json!({ "name": name, "delayMs": 200 * (i as u64 + 1) });
        broker
            .dispatch(
                TaskSpec::new(params).with_template_ref("template:default/hello"),
                Some("user:default/cli"),
            )
            .await;
    }
    broker
        .dispatch(TaskSpec::with_api_version("v1beta2", serde_json::json!({})), None)
        .await;
    let total = names.len() + 1;

    // (D) 全部終わるか Ctrl-C まで待つ
    tokio::select! {
        _ = async {
            loop {
                let counts = broker.counts().await;
                if counts.completed + counts.failed == total {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        } => info!("all tasks finished"),
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }

    // (E) graceful shutdown
    worker.stop().await;
    let counts = broker.counts().await;
    info!(
        completed = counts.completed,
        failed = counts.failed,
        open = counts.open,
        "worker stopped"
    );
    println!("{}", serde_json::to_string_pretty(&counts)?);
    Ok(())
}

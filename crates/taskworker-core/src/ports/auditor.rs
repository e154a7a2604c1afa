//! Auditor port - task 実行ごとの監査イベント
//!
//! Optional. Worker は auditor がなければ何もしない。

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{ExecutionError, TaskId};

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Metadata captured when the event is opened. Never changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditMeta {
    pub action_type: String,
    pub task_id: TaskId,
    pub created_by: Option<String>,
    pub task_parameters: serde_json::Value,
    pub template_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEventDescriptor {
    pub event_id: String,
    pub severity_level: Severity,
    pub meta: AuditMeta,
}

impl AuditEventDescriptor {
    /// Descriptor for one task execution.
    pub fn task_execution(
        task_id: TaskId,
        created_by: Option<&str>,
        parameters: &serde_json::Value,
        template_ref: Option<&str>,
    ) -> Self {
        Self {
            event_id: "task".to_string(),
            severity_level: Severity::Medium,
            meta: AuditMeta {
                action_type: "execution".to_string(),
                task_id,
                created_by: created_by.map(str::to_string),
                task_parameters: parameters.clone(),
                template_ref: template_ref.map(str::to_string),
            },
        }
    }
}

/// An open audit event. Finalized exactly once, by value.
#[async_trait]
pub trait AuditEvent: Send {
    async fn success(self: Box<Self>) -> Result<(), AuditError>;

    async fn fail(self: Box<Self>, error: &ExecutionError) -> Result<(), AuditError>;
}

#[async_trait]
pub trait Auditor: Send + Sync {
    async fn create_event(
        &self,
        descriptor: AuditEventDescriptor,
    ) -> Result<Box<dyn AuditEvent>, AuditError>;
}

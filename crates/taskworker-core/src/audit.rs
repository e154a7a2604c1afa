//! TracingAuditor - 監査イベントを tracing の `audit` target に書き出す
//!
//! 専用の監査ストアがない環境向け。subscriber 側で target を絞れば別ファイルにも出せる。

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::ExecutionError;
use crate::ports::{AuditError, AuditEvent, AuditEventDescriptor, Auditor};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditor;

impl TracingAuditor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Auditor for TracingAuditor {
    async fn create_event(
        &self,
        descriptor: AuditEventDescriptor,
    ) -> Result<Box<dyn AuditEvent>, AuditError> {
        let meta = serde_json::to_string(&descriptor.meta)
            .map_err(|e| AuditError::Other(format!("encode audit meta: {e}")))?;
        info!(
            target: "audit",
            event_id = %descriptor.event_id,
            severity = ?descriptor.severity_level,
            meta = %meta,
            status = "initiated",
            "audit event opened"
        );
        Ok(Box::new(TracingAuditEvent { descriptor }))
    }
}

struct TracingAuditEvent {
    descriptor: AuditEventDescriptor,
}

#[async_trait]
impl AuditEvent for TracingAuditEvent {
    async fn success(self: Box<Self>) -> Result<(), AuditError> {
        info!(
            target: "audit",
            event_id = %self.descriptor.event_id,
            task_id = %self.descriptor.meta.task_id,
            status = "succeeded",
            "audit event finalized"
        );
        Ok(())
    }

    async fn fail(self: Box<Self>, error: &ExecutionError) -> Result<(), AuditError> {
        warn!(
            target: "audit",
            event_id = %self.descriptor.event_id,
            task_id = %self.descriptor.meta.task_id,
            status = "failed",
            error = %error,
            "audit event finalized"
        );
        Ok(())
    }
}

//! Audit sinks

use async_trait::async_trait;
use rdx_core::AuditEvent;
use rdx_storage::Storage;

/// Destination for audit events. Implementations must never be handed
/// document content; events carry identifiers and counts only.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: &AuditEvent) -> anyhow::Result<()>;
}

/// Writes events to the log under the `rdx::audit` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: &AuditEvent) -> anyhow::Result<()> {
        let payload = log_payload(event)?;
        tracing::info!(target: "rdx::audit", document_id = %event.record().document_id, %payload, "audit");
        Ok(())
    }
}

/// JSON line written for one event
pub fn log_payload(event: &AuditEvent) -> serde_json::Result<String> {
    serde_json::to_string(event)
}

/// Persists activity and audit-trail rows in the rdx database
#[derive(Clone)]
pub struct StorageAuditSink {
    storage: Storage,
}

impl StorageAuditSink {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl AuditSink for StorageAuditSink {
    async fn record(&self, event: &AuditEvent) -> anyhow::Result<()> {
        match event {
            AuditEvent::RedactionActivity(record) => self.storage.record_activity(record).await?,
            AuditEvent::AuditTrail { action, record } => {
                self.storage.record_audit_trail(action, record).await?
            }
        }
        Ok(())
    }
}

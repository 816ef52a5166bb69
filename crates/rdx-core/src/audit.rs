//! Audit records for redaction passes
//!
//! A record proves a redaction happened. It carries identifiers, counts and
//! timing only; there is no field that could hold document content.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{DocumentRef, Requester};

/// Action name written to the generic audit trail
pub const REDACT_ACTION: &str = "document.redact";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: String,
    pub document_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    pub requester_token_id: Option<String>,
    pub content_type: String,
    pub patterns_applied: usize,
    pub matches_found: usize,
    pub execution_time_ms: u64,
    pub requester_ip: Option<String>,
    pub requester_user_agent: Option<String>,
    #[serde(with = "time::serde::timestamp")]
    pub occurred_at: OffsetDateTime,
}

impl AuditRecord {
    pub fn new(
        document: &DocumentRef,
        requester: &Requester,
        content_type: impl Into<String>,
        patterns_applied: usize,
        matches_found: usize,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            document_id: document.document_id.clone(),
            version_id: document.version_id.clone(),
            requester_token_id: requester.token_id.clone(),
            content_type: content_type.into(),
            patterns_applied,
            matches_found,
            execution_time_ms,
            requester_ip: requester.ip.clone(),
            requester_user_agent: requester.user_agent.clone(),
            occurred_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Events appended to the audit sink; two per redaction pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    RedactionActivity(AuditRecord),
    AuditTrail { action: String, record: AuditRecord },
}

impl AuditEvent {
    /// The pair of events emitted for one pass
    pub fn for_pass(record: AuditRecord) -> [AuditEvent; 2] {
        [
            AuditEvent::RedactionActivity(record.clone()),
            AuditEvent::AuditTrail {
                action: REDACT_ACTION.to_string(),
                record,
            },
        ]
    }

    pub fn record(&self) -> &AuditRecord {
        match self {
            AuditEvent::RedactionActivity(record) => record,
            AuditEvent::AuditTrail { record, .. } => record,
        }
    }
}

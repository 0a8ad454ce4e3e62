//! Audit records for message operations.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::message::{ActorRole, Content, MessageKind};
use crate::error::Error;

/// Operation recorded by an audit entry.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Push,
    Pull,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditAction::Push => write!(f, "push"),
            AuditAction::Pull => write!(f, "pull"),
        }
    }
}

/// One committed push or pull.
#[derive(Serialize, Clone, Debug)]
pub struct AuditRecord {
    pub queue: String,
    pub message_id: String,
    pub kind: MessageKind,
    pub content: Content,
    pub action: AuditAction,
    pub actor_role: ActorRole,
    pub timestamp: DateTime<Utc>,
}

/// Receives audit records after a mutation has committed.
///
/// Implementations must not block. A returned error is logged by the caller
/// and never undoes the operation.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &AuditRecord) -> Result<(), Error>;
}

/// Writes audit records as structured events on the `audit` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: &AuditRecord) -> Result<(), Error> {
        let content = serde_json::to_string(&record.content)?;
        tracing::info!(
            target: "audit",
            service = "queue_service",
            action = %record.action,
            queue = %record.queue,
            message_id = %record.message_id,
            kind = %record.kind,
            actor_role = %record.actor_role,
            timestamp = %record.timestamp.to_rfc3339(),
            content = %content,
            "message {}",
            record.action
        );
        Ok(())
    }
}

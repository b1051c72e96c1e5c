//! Audit records for authorization decisions
//!
//! Every authorization attempt produces one record, allowed or not. Where the
//! records end up (database, log pipeline, event bus) is up to the
//! [`AuditSink`] implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use carebase_rbac::Decision;

use crate::error::GuardResult;

/// One authorization attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditRecord {
    /// Unique record ID
    pub id: Uuid,

    /// Principal that made the request
    pub principal_id: Uuid,

    /// Requested resource
    pub resource: String,

    /// Requested action
    pub action: String,

    /// Whether the request was allowed
    pub allow: bool,

    /// Permission that granted the request
    pub matched_permission_id: Option<String>,

    /// When the decision was made
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    /// Create a record from a decision.
    pub fn from_decision(
        principal_id: Uuid,
        resource: impl Into<String>,
        action: impl Into<String>,
        decision: &Decision,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            principal_id,
            resource: resource.into(),
            action: action.into(),
            allow: decision.allow,
            matched_permission_id: decision.matched_permission_id.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// Destination for audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist or forward a record.
    async fn record(&self, record: AuditRecord) -> GuardResult<()>;
}

/// In-memory audit sink.
///
/// Suitable for tests and single-process tools.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    records: Arc<RwLock<Vec<AuditRecord>>>,
}

impl MemoryAuditSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All records so far, oldest first.
    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records.read().await.clone()
    }

    /// Number of records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Check if no records were written.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, record: AuditRecord) -> GuardResult<()> {
        self.records.write().await.push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Decision {
        Decision {
            allow: true,
            matched_permission_id: Some("patient.read".to_string()),
            reason: "granted".to_string(),
        }
    }

    #[test]
    fn test_record_from_decision() {
        let principal = Uuid::now_v7();
        let record = AuditRecord::from_decision(principal, "patient", "read", &allowed());
        assert_eq!(record.principal_id, principal);
        assert!(record.allow);
        assert_eq!(record.matched_permission_id.as_deref(), Some("patient.read"));
    }

    #[test]
    fn test_record_serializes_without_reason() {
        let record = AuditRecord::from_decision(Uuid::now_v7(), "patient", "read", &allowed());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["resource"], "patient");
        assert!(json.get("reason").is_none());
    }

    #[tokio::test]
    async fn test_memory_sink_keeps_order() {
        let sink = MemoryAuditSink::new();
        assert!(sink.is_empty().await);

        let principal = Uuid::now_v7();
        sink.record(AuditRecord::from_decision(principal, "patient", "read", &allowed()))
            .await
            .unwrap();
        sink.record(AuditRecord::from_decision(principal, "billing", "read", &allowed()))
            .await
            .unwrap();

        let records = sink.records().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].resource, "patient");
        assert_eq!(records[1].resource, "billing");
    }
}

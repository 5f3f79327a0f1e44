//! Audit log sink.
//!
//! Every mutation appends an [`AuditEntry`]. Recording is best-effort: a
//! failed write is logged and never fails or rolls back the request that
//! produced it.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use tenantdesk_core::{AuditEntryId, Entity, TenantId, UserId};

use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    RegisterTenant,
    UpdateTenant,
    CreateUser,
    UpdateUser,
    DeleteUser,
    CreateProject,
    UpdateProject,
    DeleteProject,
    CreateTask,
    UpdateTask,
    UpdateTaskStatus,
    Logout,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::RegisterTenant => "REGISTER_TENANT",
            AuditAction::UpdateTenant => "UPDATE_TENANT",
            AuditAction::CreateUser => "CREATE_USER",
            AuditAction::UpdateUser => "UPDATE_USER",
            AuditAction::DeleteUser => "DELETE_USER",
            AuditAction::CreateProject => "CREATE_PROJECT",
            AuditAction::UpdateProject => "UPDATE_PROJECT",
            AuditAction::DeleteProject => "DELETE_PROJECT",
            AuditAction::CreateTask => "CREATE_TASK",
            AuditAction::UpdateTask => "UPDATE_TASK",
            AuditAction::UpdateTaskStatus => "UPDATE_TASK_STATUS",
            AuditAction::Logout => "LOGOUT",
        }
    }
}

/// Append-only audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub tenant_id: Option<TenantId>,
    pub user_id: Option<UserId>,
    pub action: AuditAction,
    pub entity_type: &'static str,
    pub entity_id: Option<Uuid>,
    pub ip: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(action: AuditAction, tenant_id: Option<TenantId>, user_id: Option<UserId>) -> Self {
        Self {
            id: AuditEntryId::new(),
            tenant_id,
            user_id,
            action,
            entity_type: "session",
            entity_id: None,
            ip: None,
            created_at: Utc::now(),
        }
    }

    pub fn entity<E>(mut self, entity: &E) -> Self
    where
        E: Entity,
        E::Id: Copy + Into<Uuid>,
    {
        self.entity_type = E::ENTITY_TYPE;
        self.entity_id = Some((*entity.id()).into());
        self
    }

    pub fn session(mut self, user_id: UserId) -> Self {
        self.entity_type = "session";
        self.entity_id = Some(user_id.into());
        self
    }

    pub fn tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn ip(mut self, ip: Option<String>) -> Self {
        self.ip = ip;
        self
    }
}

#[async_trait::async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> Result<(), StoreError>;
}

/// Service-side handle: records and swallows failures.
#[derive(Clone)]
pub struct AuditLog {
    sink: Arc<dyn AuditSink>,
}

impl AuditLog {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    pub async fn record(&self, entry: AuditEntry) {
        let action = entry.action.as_str();
        if let Err(err) = self.sink.record(entry).await {
            tracing::warn!(action, error = %err, "audit write failed");
        }
    }
}

/// In-memory audit sink for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries in insertion order.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(&self, entry: AuditEntry) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        entries.push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenSink;

    #[async_trait::async_trait]
    impl AuditSink for BrokenSink {
        async fn record(&self, _entry: AuditEntry) -> Result<(), StoreError> {
            Err(StoreError::Backend("disk full".to_string()))
        }
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let log = AuditLog::new(Arc::new(BrokenSink));
        log.record(AuditEntry::new(AuditAction::Logout, None, None)).await;
    }

    #[tokio::test]
    async fn in_memory_sink_keeps_order() {
        let sink = Arc::new(InMemoryAuditSink::new());
        let log = AuditLog::new(sink.clone());
        let user = UserId::new();
        log.record(AuditEntry::new(AuditAction::CreateUser, None, Some(user))).await;
        log.record(AuditEntry::new(AuditAction::Logout, None, Some(user)).session(user)).await;

        let actions: Vec<_> = sink.entries().iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![AuditAction::CreateUser, AuditAction::Logout]);
        assert_eq!(sink.entries()[1].entity_type, "session");
    }

    #[test]
    fn action_wire_names() {
        assert_eq!(AuditAction::UpdateTaskStatus.as_str(), "UPDATE_TASK_STATUS");
        assert_eq!(
            serde_json::to_string(&AuditAction::RegisterTenant).unwrap(),
            "\"REGISTER_TENANT\""
        );
    }
}

//! Identity & credential store boundary.
//!
//! One async trait covers tenants, users, projects and tasks. Every
//! multi-step mutation (tenant + admin creation, quota check + insert,
//! cascades) is a single call so that implementations can run it inside one
//! transaction.
//!
//! ## Implementations
//!
//! - [`InMemoryStore`]: one `RwLock` over the whole state; holding the write
//!   lock is the transaction. For tests/dev.
//! - [`PostgresStore`]: sqlx transactions, tenant row locks
//!   (`SELECT ... FOR UPDATE`) around quota checks.

pub mod in_memory;
pub mod postgres;
mod schema;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

use thiserror::Error;

use tenantdesk_core::{DomainError, Page, PageRequest, ProjectId, TaskId, TenantId, UserId};
use tenantdesk_projects::{Project, ProjectFilter, ProjectSummary, Task, TaskFilter, TaskView};
use tenantdesk_tenancy::{Tenant, TenantFilter, TenantStats, TenantSummary, User, UserFilter};

/// Store operation error.
///
/// These are storage-level outcomes; [`DomainError`] is what services return.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Unique constraint violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Quota check failed inside the insert transaction.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// A referenced record does not exist in the expected tenant.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// Connection, lock or decode failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for DomainError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(entity) => DomainError::not_found(entity),
            StoreError::Conflict(msg) => DomainError::Conflict(msg),
            StoreError::QuotaExceeded(msg) => DomainError::QuotaExceeded(msg),
            StoreError::InvalidReference(msg) => DomainError::InvalidReference(msg),
            StoreError::Backend(msg) => DomainError::Internal(msg),
        }
    }
}

pub(crate) const SUBDOMAIN_TAKEN: &str = "Subdomain already exists";
pub(crate) const EMAIL_TAKEN: &str = "Email already exists in this tenant";
pub(crate) const USER_LIMIT: &str = "User limit reached for this subscription plan";
pub(crate) const PROJECT_LIMIT: &str = "Project limit reached for this subscription plan";
pub(crate) const ASSIGNEE_OUTSIDE_TENANT: &str = "Assigned user must belong to the same tenant";

#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Cheap liveness probe.
    async fn ping(&self) -> Result<(), StoreError>;

    // ── tenants ─────────────────────────────────────────────────────────────

    /// Insert a tenant and its first admin atomically.
    ///
    /// Duplicate subdomain → `Conflict`; nothing is written in that case.
    async fn create_tenant_with_admin(&self, tenant: Tenant, admin: User) -> Result<(Tenant, User), StoreError>;

    async fn get_tenant(&self, id: TenantId) -> Result<Option<Tenant>, StoreError>;

    async fn get_tenant_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, StoreError>;

    /// Persist mutable tenant fields (`subdomain` is never rewritten).
    async fn update_tenant(&self, tenant: &Tenant) -> Result<(), StoreError>;

    /// Newest first, with user/project counts per row.
    async fn list_tenants(&self, filter: &TenantFilter, page: PageRequest) -> Result<Page<TenantSummary>, StoreError>;

    async fn tenant_stats(&self, id: TenantId) -> Result<TenantStats, StoreError>;

    // ── users ───────────────────────────────────────────────────────────────

    /// Insert a tenant user if the tenant has fewer users than `max_users`.
    ///
    /// The count and the insert happen under the tenant's lock.
    async fn insert_user_within_quota(&self, user: User) -> Result<User, StoreError>;

    /// Insert a tenant-less super admin.
    async fn insert_super_admin(&self, user: User) -> Result<User, StoreError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// `tenant_id = None` searches super admins only.
    async fn find_user_by_email(&self, tenant_id: Option<TenantId>, email: &str) -> Result<Option<User>, StoreError>;

    /// Newest first.
    async fn list_users(&self, tenant_id: TenantId, filter: &UserFilter, page: PageRequest) -> Result<Page<User>, StoreError>;

    async fn update_user(&self, user: &User) -> Result<(), StoreError>;

    /// Delete a user and clear `assigned_to` on their tasks.
    async fn delete_user(&self, id: UserId) -> Result<(), StoreError>;

    // ── projects ────────────────────────────────────────────────────────────

    /// Insert a project if the tenant has fewer projects than `max_projects`.
    async fn insert_project_within_quota(&self, project: Project) -> Result<Project, StoreError>;

    async fn get_project(&self, id: ProjectId) -> Result<Option<Project>, StoreError>;

    /// Newest first, with creator name and task counts.
    async fn list_projects(
        &self,
        tenant_id: TenantId,
        filter: &ProjectFilter,
        page: PageRequest,
    ) -> Result<Page<ProjectSummary>, StoreError>;

    async fn update_project(&self, project: &Project) -> Result<(), StoreError>;

    /// Delete a project and all of its tasks.
    async fn delete_project(&self, id: ProjectId) -> Result<(), StoreError>;

    // ── tasks ───────────────────────────────────────────────────────────────

    /// Insert a task. A set `assigned_to` must name a user of the task's
    /// tenant, else `InvalidReference`.
    async fn insert_task(&self, task: Task) -> Result<Task, StoreError>;

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, StoreError>;

    /// Priority rank, then due date ascending (nulls last).
    async fn list_tasks(&self, project_id: ProjectId, filter: &TaskFilter) -> Result<Vec<TaskView>, StoreError>;

    /// Persist mutable task fields, with the same assignee check as insert.
    async fn update_task(&self, task: &Task) -> Result<(), StoreError>;
}

//! Resource services.
//!
//! Each service method follows the same shape: load the target (globally,
//! by id), ask the policy engine, validate, mutate through one [`Store`]
//! call, then append an audit entry. Loading globally and letting the
//! engine scope the record means "absent" and "other tenant" both surface
//! as `NotFound`.

pub mod auth;
pub mod projects;
pub mod tasks;
pub mod tenants;
pub mod users;

use std::sync::Arc;

use tenantdesk_auth::{Action, Claims, FieldMask, Target, TokenService, authorize};
use tenantdesk_core::{DomainError, DomainResult};

use crate::audit::{AuditAction, AuditEntry, AuditLog, AuditSink};
use crate::store::Store;

pub use auth::{AuthService, LoginOutcome, LoginRequest, MeView};
pub use projects::ProjectService;
pub use tasks::TaskService;
pub use tenants::{RegisteredTenant, TenantDetails, TenantService};
pub use users::UserService;

/// An authenticated request's identity plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub claims: Claims,
    pub ip: Option<String>,
}

impl Caller {
    pub fn new(claims: Claims, ip: Option<String>) -> Self {
        Self { claims, ip }
    }

    /// Audit entry attributed to this caller.
    pub(crate) fn audit(&self, action: AuditAction) -> AuditEntry {
        AuditEntry::new(action, self.claims.tenant_id, Some(self.claims.user_id)).ip(self.ip.clone())
    }
}

/// Run the policy engine; log and convert denials.
pub(crate) fn enforce(caller: &Caller, action: Action, target: &Target) -> DomainResult<FieldMask> {
    authorize(Some(&caller.claims), action, target)
        .into_result()
        .map_err(|denial| {
            tracing::info!(
                user_id = %caller.claims.user_id,
                role = %caller.claims.role,
                ?action,
                entity = target.entity(),
                ?denial,
                "authorization denied"
            );
            DomainError::from(denial)
        })
}

/// Run a password hash/verify off the async workers.
pub(crate) async fn blocking<T, F>(f: F) -> DomainResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DomainError::internal(format!("blocking task failed: {e}")))
}

/// All resource services over one store, one audit sink and one token
/// service.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn Store>,
    pub auth: AuthService,
    pub tenants: TenantService,
    pub users: UserService,
    pub projects: ProjectService,
    pub tasks: TaskService,
}

impl Services {
    pub fn new(store: Arc<dyn Store>, audit: Arc<dyn AuditSink>, tokens: TokenService) -> Self {
        let audit = AuditLog::new(audit);
        Self {
            auth: AuthService::new(store.clone(), audit.clone(), tokens),
            tenants: TenantService::new(store.clone(), audit.clone()),
            users: UserService::new(store.clone(), audit.clone()),
            projects: ProjectService::new(store.clone(), audit.clone()),
            tasks: TaskService::new(store.clone(), audit),
            store,
        }
    }
}

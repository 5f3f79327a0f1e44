use serde::{Deserialize, Serialize};

use tenantdesk_auth::Role;
use tenantdesk_core::{DomainError, DomainResult, Page, PageRequest, TenantId, UserId};
use tenantdesk_infra::services::{LoginOutcome, RegisteredTenant};
use tenantdesk_projects::{ProjectFilter, ProjectStatus, TaskFilter, TaskPriority, TaskStatus};
use tenantdesk_tenancy::{SubscriptionPlan, Tenant, TenantFilter, TenantStatus, User, UserFilter};

// ───────────────────────────── Request DTOs ─────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<TenantStatus>,
    pub subscription_plan: Option<SubscriptionPlan>,
    pub search: Option<String>,
}

impl TenantListQuery {
    pub fn into_parts(self) -> (TenantFilter, PageRequest) {
        let filter = TenantFilter {
            status: self.status,
            plan: self.subscription_plan,
            search: non_blank(self.search),
        };
        (filter, PageRequest::new(self.page, self.limit))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub role: Option<Role>,
    pub search: Option<String>,
}

impl UserListQuery {
    pub fn into_parts(self) -> (UserFilter, PageRequest) {
        let filter = UserFilter {
            role: self.role,
            search: non_blank(self.search),
        };
        (filter, PageRequest::new(self.page, self.limit))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<ProjectStatus>,
    pub search: Option<String>,
}

impl ProjectListQuery {
    pub fn into_parts(self) -> (ProjectFilter, PageRequest) {
        let filter = ProjectFilter {
            status: self.status,
            search: non_blank(self.search),
        };
        (filter, PageRequest::new(self.page, self.limit))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    /// Parsed separately so a bad id is a 400 with a readable message.
    pub assigned_to: Option<String>,
    pub search: Option<String>,
}

impl TaskListQuery {
    pub fn into_filter(self) -> DomainResult<TaskFilter> {
        let assigned_to = non_blank(self.assigned_to)
            .map(|id| id.parse::<UserId>())
            .transpose()?;
        Ok(TaskFilter {
            status: self.status,
            assigned_to,
            priority: self.priority,
            search: non_blank(self.search),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct TaskStatusRequest {
    pub status: TaskStatus,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ───────────────────────────── Response DTOs ────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTenantResponse {
    pub tenant_id: TenantId,
    pub subdomain: String,
    pub admin_user: User,
}

impl From<RegisteredTenant> for RegisterTenantResponse {
    fn from(value: RegisteredTenant) -> Self {
        Self {
            tenant_id: value.tenant.id,
            subdomain: value.tenant.subdomain,
            admin_user: value.admin_user,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: User,
    pub tenant: Option<Tenant>,
    pub token: String,
    pub expires_in: i64,
}

impl From<LoginOutcome> for LoginResponse {
    fn from(value: LoginOutcome) -> Self {
        Self {
            user: value.user,
            tenant: value.tenant,
            token: value.token.token,
            expires_in: value.token.expires_in,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

/// `{ <key>: [...], pagination: {...} }`
pub fn listing<T: Serialize>(key: &str, page: Page<T>) -> DomainResult<serde_json::Value> {
    let pagination = Pagination {
        current_page: page.page,
        limit: page.limit,
        total: page.total,
        total_pages: page.total_pages(),
    };
    let mut body = serde_json::Map::new();
    body.insert(key.to_string(), to_json(&page.items)?);
    body.insert("pagination".to_string(), to_json(&pagination)?);
    Ok(serde_json::Value::Object(body))
}

fn to_json<T: Serialize>(value: &T) -> DomainResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| DomainError::internal(format!("response encoding: {e}")))
}

//! Tenant resource service: registration, tenant records, the directory.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::instrument;

use tenantdesk_auth::{Action, Role, Target, hash_password};
use tenantdesk_core::{DomainError, DomainResult, Page, PageRequest, TenantId};
use tenantdesk_tenancy::{
    NewUser, Registration, Tenant, TenantFilter, TenantPatch, TenantStats, TenantSummary, User,
};

use super::{Caller, blocking, enforce};
use crate::audit::{AuditAction, AuditEntry, AuditLog};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredTenant {
    pub tenant: Tenant,
    pub admin_user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantDetails {
    #[serde(flatten)]
    pub tenant: Tenant,
    pub stats: TenantStats,
}

#[derive(Clone)]
pub struct TenantService {
    store: Arc<dyn Store>,
    audit: AuditLog,
}

impl TenantService {
    pub fn new(store: Arc<dyn Store>, audit: AuditLog) -> Self {
        Self { store, audit }
    }

    /// Create a tenant (free plan, active) and its first `tenant_admin`
    /// atomically. Public: no caller.
    #[instrument(skip(self, registration, ip), fields(subdomain = %registration.subdomain), err)]
    pub async fn register(&self, registration: Registration, ip: Option<String>) -> DomainResult<RegisteredTenant> {
        let reg = registration.validate()?;
        let now = Utc::now();

        let tenant = Tenant::register(&reg.name, &reg.subdomain, now)?;
        let password = reg.admin_password.clone();
        let hash = blocking(move || hash_password(&password))
            .await?
            .map_err(|e| DomainError::internal(e.to_string()))?;
        let admin = User::new(
            Some(tenant.id),
            NewUser {
                email: reg.admin_email,
                password: reg.admin_password,
                full_name: reg.admin_full_name,
                role: Role::TenantAdmin,
            },
            hash,
            now,
        )?;

        let (tenant, admin_user) = self.store.create_tenant_with_admin(tenant, admin).await?;

        self.audit
            .record(
                AuditEntry::new(AuditAction::RegisterTenant, Some(tenant.id), Some(admin_user.id))
                    .entity(&tenant)
                    .ip(ip),
            )
            .await;
        tracing::info!(tenant_id = %tenant.id, "tenant registered");
        Ok(RegisteredTenant { tenant, admin_user })
    }

    /// Tenant record plus usage counts.
    pub async fn get(&self, caller: &Caller, id: TenantId) -> DomainResult<TenantDetails> {
        enforce(caller, Action::Read, &Target::Tenant { tenant_id: id })?;
        let tenant = self
            .store
            .get_tenant(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Tenant"))?;
        let stats = self.store.tenant_stats(id).await?;
        Ok(TenantDetails { tenant, stats })
    }

    /// Partial update. A `tenant_admin` request naming any subscription
    /// field is rejected as a whole.
    #[instrument(skip(self, caller, patch), fields(tenant_id = %id), err)]
    pub async fn update(&self, caller: &Caller, id: TenantId, patch: TenantPatch) -> DomainResult<Tenant> {
        enforce(caller, Action::Update(patch.fields()), &Target::Tenant { tenant_id: id })?;
        let patch = patch.validate()?;

        let mut tenant = self
            .store
            .get_tenant(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Tenant"))?;
        tenant.apply(patch, Utc::now());
        self.store.update_tenant(&tenant).await?;

        self.audit
            .record(caller.audit(AuditAction::UpdateTenant).tenant(tenant.id).entity(&tenant))
            .await;
        Ok(tenant)
    }

    /// Every tenant, newest first. Super admins only.
    pub async fn list(&self, caller: &Caller, filter: TenantFilter, page: PageRequest) -> DomainResult<Page<TenantSummary>> {
        enforce(caller, Action::List, &Target::TenantDirectory)?;
        Ok(self.store.list_tenants(&filter, page).await?)
    }
}

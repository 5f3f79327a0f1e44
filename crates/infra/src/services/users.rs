//! User resource service.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use tenantdesk_auth::{Action, Target, hash_password};
use tenantdesk_core::{DomainError, DomainResult, Page, PageRequest, TenantId, UserId};
use tenantdesk_tenancy::{NewUser, User, UserFilter, UserPatch};

use super::{Caller, blocking, enforce};
use crate::audit::{AuditAction, AuditLog};
use crate::store::Store;

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    audit: AuditLog,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, audit: AuditLog) -> Self {
        Self { store, audit }
    }

    async fn load(&self, id: UserId) -> DomainResult<(User, TenantId)> {
        let user = self
            .store
            .get_user(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User"))?;
        // Super admin accounts are not addressable through tenant routes.
        let tenant_id = user.tenant_id.ok_or_else(|| DomainError::not_found("User"))?;
        Ok((user, tenant_id))
    }

    /// Add a user to `tenant_id`. Tenant admins only; quota checked inside
    /// the insert.
    #[instrument(skip(self, caller, new), fields(tenant_id = %tenant_id), err)]
    pub async fn create(&self, caller: &Caller, tenant_id: TenantId, new: NewUser) -> DomainResult<User> {
        enforce(
            caller,
            Action::Create,
            &Target::Users {
                tenant_id,
                granting: Some(new.role),
            },
        )?;
        let new = new.validate()?;

        let password = new.password.clone();
        let hash = blocking(move || hash_password(&password))
            .await?
            .map_err(|e| DomainError::internal(e.to_string()))?;
        let user = User::new(Some(tenant_id), new, hash, Utc::now())?;
        let user = self.store.insert_user_within_quota(user).await?;

        self.audit.record(caller.audit(AuditAction::CreateUser).entity(&user)).await;
        tracing::info!(user_id = %user.id, role = %user.role, "user created");
        Ok(user)
    }

    /// Users of `tenant_id`, newest first.
    pub async fn list(
        &self,
        caller: &Caller,
        tenant_id: TenantId,
        filter: UserFilter,
        page: PageRequest,
    ) -> DomainResult<Page<User>> {
        enforce(
            caller,
            Action::List,
            &Target::Users {
                tenant_id,
                granting: None,
            },
        )?;
        Ok(self.store.list_users(tenant_id, &filter, page).await?)
    }

    #[instrument(skip(self, caller, patch), fields(user_id = %id), err)]
    pub async fn update(&self, caller: &Caller, id: UserId, patch: UserPatch) -> DomainResult<User> {
        let (mut user, tenant_id) = self.load(id).await?;
        enforce(
            caller,
            Action::Update(patch.fields()),
            &Target::User {
                tenant_id,
                user_id: id,
                granting: patch.role,
            },
        )?;
        let patch = patch.validate()?;

        user.apply(patch, Utc::now());
        self.store.update_user(&user).await?;

        self.audit.record(caller.audit(AuditAction::UpdateUser).entity(&user)).await;
        Ok(user)
    }

    /// Delete a user; their task assignments are cleared, tasks are kept.
    #[instrument(skip(self, caller), fields(user_id = %id), err)]
    pub async fn delete(&self, caller: &Caller, id: UserId) -> DomainResult<()> {
        let (user, tenant_id) = self.load(id).await?;
        enforce(
            caller,
            Action::Delete,
            &Target::User {
                tenant_id,
                user_id: id,
                granting: None,
            },
        )?;
        self.store.delete_user(id).await?;

        self.audit.record(caller.audit(AuditAction::DeleteUser).entity(&user)).await;
        tracing::info!(user_id = %id, "user deleted");
        Ok(())
    }
}

//! Credential & login flow.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use tenantdesk_auth::{
    Claims, IssuedToken, TokenError, TokenService, verify_dummy, verify_password,
};
use tenantdesk_core::{DomainError, DomainResult};
use tenantdesk_tenancy::{Tenant, User};

use super::{Caller, blocking};
use crate::audit::{AuditAction, AuditLog};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Absent for super admins.
    #[serde(default)]
    pub tenant_subdomain: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub tenant: Option<Tenant>,
    pub token: IssuedToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeView {
    pub user: User,
    /// `null` for super admins.
    pub tenant: Option<Tenant>,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    audit: AuditLog,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, audit: AuditLog, tokens: TokenService) -> Self {
        Self { store, audit, tokens }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Authenticate and issue a session token.
    ///
    /// Every failure (unknown tenant, inactive tenant, unknown email, wrong
    /// password, inactive user) is the same `InvalidCredentials`, and an
    /// unknown account still pays for one password verification.
    #[instrument(skip(self, req), fields(scoped = req.tenant_subdomain.is_some()))]
    pub async fn login(&self, req: LoginRequest) -> DomainResult<LoginOutcome> {
        let email = req.email.trim().to_ascii_lowercase();

        let (tenant, user) = match req.tenant_subdomain.as_deref().map(str::trim) {
            Some(subdomain) if !subdomain.is_empty() => {
                let tenant = self
                    .store
                    .get_tenant_by_subdomain(&subdomain.to_ascii_lowercase())
                    .await?
                    .filter(Tenant::is_active);
                let user = match &tenant {
                    Some(t) => self.store.find_user_by_email(Some(t.id), &email).await?,
                    None => None,
                };
                (tenant, user)
            }
            _ => (None, self.store.find_user_by_email(None, &email).await?),
        };

        let password = req.password;
        let hash = user.as_ref().map(|u| u.password_hash.clone());
        let matched = blocking(move || match hash {
            Some(hash) => verify_password(&password, &hash).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "stored password hash unreadable");
                false
            }),
            None => verify_dummy(&password),
        })
        .await?;

        let user = match user {
            Some(user) if matched && user.is_active => user,
            _ => {
                tracing::info!("login rejected");
                return Err(DomainError::InvalidCredentials);
            }
        };

        let claims = Claims::new(user.id, user.tenant_id, user.role);
        let token = self.tokens.issue(&claims).map_err(|e| match e {
            TokenError::Encoding(msg) => DomainError::internal(msg),
            TokenError::InvalidToken => DomainError::internal("token issuance failed"),
        })?;

        tracing::info!(user_id = %user.id, role = %user.role, "login succeeded");
        Ok(LoginOutcome { user, tenant, token })
    }

    /// The caller's own account and tenant.
    pub async fn me(&self, caller: &Caller) -> DomainResult<MeView> {
        let user = self
            .store
            .get_user(caller.claims.user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User"))?;
        let tenant = match user.tenant_id {
            Some(id) => self.store.get_tenant(id).await?,
            None => None,
        };
        Ok(MeView { user, tenant })
    }

    /// Records the logout. Tokens stay valid until they expire.
    pub async fn logout(&self, caller: &Caller) -> DomainResult<()> {
        self.audit
            .record(caller.audit(AuditAction::Logout).session(caller.claims.user_id))
            .await;
        Ok(())
    }
}

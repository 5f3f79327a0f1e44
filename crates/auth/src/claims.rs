use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tenantdesk_core::{TenantId, UserId};

use crate::Role;

/// Verified identity of a caller.
///
/// `tenant_id` is `None` only for super admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claims {
    pub user_id: UserId,
    pub tenant_id: Option<TenantId>,
    pub role: Role,
}

impl Claims {
    pub fn new(user_id: UserId, tenant_id: Option<TenantId>, role: Role) -> Self {
        Self {
            user_id,
            tenant_id,
            role,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }
}

/// JWT claims model (wire form).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject: the user id.
    pub sub: UserId,

    /// Tenant of the user; `null` for super admins.
    pub tenant_id: Option<TenantId>,

    pub role: Role,

    /// Issued-at (Unix timestamp, seconds).
    pub iat: i64,

    /// Expiration (Unix timestamp, seconds).
    pub exp: i64,
}

impl JwtClaims {
    /// `None` when `issued_at + ttl_secs` does not fit in an `i64`.
    pub fn new(claims: &Claims, issued_at: DateTime<Utc>, ttl_secs: i64) -> Option<Self> {
        let iat = issued_at.timestamp();
        Some(Self {
            sub: claims.user_id,
            tenant_id: claims.tenant_id,
            role: claims.role,
            iat,
            exp: iat.checked_add(ttl_secs)?,
        })
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.iat, 0).single()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }

    pub fn into_claims(self) -> Claims {
        Claims::new(self.sub, self.tenant_id, self.role)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("tenant binding does not match role")]
    RoleTenantMismatch,
}

/// Deterministically validate decoded claims.
///
/// Signature verification happens in [`crate::token::TokenService`]; this
/// checks the time window and that only super admins are tenant-less.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    if claims.role.is_tenant_scoped() != claims.tenant_id.is_some() {
        return Err(TokenValidationError::RoleTenantMismatch);
    }
    Ok(())
}

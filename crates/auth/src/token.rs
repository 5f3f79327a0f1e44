//! Session token issuance and verification (HS256 JWT).

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::claims::{Claims, JwtClaims, validate_claims};

/// Default token lifetime: 24 hours.
pub const DEFAULT_TTL_SECS: i64 = 86_400;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Bad signature, malformed or expired. Callers never learn which.
    #[error("invalid token")]
    InvalidToken,

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

/// A freshly signed token and its lifetime in seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl core::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    pub fn issue(&self, claims: &Claims) -> Result<IssuedToken, TokenError> {
        self.issue_at(claims, Utc::now())
    }

    /// Issue with an explicit issue time (deterministic tests).
    pub fn issue_at(&self, claims: &Claims, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let wire = JwtClaims::new(claims, now, self.ttl_secs)
            .ok_or_else(|| TokenError::Encoding(format!("ttl of {}s overflows exp", self.ttl_secs)))?;
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &wire, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;
        Ok(IssuedToken {
            token,
            expires_in: self.ttl_secs,
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp", "iat"]);

        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &validation).map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            TokenError::InvalidToken
        })?;

        validate_claims(&data.claims, Utc::now()).map_err(|e| {
            tracing::debug!(error = %e, "token claims rejected");
            TokenError::InvalidToken
        })?;

        Ok(data.claims.into_claims())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use chrono::Duration;
    use tenantdesk_core::{TenantId, UserId};

    fn service() -> TokenService {
        TokenService::new(b"test-secret", DEFAULT_TTL_SECS)
    }

    #[test]
    fn issued_token_verifies_to_same_claims() {
        let claims = Claims::new(UserId::new(), Some(TenantId::new()), Role::TenantAdmin);
        let issued = service().issue(&claims).unwrap();
        assert_eq!(issued.expires_in, 86_400);
        assert_eq!(service().verify(&issued.token).unwrap(), claims);
    }

    #[test]
    fn super_admin_token_has_null_tenant() {
        let claims = Claims::new(UserId::new(), None, Role::SuperAdmin);
        let issued = service().issue(&claims).unwrap();
        assert_eq!(service().verify(&issued.token).unwrap().tenant_id, None);
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let claims = Claims::new(UserId::new(), Some(TenantId::new()), Role::User);
        let issued = TokenService::new(b"other", DEFAULT_TTL_SECS).issue(&claims).unwrap();
        assert_eq!(service().verify(&issued.token), Err(TokenError::InvalidToken));
    }

    #[test]
    fn expired_and_garbage_are_invalid() {
        let claims = Claims::new(UserId::new(), Some(TenantId::new()), Role::User);
        let old = service()
            .issue_at(&claims, Utc::now() - Duration::days(2))
            .unwrap();
        assert_eq!(service().verify(&old.token), Err(TokenError::InvalidToken));
        assert_eq!(service().verify("not.a.jwt"), Err(TokenError::InvalidToken));
    }

    #[test]
    fn overflowing_ttl_is_an_encoding_error() {
        let claims = Claims::new(UserId::new(), Some(TenantId::new()), Role::User);
        let result = TokenService::new(b"s", i64::MAX).issue(&claims);
        assert!(matches!(result, Err(TokenError::Encoding(_))));
    }
}

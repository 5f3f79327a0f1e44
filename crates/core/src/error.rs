//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every failure a resource service can surface is one of these variants; the
/// transport boundary maps each to a status code and a stable message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced record (e.g. a task assignee) does not resolve inside the
    /// caller's tenant.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// No identity (missing, malformed or expired token).
    #[error("unauthorized")]
    Unauthorized,

    /// Login failed. Deliberately carries no detail.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Valid identity, insufficient privilege.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource absent, or present in another tenant (indistinguishable).
    #[error("{0} not found")]
    NotFound(String),

    /// Uniqueness conflict (duplicate subdomain, duplicate email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A subscription quota (max users, max projects) would be exceeded.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Unexpected store or primitive failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_reference(msg: impl Into<String>) -> Self {
        Self::InvalidReference(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound(entity.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn quota_exceeded(msg: impl Into<String>) -> Self {
        Self::QuotaExceeded(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

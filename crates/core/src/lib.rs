//! `tenantdesk-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the error taxonomy, present/absent patches and pagination.

pub mod entity;
pub mod error;
pub mod id;
pub mod page;
pub mod patch;
pub mod validate;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AuditEntryId, ProjectId, TaskId, TenantId, UserId};
pub use page::{Page, PageRequest};
pub use patch::Patch;

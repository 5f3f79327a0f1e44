//! Infrastructure layer: storage, audit log, resource services, config.

pub mod audit;
pub mod config;
pub mod seed;
pub mod services;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use audit::{AuditAction, AuditEntry, AuditLog, AuditSink, InMemoryAuditSink};
pub use config::{AppConfig, ConfigError};
pub use services::{Caller, Services};
pub use store::{InMemoryStore, PostgresStore, Store, StoreError};

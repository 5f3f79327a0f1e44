//! `tenantdesk-tenancy`: tenants, their subscription plans and user accounts.

pub mod registration;
pub mod tenant;
pub mod user;

pub use registration::Registration;
pub use tenant::{
    PlanLimits, SubscriptionPlan, Tenant, TenantFilter, TenantPatch, TenantStats, TenantStatus,
    TenantSummary,
};
pub use user::{NewUser, User, UserFilter, UserPatch};

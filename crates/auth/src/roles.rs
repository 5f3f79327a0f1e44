use core::str::FromStr;

use serde::{Deserialize, Serialize};
use tenantdesk_core::DomainError;

use crate::permissions::Capability;

/// Role of a user account.
///
/// The hierarchy is `SuperAdmin ⊇ TenantAdmin ⊇ User` in terms of authority,
/// but a super admin is tenant-less and has no implicit access to any
/// tenant's users, projects or tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    TenantAdmin,
    User,
}

const SUPER_ADMIN_CAPS: &[Capability] = &[
    Capability::ListAllTenants,
    Capability::ManageSubscription,
    Capability::RenameTenant,
];

const TENANT_ADMIN_CAPS: &[Capability] = &[
    Capability::ReadOwnTenant,
    Capability::RenameTenant,
    Capability::ManageUsers,
    Capability::ManageAllWork,
    Capability::CreateWork,
    Capability::EditOwnProfile,
];

const USER_CAPS: &[Capability] = &[
    Capability::ReadOwnTenant,
    Capability::CreateWork,
    Capability::EditOwnProfile,
];

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::TenantAdmin => "tenant_admin",
            Role::User => "user",
        }
    }

    /// Static capability table for this role.
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            Role::SuperAdmin => SUPER_ADMIN_CAPS,
            Role::TenantAdmin => TENANT_ADMIN_CAPS,
            Role::User => USER_CAPS,
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Whether accounts with this role belong to a tenant.
    pub fn is_tenant_scoped(&self) -> bool {
        !matches!(self, Role::SuperAdmin)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Role::SuperAdmin),
            "tenant_admin" => Ok(Role::TenantAdmin),
            "user" => Ok(Role::User),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}

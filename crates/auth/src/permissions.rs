use serde::Serialize;

/// Coarse capability granted by a [`crate::Role`].
///
/// Capabilities say what a role may do in principle; the policy engine
/// combines them with tenant scoping and ownership of the concrete target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Enumerate every tenant on the platform.
    ListAllTenants,
    /// Change a tenant's status, plan or limits.
    ManageSubscription,
    /// Change a tenant's display name.
    RenameTenant,
    /// Read the caller's own tenant and the users, projects and tasks in it.
    ReadOwnTenant,
    /// Create, update and delete users of the caller's tenant.
    ManageUsers,
    /// Update and delete any project or task of the caller's tenant.
    ManageAllWork,
    /// Create projects and tasks.
    CreateWork,
    /// Change the caller's own full name.
    EditOwnProfile,
}

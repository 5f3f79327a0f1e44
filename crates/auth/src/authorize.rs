//! Authorization policy engine.
//!
//! A single pure function decides every request:
//! `authorize(claims, action, target) -> Decision`.
//!
//! ## Rules
//!
//! Evaluated top to bottom; the first rule that denies decides.
//!
//! - **Authentication**: no claims → `Unauthorized`.
//! - **Tenant scoping**: a tenant-scoped target is only visible to members of
//!   that tenant. A mismatch answers `NotFound` so ids cannot be probed. The
//!   one cross-tenant exception is a super admin addressing a tenant record.
//!   Super admins have no implicit access to users, projects or tasks and
//!   cannot create them.
//! - **Role authority**: capabilities from [`Role::capabilities`] plus
//!   ownership of the concrete target decide create/update/delete.
//! - **Field masks**: an allowed update carries the writable fields; a
//!   request touching anything outside the mask is denied as a whole.
//!
//! - No IO
//! - No panics

use std::borrow::Cow;

use tenantdesk_core::{DomainError, TenantId, UserId};

use crate::fields::{Field, FieldMask};
use crate::permissions::Capability;
use crate::{Claims, Role};

/// What the caller wants to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    List,
    Create,
    /// Update touching exactly these fields.
    Update(FieldMask),
    Delete,
}

/// The resource an action is aimed at, with the attributes the rules need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Every tenant on the platform.
    TenantDirectory,
    Tenant {
        tenant_id: TenantId,
    },
    /// Users of a tenant. `granting` is the role a new user would receive.
    Users {
        tenant_id: TenantId,
        granting: Option<Role>,
    },
    /// One user. `granting` is the role an update would assign, if any.
    User {
        tenant_id: TenantId,
        user_id: UserId,
        granting: Option<Role>,
    },
    /// Projects of the caller's own tenant.
    Projects,
    Project {
        tenant_id: TenantId,
        created_by: UserId,
    },
    /// Tasks of one project.
    Tasks {
        tenant_id: TenantId,
    },
    /// One task. Ownership follows the parent project's creator.
    Task {
        tenant_id: TenantId,
        project_created_by: UserId,
        assigned_to: Option<UserId>,
    },
}

impl Target {
    /// Entity name used in `NotFound` answers.
    pub fn entity(&self) -> &'static str {
        match self {
            Target::TenantDirectory | Target::Tenant { .. } => "Tenant",
            Target::Users { .. } | Target::User { .. } => "User",
            Target::Projects | Target::Project { .. } => "Project",
            Target::Tasks { .. } | Target::Task { .. } => "Task",
        }
    }

    fn tenant_id(&self) -> Option<TenantId> {
        match self {
            Target::TenantDirectory | Target::Projects => None,
            Target::Tenant { tenant_id }
            | Target::Users { tenant_id, .. }
            | Target::User { tenant_id, .. }
            | Target::Project { tenant_id, .. }
            | Target::Tasks { tenant_id }
            | Target::Task { tenant_id, .. } => Some(*tenant_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    Unauthorized,
    Forbidden(Cow<'static, str>),
    /// Absent or outside the caller's tenant; the two are indistinguishable.
    NotFound(&'static str),
}

impl From<Denial> for DomainError {
    fn from(value: Denial) -> Self {
        match value {
            Denial::Unauthorized => DomainError::Unauthorized,
            Denial::Forbidden(reason) => DomainError::Forbidden(reason.into_owned()),
            Denial::NotFound(entity) => DomainError::not_found(entity),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Allowed; carries the fields the caller may write on the target.
    Allow(FieldMask),
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    pub fn into_result(self) -> Result<FieldMask, Denial> {
        match self {
            Decision::Allow(mask) => Ok(mask),
            Decision::Deny(denial) => Err(denial),
        }
    }

    fn forbidden(reason: impl Into<Cow<'static, str>>) -> Self {
        Decision::Deny(Denial::Forbidden(reason.into()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Writable field sets
// ─────────────────────────────────────────────────────────────────────────────

pub const TENANT_NAME_FIELDS: FieldMask = FieldMask::of(&[Field::Name]);
pub const SUBSCRIPTION_FIELDS: FieldMask = FieldMask::of(&[
    Field::Status,
    Field::SubscriptionPlan,
    Field::MaxUsers,
    Field::MaxProjects,
]);
pub const PROFILE_FIELDS: FieldMask = FieldMask::of(&[Field::FullName]);
pub const USER_ADMIN_FIELDS: FieldMask =
    FieldMask::of(&[Field::FullName, Field::Role, Field::IsActive]);
pub const PROJECT_FIELDS: FieldMask =
    FieldMask::of(&[Field::Name, Field::Description, Field::Status]);
pub const TASK_FIELDS: FieldMask = FieldMask::of(&[
    Field::Title,
    Field::Description,
    Field::Status,
    Field::Priority,
    Field::AssignedTo,
    Field::DueDate,
]);
pub const TASK_STATUS_FIELDS: FieldMask = FieldMask::of(&[Field::Status]);

/// Decide whether `claims` may perform `action` on `target`.
pub fn authorize(claims: Option<&Claims>, action: Action, target: &Target) -> Decision {
    let Some(claims) = claims else {
        return Decision::Deny(Denial::Unauthorized);
    };

    if let Some(denial) = scope(claims, action, target) {
        return Decision::Deny(denial);
    }

    match *target {
        Target::TenantDirectory => tenant_directory(claims, action),
        Target::Tenant { .. } => tenant(claims, action),
        Target::Users { granting, .. } => users(claims, action, granting),
        Target::User {
            user_id, granting, ..
        } => user(claims, action, user_id, granting),
        Target::Projects | Target::Tasks { .. } => work_collection(claims, action),
        Target::Project { created_by, .. } => project(claims, action, created_by),
        Target::Task {
            project_created_by,
            assigned_to,
            ..
        } => task(claims, action, project_created_by, assigned_to),
    }
}

/// Tenant scoping. Returns the denial when the target is out of reach.
fn scope(claims: &Claims, action: Action, target: &Target) -> Option<Denial> {
    let is_tenant_record = matches!(target, Target::Tenant { .. } | Target::TenantDirectory);

    if claims.is_super_admin() {
        if is_tenant_record {
            return None;
        }
        return Some(match (action, target) {
            (Action::Create, _) | (_, Target::Projects) => Denial::Forbidden(Cow::Borrowed(
                "super admins cannot act on tenant-scoped resources",
            )),
            _ => Denial::NotFound(target.entity()),
        });
    }

    match (target.tenant_id(), claims.tenant_id) {
        (Some(target_tenant), Some(own)) if target_tenant != own => {
            Some(Denial::NotFound(target.entity()))
        }
        (Some(_), None) => Some(Denial::NotFound(target.entity())),
        _ => None,
    }
}

/// Reject the request if it touches any field outside `writable`.
fn within(requested: FieldMask, writable: FieldMask, who: &'static str) -> Decision {
    if requested.is_subset_of(writable) {
        Decision::Allow(writable)
    } else {
        Decision::forbidden(format!(
            "{who} may not change: {}",
            requested.difference(writable)
        ))
    }
}

fn tenant_directory(claims: &Claims, action: Action) -> Decision {
    match action {
        Action::List | Action::Read if claims.role.can(Capability::ListAllTenants) => {
            Decision::Allow(FieldMask::EMPTY)
        }
        _ => Decision::forbidden("only super admins may list tenants"),
    }
}

fn tenant(claims: &Claims, action: Action) -> Decision {
    match action {
        Action::Read => Decision::Allow(FieldMask::EMPTY),
        Action::Update(requested) => {
            if claims.role.can(Capability::ManageSubscription) {
                within(requested, TENANT_NAME_FIELDS.union(SUBSCRIPTION_FIELDS), "super admin")
            } else if claims.role.can(Capability::RenameTenant) {
                if requested.intersects(SUBSCRIPTION_FIELDS) {
                    return Decision::forbidden(
                        "only super admins may change status, subscription plan or limits",
                    );
                }
                within(requested, TENANT_NAME_FIELDS, "tenant admin")
            } else {
                Decision::forbidden("only tenant admins may update the tenant")
            }
        }
        Action::List | Action::Create | Action::Delete => {
            Decision::forbidden("operation not supported on tenants")
        }
    }
}

fn users(claims: &Claims, action: Action, granting: Option<Role>) -> Decision {
    match action {
        Action::Read | Action::List => Decision::Allow(FieldMask::EMPTY),
        Action::Create => {
            if !claims.role.can(Capability::ManageUsers) {
                return Decision::forbidden("only tenant admins may create users");
            }
            if granting == Some(Role::SuperAdmin) {
                return Decision::forbidden("the super_admin role cannot be granted");
            }
            Decision::Allow(USER_ADMIN_FIELDS)
        }
        Action::Update(_) | Action::Delete => Decision::forbidden("operation not supported"),
    }
}

fn user(claims: &Claims, action: Action, user_id: UserId, granting: Option<Role>) -> Decision {
    let is_self = claims.user_id == user_id;
    let is_admin = claims.role.can(Capability::ManageUsers);

    match action {
        Action::Read | Action::List => Decision::Allow(FieldMask::EMPTY),
        Action::Create => Decision::forbidden("operation not supported"),
        Action::Update(requested) => {
            if granting == Some(Role::SuperAdmin) {
                return Decision::forbidden("the super_admin role cannot be granted");
            }
            match (is_admin, is_self) {
                (true, false) => within(requested, USER_ADMIN_FIELDS, "tenant admin"),
                (true, true) => {
                    if requested.intersects(FieldMask::of(&[Field::Role, Field::IsActive])) {
                        return Decision::forbidden(
                            "tenant admins cannot change their own role or active status",
                        );
                    }
                    within(requested, PROFILE_FIELDS, "tenant admin")
                }
                (false, true) if claims.role.can(Capability::EditOwnProfile) => {
                    within(requested, PROFILE_FIELDS, "users")
                }
                (false, _) => Decision::forbidden("users may only update their own profile"),
            }
        }
        Action::Delete => {
            if !is_admin {
                return Decision::forbidden("only tenant admins may delete users");
            }
            if is_self {
                return Decision::forbidden("cannot delete your own account");
            }
            Decision::Allow(FieldMask::EMPTY)
        }
    }
}

fn work_collection(claims: &Claims, action: Action) -> Decision {
    match action {
        Action::Read | Action::List if claims.role.can(Capability::ReadOwnTenant) => {
            Decision::Allow(FieldMask::EMPTY)
        }
        Action::Create if claims.role.can(Capability::CreateWork) => {
            Decision::Allow(TASK_FIELDS.union(PROJECT_FIELDS))
        }
        _ => Decision::forbidden("operation not supported"),
    }
}

fn project(claims: &Claims, action: Action, created_by: UserId) -> Decision {
    let may_manage = claims.role.can(Capability::ManageAllWork) || claims.user_id == created_by;

    match action {
        Action::Read | Action::List => Decision::Allow(FieldMask::EMPTY),
        Action::Update(requested) if may_manage => within(requested, PROJECT_FIELDS, "caller"),
        Action::Delete if may_manage => Decision::Allow(FieldMask::EMPTY),
        Action::Update(_) | Action::Delete => {
            Decision::forbidden("only the project creator or a tenant admin may modify this project")
        }
        Action::Create => Decision::forbidden("operation not supported"),
    }
}

fn task(
    claims: &Claims,
    action: Action,
    project_created_by: UserId,
    assigned_to: Option<UserId>,
) -> Decision {
    let may_manage =
        claims.role.can(Capability::ManageAllWork) || claims.user_id == project_created_by;
    let is_assignee = assigned_to == Some(claims.user_id);

    match action {
        Action::Read | Action::List => Decision::Allow(FieldMask::EMPTY),
        Action::Update(requested) if may_manage => within(requested, TASK_FIELDS, "caller"),
        Action::Update(requested) if is_assignee => within(requested, TASK_STATUS_FIELDS, "assignee"),
        Action::Delete if may_manage => Decision::Allow(FieldMask::EMPTY),
        Action::Update(_) | Action::Delete => Decision::forbidden(
            "only the project creator or a tenant admin may modify this task",
        ),
        Action::Create => Decision::forbidden("operation not supported"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct World {
        tenant: TenantId,
        other_tenant: TenantId,
        admin: Claims,
        alice: Claims,
        bob: Claims,
        root: Claims,
    }

    fn world() -> World {
        let tenant = TenantId::new();
        World {
            tenant,
            other_tenant: TenantId::new(),
            admin: Claims::new(UserId::new(), Some(tenant), Role::TenantAdmin),
            alice: Claims::new(UserId::new(), Some(tenant), Role::User),
            bob: Claims::new(UserId::new(), Some(tenant), Role::User),
            root: Claims::new(UserId::new(), None, Role::SuperAdmin),
        }
    }

    fn mask(fields: &[Field]) -> FieldMask {
        FieldMask::of(fields)
    }

    fn is_forbidden(d: &Decision) -> bool {
        matches!(d, Decision::Deny(Denial::Forbidden(_)))
    }

    #[test]
    fn missing_claims_is_unauthorized() {
        let w = world();
        let d = authorize(None, Action::Read, &Target::Tenant { tenant_id: w.tenant });
        assert_eq!(d, Decision::Deny(Denial::Unauthorized));
    }

    // ── tenant scoping ──────────────────────────────────────────────────────

    #[test]
    fn other_tenant_resources_are_not_found() {
        let w = world();
        let targets = [
            Target::Tenant { tenant_id: w.other_tenant },
            Target::Users { tenant_id: w.other_tenant, granting: None },
            Target::User { tenant_id: w.other_tenant, user_id: UserId::new(), granting: None },
            Target::Project { tenant_id: w.other_tenant, created_by: w.admin.user_id },
            Target::Tasks { tenant_id: w.other_tenant },
            Target::Task {
                tenant_id: w.other_tenant,
                project_created_by: w.admin.user_id,
                assigned_to: None,
            },
        ];
        for target in targets {
            for action in [Action::Read, Action::Delete, Action::Update(mask(&[Field::Name]))] {
                let d = authorize(Some(&w.admin), action, &target);
                assert!(
                    matches!(d, Decision::Deny(Denial::NotFound(_))),
                    "{target:?} {action:?} -> {d:?}"
                );
            }
        }
    }

    #[test]
    fn super_admin_reaches_tenant_records_only() {
        let w = world();
        let tenant = Target::Tenant { tenant_id: w.tenant };
        assert!(authorize(Some(&w.root), Action::Read, &tenant).is_allowed());
        assert!(authorize(Some(&w.root), Action::List, &Target::TenantDirectory).is_allowed());

        let project = Target::Project { tenant_id: w.tenant, created_by: w.alice.user_id };
        assert_eq!(
            authorize(Some(&w.root), Action::Read, &project),
            Decision::Deny(Denial::NotFound("Project"))
        );
        let users = Target::Users { tenant_id: w.tenant, granting: Some(Role::User) };
        assert!(is_forbidden(&authorize(Some(&w.root), Action::Create, &users)));
        assert!(is_forbidden(&authorize(Some(&w.root), Action::Create, &Target::Projects)));
    }

    // ── self-service ────────────────────────────────────────────────────────

    #[test]
    fn user_updates_only_own_full_name() {
        let w = world();
        let own = Target::User { tenant_id: w.tenant, user_id: w.alice.user_id, granting: None };
        assert_eq!(
            authorize(Some(&w.alice), Action::Update(mask(&[Field::FullName])), &own),
            Decision::Allow(PROFILE_FIELDS)
        );
        for field in [Field::Role, Field::IsActive] {
            let d = authorize(Some(&w.alice), Action::Update(mask(&[Field::FullName, field])), &own);
            assert!(is_forbidden(&d));
        }

        let other = Target::User { tenant_id: w.tenant, user_id: w.bob.user_id, granting: None };
        let d = authorize(Some(&w.alice), Action::Update(mask(&[Field::FullName])), &other);
        assert!(is_forbidden(&d));
    }

    // ── tenant-admin authority ──────────────────────────────────────────────

    #[test]
    fn only_tenant_admin_creates_users() {
        let w = world();
        let users = Target::Users { tenant_id: w.tenant, granting: Some(Role::User) };
        assert!(authorize(Some(&w.admin), Action::Create, &users).is_allowed());
        assert!(is_forbidden(&authorize(Some(&w.alice), Action::Create, &users)));
        assert!(authorize(Some(&w.alice), Action::List, &users).is_allowed());
    }

    #[test]
    fn user_modifies_only_own_projects() {
        let w = world();
        let bobs = Target::Project { tenant_id: w.tenant, created_by: w.bob.user_id };
        assert!(is_forbidden(&authorize(Some(&w.alice), Action::Delete, &bobs)));
        assert!(authorize(Some(&w.bob), Action::Delete, &bobs).is_allowed());
        assert!(authorize(Some(&w.admin), Action::Delete, &bobs).is_allowed());
        assert!(authorize(Some(&w.alice), Action::Read, &bobs).is_allowed());
    }

    #[test]
    fn task_ownership_follows_parent_project() {
        let w = world();
        let task = Target::Task {
            tenant_id: w.tenant,
            project_created_by: w.bob.user_id,
            assigned_to: None,
        };
        let rename = Action::Update(mask(&[Field::Title]));
        assert_eq!(authorize(Some(&w.bob), rename, &task), Decision::Allow(TASK_FIELDS));
        assert!(is_forbidden(&authorize(Some(&w.alice), rename, &task)));
        assert!(authorize(Some(&w.admin), Action::Delete, &task).is_allowed());
    }

    #[test]
    fn assignee_may_change_status_only() {
        let w = world();
        let task = Target::Task {
            tenant_id: w.tenant,
            project_created_by: w.bob.user_id,
            assigned_to: Some(w.alice.user_id),
        };
        let status = Action::Update(mask(&[Field::Status]));
        assert_eq!(authorize(Some(&w.alice), status, &task), Decision::Allow(TASK_STATUS_FIELDS));
        let title = Action::Update(mask(&[Field::Status, Field::Title]));
        assert!(is_forbidden(&authorize(Some(&w.alice), title, &task)));
        assert!(is_forbidden(&authorize(Some(&w.alice), Action::Delete, &task)));
    }

    // ── self-deletion guard ─────────────────────────────────────────────────

    #[test]
    fn tenant_admin_cannot_delete_demote_or_deactivate_self() {
        let w = world();
        let own = Target::User { tenant_id: w.tenant, user_id: w.admin.user_id, granting: None };
        assert!(is_forbidden(&authorize(Some(&w.admin), Action::Delete, &own)));
        assert!(is_forbidden(&authorize(Some(&w.admin), Action::Update(mask(&[Field::Role])), &own)));
        assert!(is_forbidden(&authorize(
            Some(&w.admin),
            Action::Update(mask(&[Field::IsActive])),
            &own
        )));
        assert!(authorize(Some(&w.admin), Action::Update(mask(&[Field::FullName])), &own).is_allowed());

        let alice = Target::User { tenant_id: w.tenant, user_id: w.alice.user_id, granting: None };
        assert!(authorize(Some(&w.admin), Action::Delete, &alice).is_allowed());
        assert!(is_forbidden(&authorize(Some(&w.bob), Action::Delete, &alice)));
    }

    // ── subscription field lock ─────────────────────────────────────────────

    #[test]
    fn subscription_fields_are_super_admin_only() {
        let w = world();
        let tenant = Target::Tenant { tenant_id: w.tenant };

        let plan = Action::Update(mask(&[Field::Name, Field::SubscriptionPlan]));
        assert!(is_forbidden(&authorize(Some(&w.admin), plan, &tenant)));
        assert!(authorize(Some(&w.root), plan, &tenant).is_allowed());

        let rename = Action::Update(mask(&[Field::Name]));
        assert_eq!(authorize(Some(&w.admin), rename, &tenant), Decision::Allow(TENANT_NAME_FIELDS));
        assert!(is_forbidden(&authorize(Some(&w.alice), rename, &tenant)));
        assert!(authorize(Some(&w.alice), Action::Read, &tenant).is_allowed());
    }

    // ── list-all-tenants ────────────────────────────────────────────────────

    #[test]
    fn only_super_admin_lists_all_tenants() {
        let w = world();
        for caller in [&w.admin, &w.alice] {
            assert!(is_forbidden(&authorize(Some(caller), Action::List, &Target::TenantDirectory)));
        }
    }

    // ── privilege escalation ────────────────────────────────────────────────

    #[test]
    fn super_admin_role_is_never_granted() {
        let w = world();
        let create = Target::Users { tenant_id: w.tenant, granting: Some(Role::SuperAdmin) };
        assert!(is_forbidden(&authorize(Some(&w.admin), Action::Create, &create)));

        let promote = Target::User {
            tenant_id: w.tenant,
            user_id: w.alice.user_id,
            granting: Some(Role::SuperAdmin),
        };
        let d = authorize(Some(&w.admin), Action::Update(mask(&[Field::Role])), &promote);
        assert!(is_forbidden(&d));
    }

    #[test]
    fn denial_maps_to_domain_error() {
        assert_eq!(DomainError::from(Denial::NotFound("Task")), DomainError::not_found("Task"));
        assert_eq!(DomainError::from(Denial::Unauthorized), DomainError::Unauthorized);
    }
}

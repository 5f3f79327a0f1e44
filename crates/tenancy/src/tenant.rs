use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tenantdesk_auth::{Field, FieldMask};
use tenantdesk_core::{DomainError, DomainResult, Entity, TenantId, validate};

/// Tenant lifecycle. Only `Active` tenants accept logins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Suspended,
    Trial,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Suspended => "suspended",
            TenantStatus::Trial => "trial",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "active" => Ok(TenantStatus::Active),
            "suspended" => Ok(TenantStatus::Suspended),
            "trial" => Ok(TenantStatus::Trial),
            other => Err(DomainError::validation(format!("unknown tenant status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    Free,
    Pro,
    Enterprise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanLimits {
    pub max_users: i32,
    pub max_projects: i32,
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Free => "free",
            SubscriptionPlan::Pro => "pro",
            SubscriptionPlan::Enterprise => "enterprise",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "free" => Ok(SubscriptionPlan::Free),
            "pro" => Ok(SubscriptionPlan::Pro),
            "enterprise" => Ok(SubscriptionPlan::Enterprise),
            other => Err(DomainError::validation(format!("unknown subscription plan '{other}'"))),
        }
    }

    /// Default quotas of the plan.
    pub fn limits(&self) -> PlanLimits {
        match self {
            SubscriptionPlan::Free => PlanLimits { max_users: 5, max_projects: 3 },
            SubscriptionPlan::Pro => PlanLimits { max_users: 25, max_projects: 15 },
            SubscriptionPlan::Enterprise => PlanLimits { max_users: 100, max_projects: 50 },
        }
    }
}

/// Top-level tenant record.
///
/// `subdomain` is globally unique and never changes after registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub subdomain: String,
    pub status: TenantStatus,
    pub subscription_plan: SubscriptionPlan,
    pub max_users: i32,
    pub max_projects: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// A freshly registered tenant: free plan, active.
    pub fn register(name: &str, subdomain: &str, now: DateTime<Utc>) -> DomainResult<Self> {
        let plan = SubscriptionPlan::Free;
        let limits = plan.limits();
        Ok(Self {
            id: TenantId::new(),
            name: validate::required_text("name", name)?,
            subdomain: validate::subdomain(subdomain)?,
            status: TenantStatus::Active,
            subscription_plan: plan,
            max_users: limits.max_users,
            max_projects: limits.max_projects,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }

    /// Apply an already authorized and validated patch.
    ///
    /// A plan change without explicit limits resets the limits to the new
    /// plan's defaults.
    pub fn apply(&mut self, patch: TenantPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(plan) = patch.subscription_plan {
            if plan != self.subscription_plan {
                let limits = plan.limits();
                self.max_users = limits.max_users;
                self.max_projects = limits.max_projects;
            }
            self.subscription_plan = plan;
        }
        if let Some(max_users) = patch.max_users {
            self.max_users = max_users;
        }
        if let Some(max_projects) = patch.max_projects {
            self.max_projects = max_projects;
        }
        self.updated_at = now;
    }
}

impl Entity for Tenant {
    type Id = TenantId;
    const ENTITY_TYPE: &'static str = "tenant";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantPatch {
    pub name: Option<String>,
    pub status: Option<TenantStatus>,
    pub subscription_plan: Option<SubscriptionPlan>,
    pub max_users: Option<i32>,
    pub max_projects: Option<i32>,
}

impl TenantPatch {
    /// Fields this patch touches.
    pub fn fields(&self) -> FieldMask {
        let mut mask = FieldMask::EMPTY;
        if self.name.is_some() {
            mask.insert(Field::Name);
        }
        if self.status.is_some() {
            mask.insert(Field::Status);
        }
        if self.subscription_plan.is_some() {
            mask.insert(Field::SubscriptionPlan);
        }
        if self.max_users.is_some() {
            mask.insert(Field::MaxUsers);
        }
        if self.max_projects.is_some() {
            mask.insert(Field::MaxProjects);
        }
        mask
    }

    pub fn validate(mut self) -> DomainResult<Self> {
        if let Some(name) = &self.name {
            self.name = Some(validate::required_text("name", name)?);
        }
        if let Some(v) = self.max_users {
            validate::positive_limit("maxUsers", v)?;
        }
        if let Some(v) = self.max_projects {
            validate::positive_limit("maxProjects", v)?;
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantFilter {
    pub status: Option<TenantStatus>,
    pub plan: Option<SubscriptionPlan>,
    /// Case-insensitive substring of name or subdomain.
    pub search: Option<String>,
}

impl TenantFilter {
    pub fn matches(&self, tenant: &Tenant) -> bool {
        if self.status.is_some_and(|s| s != tenant.status) {
            return false;
        }
        if self.plan.is_some_and(|p| p != tenant.subscription_plan) {
            return false;
        }
        match &self.search {
            Some(q) => {
                let q = q.to_lowercase();
                tenant.name.to_lowercase().contains(&q) || tenant.subdomain.contains(&q)
            }
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantStats {
    pub total_users: i64,
    pub total_projects: i64,
    pub total_tasks: i64,
}

/// Row of the super-admin tenant directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSummary {
    #[serde(flatten)]
    pub tenant: Tenant,
    pub user_count: i64,
    pub project_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acme() -> Tenant {
        Tenant::register("Acme", "acme", Utc::now()).unwrap()
    }

    #[test]
    fn registration_defaults_to_free_active() {
        let t = acme();
        assert_eq!(t.subscription_plan, SubscriptionPlan::Free);
        assert_eq!((t.max_users, t.max_projects), (5, 3));
        assert!(t.is_active());
    }

    #[test]
    fn registration_normalizes_and_validates() {
        let t = Tenant::register("  Acme Inc ", "ACME", Utc::now()).unwrap();
        assert_eq!(t.name, "Acme Inc");
        assert_eq!(t.subdomain, "acme");
        assert!(Tenant::register("Acme", "a", Utc::now()).is_err());
        assert!(Tenant::register("", "acme", Utc::now()).is_err());
    }

    #[test]
    fn plan_change_resets_limits_unless_explicit() {
        let mut t = acme();
        t.apply(
            TenantPatch {
                subscription_plan: Some(SubscriptionPlan::Enterprise),
                ..Default::default()
            },
            Utc::now(),
        );
        assert_eq!((t.max_users, t.max_projects), (100, 50));

        t.apply(
            TenantPatch {
                subscription_plan: Some(SubscriptionPlan::Pro),
                max_projects: Some(40),
                ..Default::default()
            },
            Utc::now(),
        );
        assert_eq!((t.max_users, t.max_projects), (25, 40));
    }

    #[test]
    fn patch_fields_and_limit_validation() {
        let patch = TenantPatch {
            name: Some("X".into()),
            max_users: Some(0),
            ..Default::default()
        };
        assert_eq!(patch.fields(), FieldMask::of(&[Field::Name, Field::MaxUsers]));
        assert!(patch.validate().is_err());
    }

    #[test]
    fn wire_shape_is_camel_case() {
        let json = serde_json::to_value(acme()).unwrap();
        assert_eq!(json["subscriptionPlan"], "free");
        assert_eq!(json["maxProjects"], 3);
        assert_eq!(json["status"], "active");
    }

    #[test]
    fn filter_matches_search_and_plan() {
        let t = acme();
        let f = TenantFilter {
            search: Some("ACM".into()),
            plan: Some(SubscriptionPlan::Free),
            ..Default::default()
        };
        assert!(f.matches(&t));
        for wildcard in ["a_me", "ac%"] {
            let f = TenantFilter { search: Some(wildcard.into()), ..Default::default() };
            assert!(!f.matches(&t), "{wildcard} is matched literally");
        }
        let f = TenantFilter {
            status: Some(TenantStatus::Suspended),
            ..Default::default()
        };
        assert!(!f.matches(&t));
    }
}

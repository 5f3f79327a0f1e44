//! Optional startup seeding: a bootstrap super admin and a demo tenant.
//!
//! Seeding is idempotent; records that already exist are left untouched.
//! The demo workspace (admin, two users, two projects, three tasks) is
//! created only alongside a fresh demo tenant.

use chrono::Utc;

use tenantdesk_auth::{Claims, Role, hash_password};
use tenantdesk_core::{DomainError, DomainResult, validate};
use tenantdesk_projects::{NewProject, NewTask, TaskPriority};
use tenantdesk_tenancy::{NewUser, SubscriptionPlan, Tenant, TenantPatch, User};

use crate::config::{AppConfig, SuperAdminSeed};
use crate::services::{Caller, Services, blocking};

pub const DEMO_SUPER_ADMIN_EMAIL: &str = "superadmin@system.com";
pub const DEMO_SUPER_ADMIN_PASSWORD: &str = "Admin@123";
pub const DEMO_SUBDOMAIN: &str = "demo";
pub const DEMO_ADMIN_EMAIL: &str = "admin@demo.com";
pub const DEMO_ADMIN_PASSWORD: &str = "Demo@123";
pub const DEMO_USER_EMAILS: [&str; 2] = ["user1@demo.com", "user2@demo.com"];
pub const DEMO_USER_PASSWORD: &str = "User@123";

pub async fn bootstrap(services: &Services, config: &AppConfig) -> DomainResult<()> {
    if let Some(seed) = &config.super_admin {
        ensure_super_admin(services, seed).await?;
    }
    if config.seed_demo {
        if config.super_admin.is_none() {
            let seed = SuperAdminSeed {
                email: DEMO_SUPER_ADMIN_EMAIL.to_string(),
                password: DEMO_SUPER_ADMIN_PASSWORD.to_string(),
            };
            ensure_super_admin(services, &seed).await?;
        }
        ensure_demo_tenant(services).await?;
    }
    Ok(())
}

async fn hash(password: &str) -> DomainResult<String> {
    let password = password.to_string();
    blocking(move || hash_password(&password))
        .await?
        .map_err(|e| DomainError::internal(e.to_string()))
}

async fn ensure_super_admin(services: &Services, seed: &SuperAdminSeed) -> DomainResult<()> {
    let email = validate::email(&seed.email)?;
    if services.store.find_user_by_email(None, &email).await?.is_some() {
        return Ok(());
    }
    let new = NewUser {
        email,
        password: seed.password.clone(),
        full_name: "Super Admin".to_string(),
        role: Role::SuperAdmin,
    }
    .validate()?;
    let user = User::new(None, new, hash(&seed.password).await?, Utc::now())?;
    let user = services.store.insert_super_admin(user).await?;
    tracing::info!(user_id = %user.id, "super admin seeded");
    Ok(())
}

/// Demo tenant on the pro plan with its admin account.
async fn ensure_demo_tenant(services: &Services) -> DomainResult<()> {
    if services.store.get_tenant_by_subdomain(DEMO_SUBDOMAIN).await?.is_some() {
        return Ok(());
    }
    let now = Utc::now();
    let mut tenant = Tenant::register("Demo Company", DEMO_SUBDOMAIN, now)?;
    tenant.apply(
        TenantPatch {
            subscription_plan: Some(SubscriptionPlan::Pro),
            ..Default::default()
        },
        now,
    );

    let new = NewUser {
        email: DEMO_ADMIN_EMAIL.to_string(),
        password: DEMO_ADMIN_PASSWORD.to_string(),
        full_name: "Demo Admin".to_string(),
        role: Role::TenantAdmin,
    }
    .validate()?;
    let admin = User::new(Some(tenant.id), new, hash(DEMO_ADMIN_PASSWORD).await?, now)?;
    let (tenant, admin) = services.store.create_tenant_with_admin(tenant, admin).await?;

    // The rest goes through the services as the demo admin, so limits and
    // audit apply as for any other tenant.
    let admin = Caller::new(Claims::new(admin.id, Some(tenant.id), Role::TenantAdmin), None);
    let mut users = Vec::with_capacity(DEMO_USER_EMAILS.len());
    for (email, full_name) in DEMO_USER_EMAILS.into_iter().zip(["Demo User One", "Demo User Two"]) {
        let new = NewUser {
            email: email.to_string(),
            password: DEMO_USER_PASSWORD.to_string(),
            full_name: full_name.to_string(),
            role: Role::User,
        };
        users.push(services.users.create(&admin, tenant.id, new).await?.id);
    }

    let mut projects = Vec::with_capacity(2);
    for (name, description) in [("Project Alpha", "First demo project"), ("Project Beta", "Second demo project")] {
        let new = NewProject {
            name: name.to_string(),
            description: Some(description.to_string()),
            status: None,
        };
        projects.push(services.projects.create(&admin, new).await?.id);
    }

    let tasks = [
        (projects[0], "Design UI", TaskPriority::High, users[0]),
        (projects[0], "Create API", TaskPriority::Medium, users[1]),
        (projects[1], "Write Docs", TaskPriority::Low, users[0]),
    ];
    for (project_id, title, priority, assignee) in tasks {
        let new = NewTask {
            title: title.to_string(),
            description: None,
            status: None,
            priority: Some(priority),
            assigned_to: Some(assignee),
            due_date: None,
        };
        services.tasks.create(&admin, project_id, new).await?;
    }

    tracing::info!(tenant_id = %tenant.id, subdomain = DEMO_SUBDOMAIN, "demo tenant seeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tenantdesk_auth::TokenService;
    use tenantdesk_projects::{ProjectFilter, TaskFilter};

    use crate::audit::InMemoryAuditSink;
    use crate::services::LoginRequest;
    use crate::store::InMemoryStore;

    fn demo_config() -> AppConfig {
        AppConfig::from_lookup(|key| (key == "SEED_DEMO").then(|| "true".to_string())).unwrap()
    }

    #[tokio::test]
    async fn demo_seed_builds_the_sample_workspace_once() {
        let services = Services::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryAuditSink::new()),
            TokenService::new(b"test-secret", 3600),
        );
        let config = demo_config();
        bootstrap(&services, &config).await.unwrap();
        bootstrap(&services, &config).await.unwrap();

        let tenant = services
            .store
            .get_tenant_by_subdomain(DEMO_SUBDOMAIN)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tenant.subscription_plan, SubscriptionPlan::Pro);
        assert_eq!((tenant.max_users, tenant.max_projects), (25, 15));

        let stats = services.store.tenant_stats(tenant.id).await.unwrap();
        assert_eq!((stats.total_users, stats.total_projects), (3, 2));

        let login = services
            .auth
            .login(LoginRequest {
                email: DEMO_USER_EMAILS[0].to_string(),
                password: DEMO_USER_PASSWORD.to_string(),
                tenant_subdomain: Some(DEMO_SUBDOMAIN.to_string()),
            })
            .await
            .unwrap();
        assert_eq!(login.user.role, Role::User);

        let admin = services
            .store
            .find_user_by_email(Some(tenant.id), DEMO_ADMIN_EMAIL)
            .await
            .unwrap()
            .unwrap();
        let admin = Caller::new(Claims::new(admin.id, Some(tenant.id), Role::TenantAdmin), None);
        let projects = services
            .projects
            .list(&admin, ProjectFilter::default(), Default::default())
            .await
            .unwrap();
        let task_counts: Vec<(String, i64)> = projects
            .items
            .iter()
            .map(|p| (p.project.name.clone(), p.task_count))
            .collect();
        assert!(task_counts.contains(&("Project Alpha".to_string(), 2)));
        assert!(task_counts.contains(&("Project Beta".to_string(), 1)));

        let alpha = projects
            .items
            .iter()
            .find(|p| p.project.name == "Project Alpha")
            .unwrap();
        let tasks = services
            .tasks
            .list(&admin, alpha.project.id, TaskFilter::default())
            .await
            .unwrap();
        let titles: Vec<&str> = tasks.iter().map(|t| t.task.title.as_str()).collect();
        assert_eq!(titles, ["Design UI", "Create API"]);
        assert!(tasks.iter().all(|t| t.task.assigned_to.is_some()));

        // The demo super admin exists exactly once.
        assert!(
            services
                .store
                .find_user_by_email(None, DEMO_SUPER_ADMIN_EMAIL)
                .await
                .unwrap()
                .is_some()
        );
    }
}

//! Integration tests for the service layer over the in-memory store.
//!
//! Tests: Services → policy engine → Store → AuditSink
//!
//! Verifies:
//! - Registration defaults and subdomain uniqueness
//! - Tenant isolation (other tenants' records read as absent)
//! - Role rules (subscription lock, ownership, assignee status updates)
//! - Login failures are indistinguishable
//! - Tenants that are not active block logins
//! - Cascades and assignment clearing
//! - Quota checks hold under concurrent creation

use std::sync::Arc;

use chrono::NaiveDate;

use tenantdesk_auth::{Claims, Role, TokenService};
use tenantdesk_core::{DomainError, PageRequest, Patch, UserId};
use tenantdesk_projects::{
    NewProject, NewTask, ProjectFilter, TaskFilter, TaskPatch, TaskPriority, TaskStatus,
};
use tenantdesk_tenancy::{
    NewUser, Registration, SubscriptionPlan, Tenant, TenantPatch, TenantStatus, User,
};

use crate::audit::{AuditAction, InMemoryAuditSink};
use crate::services::{Caller, LoginRequest, Services};
use crate::store::InMemoryStore;

const PASSWORD: &str = "Secret123";

struct Fixture {
    services: Services,
    audit: Arc<InMemoryAuditSink>,
}

fn setup() -> Fixture {
    let audit = Arc::new(InMemoryAuditSink::new());
    let services = Services::new(
        Arc::new(InMemoryStore::new()),
        audit.clone(),
        TokenService::new(b"test-secret", 3600),
    );
    Fixture { services, audit }
}

fn caller(user: &User) -> Caller {
    Caller::new(Claims::new(user.id, user.tenant_id, user.role), None)
}

fn registration(subdomain: &str) -> Registration {
    Registration {
        name: format!("{subdomain} Inc"),
        subdomain: subdomain.to_string(),
        admin_email: format!("admin@{subdomain}.com"),
        admin_password: PASSWORD.to_string(),
        admin_full_name: "Admin".to_string(),
    }
}

async fn register(fx: &Fixture, subdomain: &str) -> (Tenant, Caller) {
    let out = fx
        .services
        .tenants
        .register(registration(subdomain), None)
        .await
        .unwrap();
    let admin = caller(&out.admin_user);
    (out.tenant, admin)
}

async fn add_user(fx: &Fixture, admin: &Caller, email: &str, role: Role) -> (User, Caller) {
    let tenant_id = admin.claims.tenant_id.unwrap();
    let user = fx
        .services
        .users
        .create(
            admin,
            tenant_id,
            NewUser {
                email: email.to_string(),
                password: PASSWORD.to_string(),
                full_name: email.to_string(),
                role,
            },
        )
        .await
        .unwrap();
    let c = caller(&user);
    (user, c)
}

fn project(name: &str) -> NewProject {
    NewProject {
        name: name.to_string(),
        description: None,
        status: None,
    }
}

fn task(title: &str) -> NewTask {
    NewTask {
        title: title.to_string(),
        description: None,
        status: None,
        priority: None,
        assigned_to: None,
        due_date: None,
    }
}

#[tokio::test]
async fn registration_defaults_and_duplicate_subdomain() {
    let fx = setup();
    let (tenant, admin) = register(&fx, "acme").await;

    assert_eq!(tenant.subscription_plan, SubscriptionPlan::Free);
    assert_eq!(tenant.status, TenantStatus::Active);
    assert_eq!((tenant.max_users, tenant.max_projects), (5, 3));
    assert_eq!(admin.claims.role, Role::TenantAdmin);
    assert_eq!(admin.claims.tenant_id, Some(tenant.id));

    let mut dup = registration("ACME");
    dup.admin_email = "other@acme.com".to_string();
    let err = fx.services.tenants.register(dup, None).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));
}

#[tokio::test]
async fn tenant_admin_cannot_change_plan() {
    let fx = setup();
    let (tenant, admin) = register(&fx, "acme").await;

    let patch = TenantPatch {
        name: Some("Renamed".to_string()),
        subscription_plan: Some(SubscriptionPlan::Enterprise),
        ..Default::default()
    };
    let err = fx.services.tenants.update(&admin, tenant.id, patch).await.unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    // Nothing applied, not even the allowed field.
    let details = fx.services.tenants.get(&admin, tenant.id).await.unwrap();
    assert_eq!(details.tenant.name, "acme Inc");
    assert_eq!(details.tenant.subscription_plan, SubscriptionPlan::Free);

    let renamed = fx
        .services
        .tenants
        .update(
            &admin,
            tenant.id,
            TenantPatch {
                name: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Renamed");
}

#[tokio::test]
async fn other_tenants_records_read_as_absent() {
    let fx = setup();
    let (tenant_a, admin_a) = register(&fx, "alpha").await;
    let (tenant_b, admin_b) = register(&fx, "bravo").await;

    let p = fx.services.projects.create(&admin_b, project("secret")).await.unwrap();

    let err = fx.services.projects.get(&admin_a, p.id).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
    let err = fx.services.tenants.get(&admin_a, tenant_b.id).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
    let err = fx
        .services
        .users
        .list(&admin_a, tenant_b.id, Default::default(), PageRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));

    let listed = fx
        .services
        .projects
        .list(&admin_a, ProjectFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 0);
    assert!(fx.services.tenants.get(&admin_a, tenant_a.id).await.is_ok());
}

#[tokio::test]
async fn users_only_manage_their_own_projects() {
    let fx = setup();
    let (_, admin) = register(&fx, "acme").await;
    let (_, alice) = add_user(&fx, &admin, "alice@acme.com", Role::User).await;
    let (_, bob) = add_user(&fx, &admin, "bob@acme.com", Role::User).await;

    let p = fx.services.projects.create(&alice, project("alice's")).await.unwrap();

    let err = fx.services.projects.delete(&bob, p.id).await.unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));
    // Same-tenant reads are fine.
    assert!(fx.services.projects.get(&bob, p.id).await.is_ok());

    fx.services.projects.delete(&admin, p.id).await.unwrap();
    let err = fx.services.projects.get(&alice, p.id).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let fx = setup();
    register(&fx, "acme").await;

    let attempt = |email: &str, password: &str, subdomain: Option<&str>| LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
        tenant_subdomain: subdomain.map(str::to_string),
    };

    let wrong_password = fx
        .services
        .auth
        .login(attempt("admin@acme.com", "wrong-password", Some("acme")))
        .await
        .unwrap_err();
    let wrong_subdomain = fx
        .services
        .auth
        .login(attempt("admin@acme.com", PASSWORD, Some("nope")))
        .await
        .unwrap_err();
    let unknown_email = fx
        .services
        .auth
        .login(attempt("ghost@acme.com", PASSWORD, Some("acme")))
        .await
        .unwrap_err();
    // Tenant users are not found without a subdomain.
    let no_subdomain = fx
        .services
        .auth
        .login(attempt("admin@acme.com", PASSWORD, None))
        .await
        .unwrap_err();

    for err in [&wrong_password, &wrong_subdomain, &unknown_email, &no_subdomain] {
        assert_eq!(err, &DomainError::InvalidCredentials);
    }

    let ok = fx
        .services
        .auth
        .login(attempt("ADMIN@acme.com", PASSWORD, Some("Acme")))
        .await
        .unwrap();
    let claims = fx.services.auth.tokens().verify(&ok.token.token).unwrap();
    assert_eq!(claims.user_id, ok.user.id);
    assert_eq!(claims.role, Role::TenantAdmin);
}

#[tokio::test]
async fn deactivated_users_cannot_log_in() {
    let fx = setup();
    let (_, admin) = register(&fx, "acme").await;
    let (alice, _) = add_user(&fx, &admin, "alice@acme.com", Role::User).await;

    fx.services
        .users
        .update(
            &admin,
            alice.id,
            tenantdesk_tenancy::UserPatch {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = fx
        .services
        .auth
        .login(LoginRequest {
            email: "alice@acme.com".to_string(),
            password: PASSWORD.to_string(),
            tenant_subdomain: Some("acme".to_string()),
        })
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::InvalidCredentials);
}

fn super_admin() -> Caller {
    Caller::new(Claims::new(UserId::new(), None, Role::SuperAdmin), None)
}

async fn login_to(fx: &Fixture, email: &str, subdomain: &str) -> Result<(), DomainError> {
    fx.services
        .auth
        .login(LoginRequest {
            email: email.to_string(),
            password: PASSWORD.to_string(),
            tenant_subdomain: Some(subdomain.to_string()),
        })
        .await
        .map(|_| ())
}

#[tokio::test]
async fn inactive_tenants_block_logins() {
    let fx = setup();
    let root = super_admin();
    let (acme, admin) = register(&fx, "acme").await;
    add_user(&fx, &admin, "alice@acme.com", Role::User).await;
    assert_eq!(login_to(&fx, "admin@acme.com", "acme").await, Ok(()));

    for status in [TenantStatus::Suspended, TenantStatus::Trial] {
        let patch = TenantPatch {
            status: Some(status),
            ..Default::default()
        };
        let updated = fx.services.tenants.update(&root, acme.id, patch).await.unwrap();
        assert_eq!(updated.status, status);

        for email in ["admin@acme.com", "alice@acme.com"] {
            assert_eq!(
                login_to(&fx, email, "acme").await,
                Err(DomainError::InvalidCredentials),
                "{email} logged in while tenant was {status:?}"
            );
        }
    }

    // Other tenants are unaffected, and reactivation restores access.
    register(&fx, "globex").await;
    assert_eq!(login_to(&fx, "admin@globex.com", "globex").await, Ok(()));

    let reactivate = TenantPatch {
        status: Some(TenantStatus::Active),
        ..Default::default()
    };
    fx.services.tenants.update(&root, acme.id, reactivate).await.unwrap();
    assert_eq!(login_to(&fx, "alice@acme.com", "acme").await, Ok(()));
}

#[tokio::test]
async fn deleting_a_user_clears_assignments_and_deleting_a_project_drops_tasks() {
    let fx = setup();
    let (_, admin) = register(&fx, "acme").await;
    let (alice, _) = add_user(&fx, &admin, "alice@acme.com", Role::User).await;

    let p = fx.services.projects.create(&admin, project("p")).await.unwrap();
    let t = fx
        .services
        .tasks
        .create(
            &admin,
            p.id,
            NewTask {
                assigned_to: Some(alice.id),
                ..task("assigned")
            },
        )
        .await
        .unwrap();
    assert_eq!(t.assigned_to, Some(alice.id));

    fx.services.users.delete(&admin, alice.id).await.unwrap();
    let tasks = fx.services.tasks.list(&admin, p.id, TaskFilter::default()).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].task.assigned_to, None);
    assert_eq!(tasks[0].assignee_name, None);

    fx.services.projects.delete(&admin, p.id).await.unwrap();
    assert!(fx.services.store.get_task(t.id).await.unwrap().is_none());
}

#[tokio::test]
async fn tasks_are_listed_by_priority_then_due_date() {
    let fx = setup();
    let (_, admin) = register(&fx, "acme").await;
    let p = fx.services.projects.create(&admin, project("p")).await.unwrap();

    let day = |d| NaiveDate::from_ymd_opt(2026, 3, d).unwrap();
    let specs = [
        ("low", TaskPriority::Low, Some(day(1))),
        ("high-undated", TaskPriority::High, None),
        ("medium", TaskPriority::Medium, Some(day(2))),
        ("high-late", TaskPriority::High, Some(day(20))),
        ("high-early", TaskPriority::High, Some(day(5))),
    ];
    for (title, priority, due_date) in specs {
        fx.services
            .tasks
            .create(
                &admin,
                p.id,
                NewTask {
                    priority: Some(priority),
                    due_date,
                    ..task(title)
                },
            )
            .await
            .unwrap();
    }

    let titles: Vec<_> = fx
        .services
        .tasks
        .list(&admin, p.id, TaskFilter::default())
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.task.title)
        .collect();
    assert_eq!(titles, ["high-early", "high-late", "high-undated", "medium", "low"]);
}

#[tokio::test]
async fn assignee_must_belong_to_the_tenant() {
    let fx = setup();
    let (_, admin_a) = register(&fx, "alpha").await;
    let (_, admin_b) = register(&fx, "bravo").await;
    let p = fx.services.projects.create(&admin_a, project("p")).await.unwrap();

    let outsider = admin_b.claims.user_id;
    let err = fx
        .services
        .tasks
        .create(
            &admin_a,
            p.id,
            NewTask {
                assigned_to: Some(outsider),
                ..task("t")
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidReference(_)));

    let t = fx.services.tasks.create(&admin_a, p.id, task("t")).await.unwrap();
    let err = fx
        .services
        .tasks
        .update(
            &admin_a,
            t.id,
            TaskPatch {
                assigned_to: Patch::Value(outsider),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidReference(_)));
}

#[tokio::test]
async fn assignee_may_only_change_status() {
    let fx = setup();
    let (_, admin) = register(&fx, "acme").await;
    let (alice, alice_c) = add_user(&fx, &admin, "alice@acme.com", Role::User).await;
    let (_, bob_c) = add_user(&fx, &admin, "bob@acme.com", Role::User).await;

    let p = fx.services.projects.create(&admin, project("p")).await.unwrap();
    let t = fx
        .services
        .tasks
        .create(
            &admin,
            p.id,
            NewTask {
                assigned_to: Some(alice.id),
                ..task("t")
            },
        )
        .await
        .unwrap();

    let updated = fx
        .services
        .tasks
        .update_status(&alice_c, t.id, TaskStatus::InProgress)
        .await
        .unwrap();
    assert_eq!(updated.status, TaskStatus::InProgress);

    let err = fx
        .services
        .tasks
        .update(
            &alice_c,
            t.id,
            TaskPatch {
                title: Some("renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    let err = fx
        .services
        .tasks
        .update_status(&bob_c, t.id, TaskStatus::Completed)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));
}

#[tokio::test]
async fn mutations_are_audited() {
    let fx = setup();
    let (tenant, admin) = register(&fx, "acme").await;
    let p = fx.services.projects.create(&admin, project("p")).await.unwrap();
    fx.services.projects.delete(&admin, p.id).await.unwrap();
    fx.services.auth.logout(&admin).await.unwrap();

    let entries = fx.audit.entries();
    let actions: Vec<_> = entries.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        [
            AuditAction::RegisterTenant,
            AuditAction::CreateProject,
            AuditAction::DeleteProject,
            AuditAction::Logout,
        ]
    );
    assert!(entries.iter().all(|e| e.tenant_id == Some(tenant.id)));
    assert_eq!(entries[1].entity_type, "project");
    assert_eq!(entries[1].entity_id, Some(p.id.into()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_project_creation_respects_quota() {
    let fx = setup();
    let (tenant, admin) = register(&fx, "acme").await;
    let max = tenant.max_projects as usize;

    let handles: Vec<_> = (0..max * 4)
        .map(|i| {
            let services = fx.services.clone();
            let admin = admin.clone();
            tokio::spawn(async move { services.projects.create(&admin, project(&format!("p{i}"))).await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(err) => assert!(matches!(err, DomainError::QuotaExceeded(_)), "{err:?}"),
        }
    }
    assert_eq!(created, max);

    let listed = fx
        .services
        .projects
        .list(&admin, ProjectFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(listed.total, max as u64);
}

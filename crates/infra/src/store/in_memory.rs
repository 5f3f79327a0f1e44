use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tenantdesk_core::{Page, PageRequest, ProjectId, TaskId, TenantId, UserId};
use tenantdesk_projects::{
    Project, ProjectFilter, ProjectSummary, Task, TaskFilter, TaskStatus, TaskView, priority_order,
};
use tenantdesk_tenancy::{Tenant, TenantFilter, TenantStats, TenantSummary, User, UserFilter};

use super::{
    ASSIGNEE_OUTSIDE_TENANT, EMAIL_TAKEN, PROJECT_LIMIT, Store, StoreError, SUBDOMAIN_TAKEN,
    USER_LIMIT,
};

#[derive(Debug, Default)]
struct State {
    tenants: HashMap<TenantId, Tenant>,
    users: HashMap<UserId, User>,
    projects: HashMap<ProjectId, Project>,
    tasks: HashMap<TaskId, Task>,
}

impl State {
    fn email_taken(&self, tenant_id: Option<TenantId>, email: &str) -> bool {
        self.users
            .values()
            .any(|u| u.tenant_id == tenant_id && u.email == email)
    }

    fn users_in(&self, tenant_id: TenantId) -> impl Iterator<Item = &User> {
        self.users.values().filter(move |u| u.tenant_id == Some(tenant_id))
    }

    fn projects_in(&self, tenant_id: TenantId) -> impl Iterator<Item = &Project> {
        self.projects.values().filter(move |p| p.tenant_id == tenant_id)
    }

    fn check_assignee(&self, task: &Task) -> Result<(), StoreError> {
        match task.assigned_to {
            Some(uid) => match self.users.get(&uid) {
                Some(u) if u.tenant_id == Some(task.tenant_id) => Ok(()),
                _ => Err(StoreError::InvalidReference(ASSIGNEE_OUTSIDE_TENANT.to_string())),
            },
            None => Ok(()),
        }
    }
}

/// In-memory store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl Store for InMemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.read().map(|_| ())
    }

    async fn create_tenant_with_admin(&self, tenant: Tenant, admin: User) -> Result<(Tenant, User), StoreError> {
        let mut state = self.write()?;
        if state.tenants.values().any(|t| t.subdomain == tenant.subdomain) {
            return Err(StoreError::Conflict(SUBDOMAIN_TAKEN.to_string()));
        }
        if admin.tenant_id != Some(tenant.id) {
            return Err(StoreError::InvalidReference("admin must belong to the new tenant".to_string()));
        }
        state.tenants.insert(tenant.id, tenant.clone());
        state.users.insert(admin.id, admin.clone());
        Ok((tenant, admin))
    }

    async fn get_tenant(&self, id: TenantId) -> Result<Option<Tenant>, StoreError> {
        Ok(self.read()?.tenants.get(&id).cloned())
    }

    async fn get_tenant_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, StoreError> {
        Ok(self
            .read()?
            .tenants
            .values()
            .find(|t| t.subdomain == subdomain)
            .cloned())
    }

    async fn update_tenant(&self, tenant: &Tenant) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let stored = state
            .tenants
            .get_mut(&tenant.id)
            .ok_or(StoreError::NotFound("Tenant"))?;
        let subdomain = std::mem::take(&mut stored.subdomain);
        *stored = Tenant {
            subdomain,
            created_at: stored.created_at,
            ..tenant.clone()
        };
        Ok(())
    }

    async fn list_tenants(&self, filter: &TenantFilter, page: PageRequest) -> Result<Page<TenantSummary>, StoreError> {
        let state = self.read()?;
        let mut rows: Vec<TenantSummary> = state
            .tenants
            .values()
            .filter(|t| filter.matches(t))
            .map(|t| TenantSummary {
                tenant: t.clone(),
                user_count: state.users_in(t.id).count() as i64,
                project_count: state.projects_in(t.id).count() as i64,
            })
            .collect();
        rows.sort_by_key(|r| Reverse((r.tenant.created_at, r.tenant.id)));
        Ok(page.slice(rows))
    }

    async fn tenant_stats(&self, id: TenantId) -> Result<TenantStats, StoreError> {
        let state = self.read()?;
        Ok(TenantStats {
            total_users: state.users_in(id).count() as i64,
            total_projects: state.projects_in(id).count() as i64,
            total_tasks: state.tasks.values().filter(|t| t.tenant_id == id).count() as i64,
        })
    }

    async fn insert_user_within_quota(&self, user: User) -> Result<User, StoreError> {
        let tenant_id = user
            .tenant_id
            .ok_or_else(|| StoreError::InvalidReference("tenant user without tenant".to_string()))?;

        let mut state = self.write()?;
        let max_users = state
            .tenants
            .get(&tenant_id)
            .map(|t| t.max_users)
            .ok_or(StoreError::NotFound("Tenant"))?;
        if state.users_in(tenant_id).count() as i64 >= i64::from(max_users) {
            return Err(StoreError::QuotaExceeded(USER_LIMIT.to_string()));
        }
        if state.email_taken(Some(tenant_id), &user.email) {
            return Err(StoreError::Conflict(EMAIL_TAKEN.to_string()));
        }
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn insert_super_admin(&self, user: User) -> Result<User, StoreError> {
        if user.tenant_id.is_some() {
            return Err(StoreError::InvalidReference("super admin cannot belong to a tenant".to_string()));
        }
        let mut state = self.write()?;
        if state.email_taken(None, &user.email) {
            return Err(StoreError::Conflict("Email already exists".to_string()));
        }
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, tenant_id: Option<TenantId>, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.tenant_id == tenant_id && u.email == email)
            .cloned())
    }

    async fn list_users(&self, tenant_id: TenantId, filter: &UserFilter, page: PageRequest) -> Result<Page<User>, StoreError> {
        let state = self.read()?;
        let mut users: Vec<User> = state
            .users_in(tenant_id)
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        users.sort_by_key(|u| Reverse((u.created_at, u.id)));
        Ok(page.slice(users))
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let stored = state.users.get_mut(&user.id).ok_or(StoreError::NotFound("User"))?;
        stored.full_name = user.full_name.clone();
        stored.role = user.role;
        stored.is_active = user.is_active;
        stored.updated_at = user.updated_at;
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.users.remove(&id).is_none() {
            return Err(StoreError::NotFound("User"));
        }
        for task in state.tasks.values_mut() {
            if task.assigned_to == Some(id) {
                task.assigned_to = None;
            }
        }
        Ok(())
    }

    async fn insert_project_within_quota(&self, project: Project) -> Result<Project, StoreError> {
        let mut state = self.write()?;
        let max_projects = state
            .tenants
            .get(&project.tenant_id)
            .map(|t| t.max_projects)
            .ok_or(StoreError::NotFound("Tenant"))?;
        if state.projects_in(project.tenant_id).count() as i64 >= i64::from(max_projects) {
            return Err(StoreError::QuotaExceeded(PROJECT_LIMIT.to_string()));
        }
        state.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn get_project(&self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        Ok(self.read()?.projects.get(&id).cloned())
    }

    async fn list_projects(
        &self,
        tenant_id: TenantId,
        filter: &ProjectFilter,
        page: PageRequest,
    ) -> Result<Page<ProjectSummary>, StoreError> {
        let state = self.read()?;
        let mut rows: Vec<ProjectSummary> = state
            .projects_in(tenant_id)
            .filter(|p| filter.matches(p))
            .map(|p| {
                let tasks = state.tasks.values().filter(|t| t.project_id == p.id);
                let (total, completed) = tasks.fold((0i64, 0i64), |(n, c), t| {
                    (n + 1, c + i64::from(t.status == TaskStatus::Completed))
                });
                ProjectSummary {
                    project: p.clone(),
                    creator_name: state.users.get(&p.created_by).map(|u| u.full_name.clone()),
                    task_count: total,
                    completed_task_count: completed,
                }
            })
            .collect();
        rows.sort_by_key(|r| Reverse((r.project.created_at, r.project.id)));
        Ok(page.slice(rows))
    }

    async fn update_project(&self, project: &Project) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let stored = state
            .projects
            .get_mut(&project.id)
            .ok_or(StoreError::NotFound("Project"))?;
        stored.name = project.name.clone();
        stored.description = project.description.clone();
        stored.status = project.status;
        stored.updated_at = project.updated_at;
        Ok(())
    }

    async fn delete_project(&self, id: ProjectId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.projects.remove(&id).is_none() {
            return Err(StoreError::NotFound("Project"));
        }
        state.tasks.retain(|_, t| t.project_id != id);
        Ok(())
    }

    async fn insert_task(&self, task: Task) -> Result<Task, StoreError> {
        let mut state = self.write()?;
        let project = state
            .projects
            .get(&task.project_id)
            .ok_or(StoreError::NotFound("Project"))?;
        if project.tenant_id != task.tenant_id {
            return Err(StoreError::InvalidReference("task tenant must match its project".to_string()));
        }
        state.check_assignee(&task)?;
        state.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.read()?.tasks.get(&id).cloned())
    }

    async fn list_tasks(&self, project_id: ProjectId, filter: &TaskFilter) -> Result<Vec<TaskView>, StoreError> {
        let state = self.read()?;
        let mut tasks: Vec<&Task> = state
            .tasks
            .values()
            .filter(|t| t.project_id == project_id && filter.matches(t))
            .collect();
        tasks.sort_by(|a, b| priority_order(a, b));
        Ok(tasks
            .into_iter()
            .map(|t| TaskView {
                task: t.clone(),
                assignee_name: t
                    .assigned_to
                    .and_then(|uid| state.users.get(&uid))
                    .map(|u| u.full_name.clone()),
            })
            .collect())
    }

    async fn update_task(&self, task: &Task) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state.check_assignee(task)?;
        let stored = state.tasks.get_mut(&task.id).ok_or(StoreError::NotFound("Task"))?;
        stored.title = task.title.clone();
        stored.description = task.description.clone();
        stored.status = task.status;
        stored.priority = task.priority;
        stored.assigned_to = task.assigned_to;
        stored.due_date = task.due_date;
        stored.updated_at = task.updated_at;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tenantdesk_auth::Role;
    use tenantdesk_projects::{NewProject, NewTask};
    use tenantdesk_tenancy::NewUser;

    fn user(tenant_id: Option<TenantId>, email: &str, role: Role) -> User {
        let new = NewUser {
            email: email.to_string(),
            password: "Secret123".to_string(),
            full_name: "Someone".to_string(),
            role,
        };
        User::new(tenant_id, new, "hash".to_string(), Utc::now()).unwrap()
    }

    async fn seeded() -> (InMemoryStore, Tenant, User) {
        let store = InMemoryStore::new();
        let tenant = Tenant::register("Acme", "acme", Utc::now()).unwrap();
        let admin = user(Some(tenant.id), "a@acme.com", Role::TenantAdmin);
        store.create_tenant_with_admin(tenant.clone(), admin.clone()).await.unwrap();
        (store, tenant, admin)
    }

    fn new_task(project: &Project, assigned_to: Option<UserId>) -> Task {
        let new = NewTask {
            title: "t".into(),
            description: None,
            status: None,
            priority: None,
            assigned_to,
            due_date: None,
        };
        Task::new(project, new, Utc::now())
    }

    #[tokio::test]
    async fn duplicate_subdomain_conflicts_and_writes_nothing() {
        let (store, _, _) = seeded().await;
        let again = Tenant::register("Acme 2", "acme", Utc::now()).unwrap();
        let admin = user(Some(again.id), "b@acme.com", Role::TenantAdmin);
        let err = store.create_tenant_with_admin(again, admin.clone()).await.unwrap_err();
        assert_eq!(err, StoreError::Conflict(SUBDOMAIN_TAKEN.to_string()));
        assert!(store.get_user(admin.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn user_quota_counts_existing_users() {
        let (store, tenant, _) = seeded().await;
        for i in 1..tenant.max_users {
            store
                .insert_user_within_quota(user(Some(tenant.id), &format!("u{i}@acme.com"), Role::User))
                .await
                .unwrap();
        }
        let err = store
            .insert_user_within_quota(user(Some(tenant.id), "late@acme.com", Role::User))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded(_)));
    }

    #[tokio::test]
    async fn email_unique_per_tenant_only() {
        let (store, tenant, _) = seeded().await;
        let err = store
            .insert_user_within_quota(user(Some(tenant.id), "a@acme.com", Role::User))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Conflict(EMAIL_TAKEN.to_string()));

        let other = Tenant::register("Other", "other", Utc::now()).unwrap();
        let admin = user(Some(other.id), "a@acme.com", Role::TenantAdmin);
        assert!(store.create_tenant_with_admin(other, admin).await.is_ok());
    }

    #[tokio::test]
    async fn deleting_user_clears_assignments_and_project_cascades() {
        let (store, tenant, admin) = seeded().await;
        let bob = store
            .insert_user_within_quota(user(Some(tenant.id), "bob@acme.com", Role::User))
            .await
            .unwrap();
        let project = Project::new(
            tenant.id,
            admin.id,
            NewProject { name: "P".into(), description: None, status: None },
            Utc::now(),
        );
        let project = store.insert_project_within_quota(project).await.unwrap();
        let task = store.insert_task(new_task(&project, Some(bob.id))).await.unwrap();

        store.delete_user(bob.id).await.unwrap();
        let kept = store.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(kept.assigned_to, None);

        store.delete_project(project.id).await.unwrap();
        assert!(store.get_task(task.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn assignee_must_be_in_task_tenant() {
        let (store, tenant, admin) = seeded().await;
        let other = Tenant::register("Other", "other", Utc::now()).unwrap();
        let stranger = user(Some(other.id), "s@other.com", Role::TenantAdmin);
        store.create_tenant_with_admin(other, stranger.clone()).await.unwrap();

        let project = Project::new(
            tenant.id,
            admin.id,
            NewProject { name: "P".into(), description: None, status: None },
            Utc::now(),
        );
        let project = store.insert_project_within_quota(project).await.unwrap();
        let err = store
            .insert_task(new_task(&project, Some(stranger.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidReference(_)));
    }

    #[tokio::test]
    async fn update_tenant_never_rewrites_subdomain() {
        let (store, tenant, _) = seeded().await;
        let mut changed = tenant.clone();
        changed.subdomain = "hijack".into();
        changed.name = "Acme Renamed".into();
        store.update_tenant(&changed).await.unwrap();
        let stored = store.get_tenant(tenant.id).await.unwrap().unwrap();
        assert_eq!(stored.subdomain, "acme");
        assert_eq!(stored.name, "Acme Renamed");
    }
}

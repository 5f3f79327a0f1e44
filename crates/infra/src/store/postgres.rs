//! Postgres-backed store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `InvalidReference` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / other | N/A | `Backend` |
//!
//! ## Quotas
//!
//! `insert_user_within_quota` and `insert_project_within_quota` lock the
//! tenant row (`SELECT ... FOR UPDATE`) before counting, so concurrent
//! inserts for one tenant serialize on that row and the count cannot go
//! stale between check and insert.

use std::sync::Arc;

use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use tenantdesk_auth::Role;
use tenantdesk_core::{DomainError, Page, PageRequest, ProjectId, TaskId, TenantId, UserId};
use tenantdesk_projects::{
    Project, ProjectFilter, ProjectStatus, ProjectSummary, Task, TaskFilter, TaskPriority,
    TaskStatus, TaskView,
};
use tenantdesk_tenancy::{
    SubscriptionPlan, Tenant, TenantFilter, TenantStats, TenantStatus, TenantSummary, User,
    UserFilter,
};

use super::schema::STATEMENTS;
use super::{
    ASSIGNEE_OUTSIDE_TENANT, EMAIL_TAKEN, PROJECT_LIMIT, Store, StoreError, SUBDOMAIN_TAKEN,
    USER_LIMIT,
};
use crate::audit::{AuditEntry, AuditSink};

const TENANT_COLUMNS: &str = "id, name, subdomain, status, subscription_plan, max_users, max_projects, created_at, updated_at";
const USER_COLUMNS: &str = "id, tenant_id, email, password_hash, full_name, role, is_active, created_at, updated_at";
const PROJECT_COLUMNS: &str = "id, tenant_id, name, description, status, created_by, created_at, updated_at";
const TASK_COLUMNS: &str = "id, project_id, tenant_id, title, description, status, priority, assigned_to, due_date, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and apply the schema.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in STATEMENTS {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        tracing::info!(statements = STATEMENTS.len(), "schema applied");
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

async fn rollback(tx: Transaction<'_, Postgres>) -> Result<(), StoreError> {
    tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))
}

async fn commit(tx: Transaction<'_, Postgres>) -> Result<(), StoreError> {
    tx.commit()
        .await
        .map_err(|e| map_sqlx_error("commit_transaction", e))
}

/// Lock the tenant row and return its quota column.
async fn lock_tenant_quota(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: TenantId,
    column: &str,
) -> Result<Option<i32>, StoreError> {
    let sql = format!("SELECT {column} AS quota FROM tenants WHERE id = $1 FOR UPDATE");
    let row = sqlx::query(&sql)
        .bind(tenant_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_tenant", e))?;
    row.map(|r| r.try_get::<i32, _>("quota"))
        .transpose()
        .map_err(|e| map_sqlx_error("lock_tenant", e))
}

async fn count_in_tenant(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    tenant_id: TenantId,
) -> Result<i64, StoreError> {
    let sql = format!("SELECT COUNT(*) AS total FROM {table} WHERE tenant_id = $1");
    sqlx::query(&sql)
        .bind(tenant_id.as_uuid())
        .fetch_one(&mut **tx)
        .await
        .and_then(|r| r.try_get::<i64, _>("total"))
        .map_err(|e| map_sqlx_error("count_in_tenant", e))
}

/// `assigned_to` must name a user of `tenant_id`. The row is share-locked
/// until commit so a concurrent delete cannot slip in between.
async fn check_assignee(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: TenantId,
    assigned_to: Option<UserId>,
) -> Result<(), StoreError> {
    let Some(user_id) = assigned_to else {
        return Ok(());
    };
    let found = sqlx::query("SELECT 1 AS one FROM users WHERE id = $1 AND tenant_id = $2 FOR SHARE")
        .bind(user_id.as_uuid())
        .bind(tenant_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("check_assignee", e))?;
    match found {
        Some(_) => Ok(()),
        None => Err(StoreError::InvalidReference(ASSIGNEE_OUTSIDE_TENANT.to_string())),
    }
}

/// Substring pattern for `ILIKE ... ESCAPE '\'`. Wildcards in the search
/// text match literally, like the in-memory store.
fn like_pattern(search: &Option<String>) -> Option<String> {
    search.as_ref().map(|q| {
        let mut pattern = String::with_capacity(q.len() + 2);
        pattern.push('%');
        for c in q.trim().chars() {
            if matches!(c, '\\' | '%' | '_') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    })
}

fn to_page<T>(items: Vec<T>, page: PageRequest, total: i64) -> Page<T> {
    Page {
        items,
        page: page.page,
        limit: page.limit,
        total: total.max(0) as u64,
    }
}

#[async_trait::async_trait]
impl Store for PostgresStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&*self.pool)
            .await
            .map(|_| ())
            .map_err(|e| map_sqlx_error("ping", e))
    }

    #[instrument(skip(self, tenant, admin), fields(tenant_id = %tenant.id, subdomain = %tenant.subdomain), err)]
    async fn create_tenant_with_admin(&self, tenant: Tenant, admin: User) -> Result<(Tenant, User), StoreError> {
        let mut tx = self.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO tenants (id, name, subdomain, status, subscription_plan, max_users, max_projects, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(tenant.id.as_uuid())
        .bind(&tenant.name)
        .bind(&tenant.subdomain)
        .bind(tenant.status.as_str())
        .bind(tenant.subscription_plan.as_str())
        .bind(tenant.max_users)
        .bind(tenant.max_projects)
        .bind(tenant.created_at)
        .bind(tenant.updated_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            rollback(tx).await?;
            return Err(if is_unique_violation(&e) {
                StoreError::Conflict(SUBDOMAIN_TAKEN.to_string())
            } else {
                map_sqlx_error("insert_tenant", e)
            });
        }

        insert_user_row(&mut tx, &admin).await?;
        commit(tx).await?;
        Ok((tenant, admin))
    }

    async fn get_tenant(&self, id: TenantId) -> Result<Option<Tenant>, StoreError> {
        let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_tenant", e))?;
        row.as_ref()
            .map(tenant_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_tenant", e))
    }

    async fn get_tenant_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, StoreError> {
        let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE subdomain = $1");
        let row = sqlx::query(&sql)
            .bind(subdomain)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_tenant_by_subdomain", e))?;
        row.as_ref()
            .map(tenant_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_tenant", e))
    }

    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.id), err)]
    async fn update_tenant(&self, tenant: &Tenant) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE tenants
            SET name = $2, status = $3, subscription_plan = $4, max_users = $5, max_projects = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(tenant.id.as_uuid())
        .bind(&tenant.name)
        .bind(tenant.status.as_str())
        .bind(tenant.subscription_plan.as_str())
        .bind(tenant.max_users)
        .bind(tenant.max_projects)
        .bind(tenant.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_tenant", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Tenant"));
        }
        Ok(())
    }

    async fn list_tenants(&self, filter: &TenantFilter, page: PageRequest) -> Result<Page<TenantSummary>, StoreError> {
        let status = filter.status.map(|s| s.as_str());
        let plan = filter.plan.map(|p| p.as_str());
        let search = like_pattern(&filter.search);
        const WHERE: &str = r#"
            WHERE ($1::text IS NULL OR t.status = $1)
                AND ($2::text IS NULL OR t.subscription_plan = $2)
                AND ($3::text IS NULL OR t.name ILIKE $3 ESCAPE '\' OR t.subdomain ILIKE $3 ESCAPE '\')
        "#;

        let count_sql = format!("SELECT COUNT(*) AS total FROM tenants t {WHERE}");
        let total: i64 = sqlx::query(&count_sql)
            .bind(status)
            .bind(plan)
            .bind(search.as_deref())
            .fetch_one(&*self.pool)
            .await
            .and_then(|r| r.try_get("total"))
            .map_err(|e| map_sqlx_error("count_tenants", e))?;

        let sql = format!(
            r#"
            SELECT t.*,
                (SELECT COUNT(*) FROM users u WHERE u.tenant_id = t.id) AS user_count,
                (SELECT COUNT(*) FROM projects p WHERE p.tenant_id = t.id) AS project_count
            FROM tenants t
            {WHERE}
            ORDER BY t.created_at DESC, t.id DESC
            LIMIT $4 OFFSET $5
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(status)
            .bind(plan)
            .bind(search.as_deref())
            .bind(i64::from(page.limit))
            .bind(page.offset() as i64)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_tenants", e))?;

        let items = rows
            .iter()
            .map(|row| {
                Ok(TenantSummary {
                    tenant: tenant_from_row(row)?,
                    user_count: row.try_get("user_count")?,
                    project_count: row.try_get("project_count")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| map_sqlx_error("decode_tenant", e))?;
        Ok(to_page(items, page, total))
    }

    async fn tenant_stats(&self, id: TenantId) -> Result<TenantStats, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users WHERE tenant_id = $1) AS total_users,
                (SELECT COUNT(*) FROM projects WHERE tenant_id = $1) AS total_projects,
                (SELECT COUNT(*) FROM tasks WHERE tenant_id = $1) AS total_tasks
            "#,
        )
        .bind(id.as_uuid())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("tenant_stats", e))?;

        let decode = |row: &PgRow| -> Result<TenantStats, sqlx::Error> {
            Ok(TenantStats {
                total_users: row.try_get("total_users")?,
                total_projects: row.try_get("total_projects")?,
                total_tasks: row.try_get("total_tasks")?,
            })
        };
        decode(&row).map_err(|e| map_sqlx_error("tenant_stats", e))
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn insert_user_within_quota(&self, user: User) -> Result<User, StoreError> {
        let tenant_id = user
            .tenant_id
            .ok_or_else(|| StoreError::InvalidReference("tenant user without tenant".to_string()))?;

        let mut tx = self.begin().await?;
        let Some(max_users) = lock_tenant_quota(&mut tx, tenant_id, "max_users").await? else {
            rollback(tx).await?;
            return Err(StoreError::NotFound("Tenant"));
        };
        if count_in_tenant(&mut tx, "users", tenant_id).await? >= i64::from(max_users) {
            rollback(tx).await?;
            return Err(StoreError::QuotaExceeded(USER_LIMIT.to_string()));
        }
        insert_user_row(&mut tx, &user).await?;
        commit(tx).await?;
        Ok(user)
    }

    async fn insert_super_admin(&self, user: User) -> Result<User, StoreError> {
        if user.tenant_id.is_some() {
            return Err(StoreError::InvalidReference("super admin cannot belong to a tenant".to_string()));
        }
        let mut tx = self.begin().await?;
        insert_user_row(&mut tx, &user).await?;
        commit(tx).await?;
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;
        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_user", e))
    }

    async fn find_user_by_email(&self, tenant_id: Option<TenantId>, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND tenant_id IS NOT DISTINCT FROM $2"
        );
        let row = sqlx::query(&sql)
            .bind(email)
            .bind(tenant_id.map(Uuid::from))
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_user", e))
    }

    async fn list_users(&self, tenant_id: TenantId, filter: &UserFilter, page: PageRequest) -> Result<Page<User>, StoreError> {
        let role = filter.role.map(|r| r.as_str());
        let search = like_pattern(&filter.search);
        const WHERE: &str = r#"
            WHERE tenant_id = $1
                AND ($2::text IS NULL OR role = $2)
                AND ($3::text IS NULL OR email ILIKE $3 ESCAPE '\' OR full_name ILIKE $3 ESCAPE '\')
        "#;

        let count_sql = format!("SELECT COUNT(*) AS total FROM users {WHERE}");
        let total: i64 = sqlx::query(&count_sql)
            .bind(tenant_id.as_uuid())
            .bind(role)
            .bind(search.as_deref())
            .fetch_one(&*self.pool)
            .await
            .and_then(|r| r.try_get("total"))
            .map_err(|e| map_sqlx_error("count_users", e))?;

        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users {WHERE} ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        );
        let rows = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(role)
            .bind(search.as_deref())
            .bind(i64::from(page.limit))
            .bind(page.offset() as i64)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;

        let items = rows
            .iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_user", e))?;
        Ok(to_page(items, page, total))
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users SET full_name = $2, role = $3, is_active = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(user.id.as_uuid())
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("User"));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn delete_user(&self, id: UserId) -> Result<(), StoreError> {
        let mut tx = self.begin().await?;
        sqlx::query("UPDATE tasks SET assigned_to = NULL WHERE assigned_to = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("clear_assignments", e))?;
        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        if deleted.rows_affected() == 0 {
            rollback(tx).await?;
            return Err(StoreError::NotFound("User"));
        }
        commit(tx).await
    }

    #[instrument(skip(self, project), fields(project_id = %project.id, tenant_id = %project.tenant_id), err)]
    async fn insert_project_within_quota(&self, project: Project) -> Result<Project, StoreError> {
        let mut tx = self.begin().await?;
        let Some(max_projects) = lock_tenant_quota(&mut tx, project.tenant_id, "max_projects").await? else {
            rollback(tx).await?;
            return Err(StoreError::NotFound("Tenant"));
        };
        if count_in_tenant(&mut tx, "projects", project.tenant_id).await? >= i64::from(max_projects) {
            rollback(tx).await?;
            return Err(StoreError::QuotaExceeded(PROJECT_LIMIT.to_string()));
        }

        sqlx::query(
            r#"
            INSERT INTO projects (id, tenant_id, name, description, status, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(project.id.as_uuid())
        .bind(project.tenant_id.as_uuid())
        .bind(&project.name)
        .bind(project.description.as_deref())
        .bind(project.status.as_str())
        .bind(project.created_by.as_uuid())
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_project", e))?;

        commit(tx).await?;
        Ok(project)
    }

    async fn get_project(&self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_project", e))?;
        row.as_ref()
            .map(project_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_project", e))
    }

    async fn list_projects(
        &self,
        tenant_id: TenantId,
        filter: &ProjectFilter,
        page: PageRequest,
    ) -> Result<Page<ProjectSummary>, StoreError> {
        let status = filter.status.map(|s| s.as_str());
        let search = like_pattern(&filter.search);
        const WHERE: &str = r#"
            WHERE p.tenant_id = $1
                AND ($2::text IS NULL OR p.status = $2)
                AND ($3::text IS NULL OR p.name ILIKE $3 ESCAPE '\' OR p.description ILIKE $3 ESCAPE '\')
        "#;

        let count_sql = format!("SELECT COUNT(*) AS total FROM projects p {WHERE}");
        let total: i64 = sqlx::query(&count_sql)
            .bind(tenant_id.as_uuid())
            .bind(status)
            .bind(search.as_deref())
            .fetch_one(&*self.pool)
            .await
            .and_then(|r| r.try_get("total"))
            .map_err(|e| map_sqlx_error("count_projects", e))?;

        let sql = format!(
            r#"
            SELECT p.*,
                u.full_name AS creator_name,
                (SELECT COUNT(*) FROM tasks t WHERE t.project_id = p.id) AS task_count,
                (SELECT COUNT(*) FROM tasks t WHERE t.project_id = p.id AND t.status = 'completed') AS completed_task_count
            FROM projects p
            LEFT JOIN users u ON u.id = p.created_by
            {WHERE}
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT $4 OFFSET $5
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(status)
            .bind(search.as_deref())
            .bind(i64::from(page.limit))
            .bind(page.offset() as i64)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_projects", e))?;

        let items = rows
            .iter()
            .map(|row| {
                Ok(ProjectSummary {
                    project: project_from_row(row)?,
                    creator_name: row.try_get("creator_name")?,
                    task_count: row.try_get("task_count")?,
                    completed_task_count: row.try_get("completed_task_count")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| map_sqlx_error("decode_project", e))?;
        Ok(to_page(items, page, total))
    }

    #[instrument(skip(self, project), fields(project_id = %project.id), err)]
    async fn update_project(&self, project: &Project) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE projects SET name = $2, description = $3, status = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(project.id.as_uuid())
        .bind(&project.name)
        .bind(project.description.as_deref())
        .bind(project.status.as_str())
        .bind(project.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_project", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Project"));
        }
        Ok(())
    }

    /// Tasks go with the project through `ON DELETE CASCADE`.
    #[instrument(skip(self), err)]
    async fn delete_project(&self, id: ProjectId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_project", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Project"));
        }
        Ok(())
    }

    #[instrument(skip(self, task), fields(task_id = %task.id, project_id = %task.project_id), err)]
    async fn insert_task(&self, task: Task) -> Result<Task, StoreError> {
        let mut tx = self.begin().await?;

        let project_tenant: Option<Uuid> = sqlx::query("SELECT tenant_id FROM projects WHERE id = $1 FOR SHARE")
            .bind(task.project_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .and_then(|r| r.map(|r| r.try_get("tenant_id")).transpose())
            .map_err(|e| map_sqlx_error("lock_project", e))?;
        match project_tenant {
            None => {
                rollback(tx).await?;
                return Err(StoreError::NotFound("Project"));
            }
            Some(t) if t != *task.tenant_id.as_uuid() => {
                rollback(tx).await?;
                return Err(StoreError::InvalidReference("task tenant must match its project".to_string()));
            }
            Some(_) => {}
        }

        if let Err(e) = check_assignee(&mut tx, task.tenant_id, task.assigned_to).await {
            rollback(tx).await?;
            return Err(e);
        }

        sqlx::query(
            r#"
            INSERT INTO tasks (id, project_id, tenant_id, title, description, status, priority, assigned_to, due_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(task.id.as_uuid())
        .bind(task.project_id.as_uuid())
        .bind(task.tenant_id.as_uuid())
        .bind(&task.title)
        .bind(task.description.as_deref())
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.assigned_to.map(Uuid::from))
        .bind(task.due_date)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_task", e))?;

        commit(tx).await?;
        Ok(task)
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_task", e))?;
        row.as_ref()
            .map(task_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_task", e))
    }

    async fn list_tasks(&self, project_id: ProjectId, filter: &TaskFilter) -> Result<Vec<TaskView>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT t.*, u.full_name AS assignee_name
            FROM tasks t
            LEFT JOIN users u ON u.id = t.assigned_to
            WHERE t.project_id = $1
                AND ($2::text IS NULL OR t.status = $2)
                AND ($3::uuid IS NULL OR t.assigned_to = $3)
                AND ($4::text IS NULL OR t.priority = $4)
                AND ($5::text IS NULL OR t.title ILIKE $5 ESCAPE '\' OR t.description ILIKE $5 ESCAPE '\')
            ORDER BY
                CASE t.priority WHEN 'high' THEN 1 WHEN 'medium' THEN 2 ELSE 3 END,
                t.due_date ASC NULLS LAST,
                t.created_at ASC
            "#,
        )
        .bind(project_id.as_uuid())
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.assigned_to.map(Uuid::from))
        .bind(filter.priority.map(|p| p.as_str()))
        .bind(like_pattern(&filter.search))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_tasks", e))?;

        rows.iter()
            .map(|row| {
                Ok(TaskView {
                    task: task_from_row(row)?,
                    assignee_name: row.try_get("assignee_name")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| map_sqlx_error("decode_task", e))
    }

    #[instrument(skip(self, task), fields(task_id = %task.id), err)]
    async fn update_task(&self, task: &Task) -> Result<(), StoreError> {
        let mut tx = self.begin().await?;
        if let Err(e) = check_assignee(&mut tx, task.tenant_id, task.assigned_to).await {
            rollback(tx).await?;
            return Err(e);
        }

        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET title = $2, description = $3, status = $4, priority = $5, assigned_to = $6, due_date = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(task.id.as_uuid())
        .bind(&task.title)
        .bind(task.description.as_deref())
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.assigned_to.map(Uuid::from))
        .bind(task.due_date)
        .bind(task.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_task", e))?;

        if result.rows_affected() == 0 {
            rollback(tx).await?;
            return Err(StoreError::NotFound("Task"));
        }
        commit(tx).await
    }
}

#[async_trait::async_trait]
impl AuditSink for PostgresStore {
    async fn record(&self, entry: AuditEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, tenant_id, user_id, action, entity_type, entity_id, ip_address, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.tenant_id.map(Uuid::from))
        .bind(entry.user_id.map(Uuid::from))
        .bind(entry.action.as_str())
        .bind(entry.entity_type)
        .bind(entry.entity_id)
        .bind(entry.ip.as_deref())
        .bind(entry.created_at)
        .execute(&*self.pool)
        .await
        .map(|_| ())
        .map_err(|e| map_sqlx_error("insert_audit_log", e))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

async fn insert_user_row(tx: &mut Transaction<'_, Postgres>, user: &User) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO users (id, tenant_id, email, password_hash, full_name, role, is_active, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(user.id.as_uuid())
    .bind(user.tenant_id.map(Uuid::from))
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.full_name)
    .bind(user.role.as_str())
    .bind(user.is_active)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(&mut **tx)
    .await
    .map(|_| ())
    .map_err(|e| {
        if is_unique_violation(&e) {
            StoreError::Conflict(EMAIL_TAKEN.to_string())
        } else {
            map_sqlx_error("insert_user", e)
        }
    })
}

fn decode_err(err: DomainError) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

fn tenant_from_row(row: &PgRow) -> Result<Tenant, sqlx::Error> {
    Ok(Tenant {
        id: TenantId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        subdomain: row.try_get("subdomain")?,
        status: TenantStatus::parse(row.try_get("status")?).map_err(decode_err)?,
        subscription_plan: SubscriptionPlan::parse(row.try_get("subscription_plan")?)
            .map_err(decode_err)?,
        max_users: row.try_get("max_users")?,
        max_projects: row.try_get("max_projects")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    let tenant_id: Option<Uuid> = row.try_get("tenant_id")?;
    let role: &str = row.try_get("role")?;
    Ok(User {
        id: UserId::from_uuid(row.try_get("id")?),
        tenant_id: tenant_id.map(TenantId::from_uuid),
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        full_name: row.try_get("full_name")?,
        role: role.parse::<Role>().map_err(decode_err)?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn project_from_row(row: &PgRow) -> Result<Project, sqlx::Error> {
    Ok(Project {
        id: ProjectId::from_uuid(row.try_get("id")?),
        tenant_id: TenantId::from_uuid(row.try_get("tenant_id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        status: ProjectStatus::parse(row.try_get("status")?).map_err(decode_err)?,
        created_by: UserId::from_uuid(row.try_get("created_by")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn task_from_row(row: &PgRow) -> Result<Task, sqlx::Error> {
    let assigned_to: Option<Uuid> = row.try_get("assigned_to")?;
    Ok(Task {
        id: TaskId::from_uuid(row.try_get("id")?),
        project_id: ProjectId::from_uuid(row.try_get("project_id")?),
        tenant_id: TenantId::from_uuid(row.try_get("tenant_id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status: TaskStatus::parse(row.try_get("status")?).map_err(decode_err)?,
        priority: TaskPriority::parse(row.try_get("priority")?).map_err(decode_err)?,
        assigned_to: assigned_to.map(UserId::from_uuid),
        due_date: row.try_get("due_date")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Error mapping
// ─────────────────────────────────────────────────────────────────────────────

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") => StoreError::InvalidReference(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        let pattern = |q: &str| like_pattern(&Some(q.to_string())).unwrap();
        assert_eq!(like_pattern(&None), None);
        assert_eq!(pattern("  acme "), "%acme%");
        assert_eq!(pattern("50%_off"), r"%50\%\_off%");
        assert_eq!(pattern(r"c:\tmp"), r"%c:\\tmp%");
    }
}

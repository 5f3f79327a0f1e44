//! Postgres schema, applied idempotently at startup.

pub(super) const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS tenants (
        id UUID PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        subdomain VARCHAR(63) NOT NULL UNIQUE,
        status TEXT NOT NULL CHECK (status IN ('active', 'suspended', 'trial')),
        subscription_plan TEXT NOT NULL CHECK (subscription_plan IN ('free', 'pro', 'enterprise')),
        max_users INTEGER NOT NULL CHECK (max_users >= 1),
        max_projects INTEGER NOT NULL CHECK (max_projects >= 1),
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        tenant_id UUID REFERENCES tenants(id) ON DELETE CASCADE,
        email VARCHAR(255) NOT NULL,
        password_hash TEXT NOT NULL,
        full_name VARCHAR(255) NOT NULL,
        role TEXT NOT NULL CHECK (role IN ('super_admin', 'tenant_admin', 'user')),
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        CHECK ((role = 'super_admin') = (tenant_id IS NULL))
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS users_tenant_email_key ON users (tenant_id, email) WHERE tenant_id IS NOT NULL",
    "CREATE UNIQUE INDEX IF NOT EXISTS users_super_admin_email_key ON users (email) WHERE tenant_id IS NULL",
    r#"
    CREATE TABLE IF NOT EXISTS projects (
        id UUID PRIMARY KEY,
        tenant_id UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
        name VARCHAR(255) NOT NULL,
        description TEXT,
        status TEXT NOT NULL CHECK (status IN ('active', 'completed', 'archived')),
        created_by UUID NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS projects_tenant_idx ON projects (tenant_id, created_at DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS tasks (
        id UUID PRIMARY KEY,
        project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        tenant_id UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
        title VARCHAR(255) NOT NULL,
        description TEXT,
        status TEXT NOT NULL CHECK (status IN ('todo', 'in_progress', 'completed')),
        priority TEXT NOT NULL CHECK (priority IN ('low', 'medium', 'high')),
        assigned_to UUID REFERENCES users(id) ON DELETE SET NULL,
        due_date DATE,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS tasks_project_idx ON tasks (project_id)",
    r#"
    CREATE TABLE IF NOT EXISTS audit_logs (
        id UUID PRIMARY KEY,
        tenant_id UUID,
        user_id UUID,
        action TEXT NOT NULL,
        entity_type TEXT NOT NULL,
        entity_id UUID,
        ip_address TEXT,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS audit_logs_tenant_idx ON audit_logs (tenant_id, created_at DESC)",
];

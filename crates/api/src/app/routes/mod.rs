use axum::{
    Router,
    routing::{get, patch, post, put},
};

pub mod auth;
pub mod projects;
pub mod system;
pub mod tasks;
pub mod tenants;
pub mod users;

/// Endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/auth/register-tenant", post(auth::register_tenant))
        .route("/auth/login", post(auth::login))
}

/// Endpoints behind the auth middleware.
pub fn protected_router() -> Router {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        .route("/tenants", get(tenants::list_tenants))
        .route("/tenants/:id", get(tenants::get_tenant).put(tenants::update_tenant))
        .route("/tenants/:id/users", post(users::create_user).get(users::list_users))
        .route("/users/:id", put(users::update_user).delete(users::delete_user))
        .route("/projects", post(projects::create_project).get(projects::list_projects))
        .route(
            "/projects/:id",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/projects/:id/tasks", post(tasks::create_task).get(tasks::list_tasks))
        .route("/tasks/:id/status", patch(tasks::update_task_status))
        .route("/tasks/:id", put(tasks::update_task))
}

/// Parse a path id, reporting failures as 400.
pub(crate) fn parse_id<T>(raw: &str) -> Result<T, super::errors::ApiError>
where
    T: std::str::FromStr<Err = tenantdesk_core::DomainError>,
{
    raw.parse().map_err(super::errors::ApiError::from)
}

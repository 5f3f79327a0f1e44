//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: query/response DTOs and JSON mapping helpers
//! - `extract.rs`: extractors with JSON rejections
//! - `errors.rs`: consistent `{success, message, data}` responses

use axum::{Extension, Router};
use tower::ServiceBuilder;

use tenantdesk_infra::Services;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod extract;
pub mod routes;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(services: Services, proxy: middleware::ProxyTrust) -> Router {
    let auth_state = middleware::AuthState {
        tokens: services.auth.tokens().clone(),
        proxy,
    };

    // Protected routes: require a valid bearer token.
    let protected = routes::protected_router().route_layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .merge(routes::public_router())
        .merge(protected)
        .fallback(|| async {
            errors::json_error(axum::http::StatusCode::NOT_FOUND, "Route not found")
        })
        .layer(
            ServiceBuilder::new()
                .layer(Extension(services))
                .layer(Extension(proxy)),
        )
}

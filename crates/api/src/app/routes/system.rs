use axum::{Extension, Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

use tenantdesk_infra::Services;

/// Liveness plus a store round trip.
pub async fn health(Extension(services): Extension<Services>) -> axum::response::Response {
    match services.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "database": "connected" })),
        )
            .into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "database": "disconnected" })),
            )
                .into_response()
        }
    }
}

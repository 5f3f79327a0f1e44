//! Consistent JSON responses.
//!
//! Every body is `{success, message?, data?}`. Failures come from
//! [`DomainError`] through [`ApiError`]; internal detail is logged, never
//! returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;

use tenantdesk_core::DomainError;

#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(value: DomainError) -> Self {
        Self(value)
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(DomainError::Validation(message.into()))
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match &self.0 {
            DomainError::Validation(msg)
            | DomainError::InvalidId(msg)
            | DomainError::InvalidReference(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            DomainError::Unauthorized => (StatusCode::UNAUTHORIZED, "Authentication required".to_string()),
            DomainError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()),
            DomainError::Forbidden(reason) => (StatusCode::FORBIDDEN, reason.clone()),
            DomainError::NotFound(entity) => (StatusCode::NOT_FOUND, format!("{entity} not found")),
            DomainError::Conflict(msg) | DomainError::QuotaExceeded(msg) => (StatusCode::CONFLICT, msg.clone()),
            DomainError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        json_error(status, message)
    }
}

pub type ApiResult = Result<Response, ApiError>;

pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[derive(Serialize)]
struct Envelope<'a, T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

pub fn ok<T: Serialize>(data: T) -> ApiResult {
    Ok(respond(StatusCode::OK, None, Some(data)))
}

pub fn ok_with_message<T: Serialize>(message: &str, data: T) -> ApiResult {
    Ok(respond(StatusCode::OK, Some(message), Some(data)))
}

pub fn created<T: Serialize>(message: &str, data: T) -> ApiResult {
    Ok(respond(StatusCode::CREATED, Some(message), Some(data)))
}

/// Message-only success (logout, deletes).
pub fn done(message: &str) -> ApiResult {
    Ok(respond::<()>(StatusCode::OK, Some(message), None))
}

fn respond<T: Serialize>(status: StatusCode, message: Option<&str>, data: Option<T>) -> Response {
    let body = Envelope {
        success: true,
        message,
        data,
    };
    (status, axum::Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: DomainError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn maps_domain_errors_to_status_codes() {
        assert_eq!(status_of(DomainError::validation("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(DomainError::invalid_reference("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(DomainError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(DomainError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(DomainError::forbidden("x")), StatusCode::FORBIDDEN);
        assert_eq!(status_of(DomainError::not_found("Project")), StatusCode::NOT_FOUND);
        assert_eq!(status_of(DomainError::conflict("x")), StatusCode::CONFLICT);
        assert_eq!(status_of(DomainError::quota_exceeded("x")), StatusCode::CONFLICT);
        assert_eq!(status_of(DomainError::internal("db down")), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let (_, message) = ApiError(DomainError::internal("password=hunter2")).status_and_message();
        assert_eq!(message, "Internal server error");
    }
}

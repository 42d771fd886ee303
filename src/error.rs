use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Unified error type for the authbroker service.
///
/// `NotFound`, `AlreadyExists`, `ServiceUnsupported`, `InvalidStatus` and the
/// boundary-only `BadRequest`/`Validation` map to specific status codes. The
/// remaining variants are internal failures: their detail is logged and never
/// rendered to the caller.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    // ── Resource Errors ─────────────────────────────────────────────────
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("service {0} is not supported")]
    ServiceUnsupported(String),

    #[error("status {0} is unavailable")]
    InvalidStatus(String),

    // ── Request Errors ──────────────────────────────────────────────────
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),

    // ── Internal ────────────────────────────────────────────────────────
    #[error("OAuth provider error: {0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// True for failures that surface as a generic internal error.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::Provider(_) | AuthError::Database(_) | AuthError::Internal(_)
        )
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!("Database error: {e}");
        AuthError::Database(e.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AuthError::AlreadyExists(_) => (StatusCode::CONFLICT, "already_exists"),
            AuthError::ServiceUnsupported(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "service_unsupported")
            }
            AuthError::InvalidStatus(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_status"),
            AuthError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AuthError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_failed"),
            AuthError::Provider(_) | AuthError::Database(_) | AuthError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let message = if self.is_internal() {
            tracing::error!("{self}");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = match self {
            AuthError::Validation(errors) => json!({
                "error": {
                    "code": code,
                    "message": message,
                    "errors": errors,
                }
            }),
            _ => json!({
                "error": {
                    "code": code,
                    "message": message,
                }
            }),
        };

        (status, axum::Json(body)).into_response()
    }
}

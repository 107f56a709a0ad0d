//! Error handling for the API server.
//!
//! A unified error type that maps to HTTP responses. Handlers return
//! `Result<T, ApiError>`; service errors convert via `From`, so a `?` on a
//! service call produces the right status code.
//!
//! # Status mapping
//!
//! | Service error                                        | Status |
//! |------------------------------------------------------|--------|
//! | `InvalidCredentials`, `InvalidToken`                 | 401    |
//! | `AccessDenied`, `InsufficientPermission`             | 403    |
//! | `Validation`, `InvalidRole`, `AlreadyClosed`,        | 400    |
//! | `AlreadyCompleted`                                   |        |
//! | `AlreadyExists`, `AlreadyMember`                     | 409    |
//! | `Token`, `Password`, `Store`                         | 500    |
//!
//! Internal errors are logged server-side; the response body never carries
//! their detail.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dealflow_shared::services::ServiceError;
use serde::{Deserialize, Serialize};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unauthorized (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::Internal(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });
        (status, body).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidCredentials | ServiceError::InvalidToken(_) => {
                ApiError::Unauthorized(err.to_string())
            }
            ServiceError::AccessDenied | ServiceError::InsufficientPermission => {
                ApiError::Forbidden(err.to_string())
            }
            ServiceError::Validation(_)
            | ServiceError::InvalidRole(_)
            | ServiceError::AlreadyClosed
            | ServiceError::AlreadyCompleted => ApiError::BadRequest(err.to_string()),
            ServiceError::AlreadyExists | ServiceError::AlreadyMember => {
                ApiError::Conflict(err.to_string())
            }
            ServiceError::Token(_) | ServiceError::Password(_) | ServiceError::Store(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

/// Request body validation failures map to 400 with the failing fields
/// named.
impl From<validator::ValidationErrors> for ApiError {
    fn from(errs: validator::ValidationErrors) -> Self {
        let mut fields: Vec<&str> = errs.field_errors().keys().copied().collect();
        fields.sort_unstable();
        ApiError::BadRequest(format!("validation failed: {}", fields.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("Contact not found".to_string());
        assert_eq!(err.to_string(), "Not found: Contact not found");
    }

    #[test]
    fn test_service_error_mapping() {
        assert!(matches!(
            ApiError::from(ServiceError::AccessDenied),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(
            ApiError::from(ServiceError::InsufficientPermission),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(
            ApiError::from(ServiceError::InvalidCredentials),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            ApiError::from(ServiceError::AlreadyClosed),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(ServiceError::AlreadyMember),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(ServiceError::InvalidRole("x".into())),
            ApiError::BadRequest(_)
        ));
    }
}

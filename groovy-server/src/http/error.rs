//! API error type with IntoResponse
//!
//! Errors become `{"error": <code>, "message": <text>}` with a matching status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::db::repos::DbError;
use crate::models::ValidationError;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Validation failed (400)
    Validation(ValidationError),

    /// Missing or bad acting-user identity, or wrong credentials (401)
    Unauthorized { reason: String },

    /// Acting user may not do this (403)
    Forbidden { reason: String },

    /// Resource not found (404)
    NotFound { resource: &'static str, id: String },

    /// Duplicate or already-resolved record (409)
    Conflict { reason: String },

    /// Database error (500, logged)
    Database(DbError),
}

impl ApiError {
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Validation(e) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "validation_error",
                    "message": e.to_string()
                }),
            ),
            Self::Unauthorized { reason } => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "error": "unauthorized",
                    "message": reason
                }),
            ),
            Self::Forbidden { reason } => (
                StatusCode::FORBIDDEN,
                json!({
                    "error": "forbidden",
                    "message": reason
                }),
            ),
            Self::NotFound { resource, id } => (
                StatusCode::NOT_FOUND,
                json!({
                    "error": "not_found",
                    "message": format!("{} '{}' not found", resource, id)
                }),
            ),
            Self::Conflict { reason } => (
                StatusCode::CONFLICT,
                json!({
                    "error": "conflict",
                    "message": reason
                }),
            ),
            Self::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "internal_error",
                        "message": "an internal error occurred"
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { resource, id } => Self::NotFound { resource, id },
            DbError::Conflict { reason } | DbError::InvalidState { reason } => {
                Self::Conflict { reason }
            }
            DbError::Forbidden { reason } => Self::Forbidden { reason },
            DbError::Validation(e) => Self::Validation(e),
            DbError::Sqlx(_) => Self::Database(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn validation_error_is_400() {
        let err = ApiError::Validation(ValidationError::Empty { field: "title" });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unauthorized_is_401() {
        let response = ApiError::unauthorized("missing X-User-Id header").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn db_errors_map_to_status() {
        let cases = [
            (DbError::not_found("user", 3), StatusCode::NOT_FOUND),
            (DbError::conflict("already friends"), StatusCode::CONFLICT),
            (
                DbError::InvalidState {
                    reason: "friend request is already ACCEPTED".into(),
                },
                StatusCode::CONFLICT,
            ),
            (DbError::forbidden("staff only"), StatusCode::FORBIDDEN),
            (
                DbError::Sqlx(sqlx::Error::RowNotFound),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[tokio::test]
    async fn body_has_code_and_message() {
        let response = ApiError::from(DbError::not_found("group", 12)).into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "not_found");
        assert_eq!(body["message"], "group '12' not found");
    }

    #[tokio::test]
    async fn database_error_hides_details() {
        let response = ApiError::from(DbError::Sqlx(sqlx::Error::PoolTimedOut)).into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "an internal error occurred");
    }
}

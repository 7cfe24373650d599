//! Notification endpoints for the acting user

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Serialize;

use crate::db::repos::{Notification, NotificationRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{ActingUser, ValidPath, ValidQuery};
use crate::http::server::AppState;
use crate::models::{Paginated, Pagination, PaginationParams};

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: i64,
    pub notification_type: String,
    pub content: String,
    pub redirect_url: Option<String>,
    pub created_at: String,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            notification_type: n.notification_type,
            content: n.content,
            redirect_url: n.redirect_url,
            created_at: n.created_at.to_rfc3339(),
        }
    }
}

/// GET /notifications - newest first
async fn list(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<Paginated<NotificationResponse>>, ApiError> {
    let notifications = NotificationRepo::new(&state.pool)
        .list_for_user(actor, Pagination::from(params))
        .await?;
    Ok(Json(notifications.map(NotificationResponse::from)))
}

/// DELETE /notifications/{id}
async fn remove(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, ApiError> {
    NotificationRepo::new(&state.pool).delete(id, actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notifications", get(list))
        .route("/notifications/{id}", delete(remove))
}

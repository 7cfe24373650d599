//! User suggestion endpoints

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::repos::{SuggestionRecord, SuggestionRepo, UserRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{ActingUser, ValidJson, ValidQuery};
use crate::http::server::AppState;
use crate::models::{Paginated, Pagination, PaginationParams, Suggestion};

#[derive(Debug, Deserialize)]
pub struct CreateSuggestionRequest {
    pub suggestion_type: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct SuggestionResponse {
    pub id: i64,
    pub user: Option<i64>,
    pub suggestion_type: String,
    pub content: String,
    pub created_at: String,
}

impl From<SuggestionRecord> for SuggestionResponse {
    fn from(s: SuggestionRecord) -> Self {
        Self {
            id: s.id,
            user: s.user_id,
            suggestion_type: s.suggestion_type,
            content: s.content,
            created_at: s.created_at.to_rfc3339(),
        }
    }
}

/// POST /suggestions
async fn create(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidJson(req): ValidJson<CreateSuggestionRequest>,
) -> Result<(StatusCode, Json<SuggestionResponse>), ApiError> {
    let suggestion = Suggestion::new(&req.suggestion_type, &req.content)?;
    let record = SuggestionRepo::new(&state.pool)
        .create(actor, suggestion)
        .await?;
    Ok((StatusCode::CREATED, Json(SuggestionResponse::from(record))))
}

/// GET /suggestions - staff only
async fn list(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<Paginated<SuggestionResponse>>, ApiError> {
    UserRepo::new(&state.pool).require_staff(actor).await?;
    let records = SuggestionRepo::new(&state.pool)
        .list(Pagination::from(params))
        .await?;
    Ok(Json(records.map(SuggestionResponse::from)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/suggestions", get(list).post(create))
}

//! University endpoints (read-only)

use std::sync::Arc;

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::db::repos::{University, UniversityRepo};
use crate::http::error::ApiError;
use crate::http::extractors::ValidPath;
use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct UniversityResponse {
    pub id: i64,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<University> for UniversityResponse {
    fn from(u: University) -> Self {
        Self {
            id: u.id,
            name: u.name,
            created_at: u.created_at.to_rfc3339(),
            updated_at: u.updated_at.to_rfc3339(),
        }
    }
}

/// GET /university
async fn list_universities(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UniversityResponse>>, ApiError> {
    let universities = UniversityRepo::new(&state.pool).list().await?;
    Ok(Json(
        universities
            .into_iter()
            .map(UniversityResponse::from)
            .collect(),
    ))
}

/// GET /university/{id}
async fn get_university(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<UniversityResponse>, ApiError> {
    let university = UniversityRepo::new(&state.pool).get(id).await?;
    Ok(Json(UniversityResponse::from(university)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/university", get(list_universities))
        .route("/university/{id}", get(get_university))
}

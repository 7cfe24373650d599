//! University manual verification endpoints
//!
//! Students submit evidence; staff review it.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::StatusFilter;
use crate::db::repos::{UserRepo, Verification, VerificationRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{ActingUser, ValidJson, ValidPath, ValidQuery};
use crate::http::server::AppState;
use crate::models::university::verification_img_url;
use crate::models::{Decision, Paginated, Pagination, PaginationParams, VerificationMethod};

#[derive(Debug, Deserialize)]
pub struct SubmitVerificationRequest {
    pub university: i64,
    pub verification_method: String,
    #[serde(default)]
    pub verification_img_url: String,
}

#[derive(Debug, Serialize)]
pub struct VerificationResponse {
    pub id: i64,
    pub user: i64,
    pub university: i64,
    pub verification_method: String,
    pub verification_img_url: String,
    pub verification_status: String,
    pub status_changed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Verification> for VerificationResponse {
    fn from(v: Verification) -> Self {
        Self {
            id: v.id,
            user: v.user_id,
            university: v.university_id,
            verification_method: v.verification_method,
            verification_img_url: v.verification_img_url,
            verification_status: v.verification_status,
            status_changed_at: v.status_changed_at.map(|t| t.to_rfc3339()),
            created_at: v.created_at.to_rfc3339(),
            updated_at: v.updated_at.to_rfc3339(),
        }
    }
}

/// POST /verifications
async fn submit(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidJson(req): ValidJson<SubmitVerificationRequest>,
) -> Result<(StatusCode, Json<VerificationResponse>), ApiError> {
    let method = VerificationMethod::parse(&req.verification_method)?;
    let img_url = verification_img_url(&req.verification_img_url)?;

    let verification = VerificationRepo::new(&state.pool)
        .submit(actor, req.university, method, img_url)
        .await?;
    Ok((StatusCode::CREATED, Json(VerificationResponse::from(verification))))
}

/// GET /verifications?status= - staff only
async fn list(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidQuery(params): ValidQuery<PaginationParams>,
    ValidQuery(filter): ValidQuery<StatusFilter>,
) -> Result<Json<Paginated<VerificationResponse>>, ApiError> {
    let status = filter.parse()?;
    UserRepo::new(&state.pool).require_staff(actor).await?;

    let page = Pagination::from(params);
    let verifications = VerificationRepo::new(&state.pool).list(status, page).await?;
    Ok(Json(verifications.map(VerificationResponse::from)))
}

/// POST /verifications/{id}/{accept|refuse} - staff only
async fn decide(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidPath((id, action)): ValidPath<(i64, String)>,
) -> Result<Json<VerificationResponse>, ApiError> {
    let decision = Decision::parse(&action)?;
    UserRepo::new(&state.pool).require_staff(actor).await?;

    let verification = VerificationRepo::new(&state.pool).decide(id, decision).await?;
    Ok(Json(VerificationResponse::from(verification)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/verifications", get(list).post(submit))
        .route("/verifications/{id}/{action}", post(decide))
}

//! Email/password login
//!
//! Checks credentials and stamps the login timestamps. Issuing tokens is the
//! gateway's job; it forwards the user id in `X-User-Id` afterwards.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use super::users::UserResponse;
use crate::db::repos::UserRepo;
use crate::http::error::ApiError;
use crate::http::extractors::ValidJson;
use crate::http::server::AppState;
use crate::models::Email;

const BAD_CREDENTIALS: &str = "invalid email or password";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let email = Email::new(&req.email)?;
    let repo = UserRepo::new(&state.pool);

    let user = repo
        .find_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::unauthorized(BAD_CREDENTIALS))?;

    let verified = user.password_hash().verify(&req.password);
    let user = repo.record_login(user.id, verified).await?;
    if !verified {
        tracing::info!(user = %user.display(), "login failed");
        return Err(ApiError::unauthorized(BAD_CREDENTIALS));
    }

    tracing::info!(user = %user.display(), "login succeeded");
    Ok(Json(UserResponse::from(user)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/auth/login", post(login))
}

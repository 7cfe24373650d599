//! Group, membership and join request endpoints

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::StatusFilter;
use crate::db::repos::{GroupDetail, GroupRepo, JoinRequest, SimplifiedUser};
use crate::http::error::ApiError;
use crate::http::extractors::{ActingUser, OptionalJson, ValidJson, ValidPath, ValidQuery};
use crate::http::server::AppState;
use crate::models::{ChatContent, Decision, GroupTitle, Paginated, Pagination, PaginationParams};

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub university: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct JoinGroupRequest {
    /// Personal chat sent to the manager; a default greeting is used if absent
    pub message: Option<String>,
}

/// GET /groups
async fn list_groups(
    State(state): State<Arc<AppState>>,
    ActingUser(_): ActingUser,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<Paginated<GroupDetail>>, ApiError> {
    let groups = GroupRepo::new(&state.pool)
        .list(Pagination::from(params))
        .await?;
    Ok(Json(groups))
}

/// POST /groups - the acting user becomes manager
async fn create_group(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidJson(req): ValidJson<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupDetail>), ApiError> {
    let title = GroupTitle::new(&req.title)?;
    let group = GroupRepo::new(&state.pool)
        .create(actor, title, req.description, req.university)
        .await?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// GET /groups/{id}
async fn get_group(
    State(state): State<Arc<AppState>>,
    ActingUser(_): ActingUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<GroupDetail>, ApiError> {
    let group = GroupRepo::new(&state.pool).get(id).await?;
    Ok(Json(group))
}

/// DELETE /groups/{id} - manager only, soft delete
async fn delete_group(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, ApiError> {
    GroupRepo::new(&state.pool).delete(id, actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /groups/{id}/members
async fn list_members(
    State(state): State<Arc<AppState>>,
    ActingUser(_): ActingUser,
    ValidPath(id): ValidPath<i64>,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<Paginated<SimplifiedUser>>, ApiError> {
    let members = GroupRepo::new(&state.pool)
        .members(id, Pagination::from(params))
        .await?;
    Ok(Json(members))
}

/// POST /groups/{id}/leave
async fn leave_group(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, ApiError> {
    GroupRepo::new(&state.pool).leave(id, actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /groups/{id}/join-requests?status= - manager only
async fn list_join_requests(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidPath(id): ValidPath<i64>,
    ValidQuery(params): ValidQuery<PaginationParams>,
    ValidQuery(filter): ValidQuery<StatusFilter>,
) -> Result<Json<Paginated<JoinRequest>>, ApiError> {
    let status = filter.parse()?;
    let requests = GroupRepo::new(&state.pool)
        .list_join_requests(id, actor, status, Pagination::from(params))
        .await?;
    Ok(Json(requests))
}

/// POST /groups/{id}/join-requests - body is optional
async fn request_join(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidPath(id): ValidPath<i64>,
    OptionalJson(req): OptionalJson<JoinGroupRequest>,
) -> Result<(StatusCode, Json<JoinRequest>), ApiError> {
    let message = req.message.as_deref().map(ChatContent::new).transpose()?;
    let request = GroupRepo::new(&state.pool)
        .request_join(id, actor, message)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// POST /join-requests/{id}/{accept|refuse} - manager only
async fn decide_join(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidPath((id, action)): ValidPath<(i64, String)>,
) -> Result<Json<JoinRequest>, ApiError> {
    let decision = Decision::parse(&action)?;
    let request = GroupRepo::new(&state.pool)
        .decide_join(id, actor, decision)
        .await?;
    Ok(Json(request))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/{id}", get(get_group).delete(delete_group))
        .route("/groups/{id}/members", get(list_members))
        .route("/groups/{id}/leave", post(leave_group))
        .route(
            "/groups/{id}/join-requests",
            get(list_join_requests).post(request_join),
        )
        .route("/join-requests/{id}/{action}", post(decide_join))
}

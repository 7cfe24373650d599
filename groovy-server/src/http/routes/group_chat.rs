//! Group chatroom endpoints (members only)

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::db::repos::{GroupChat, GroupChatRepo, GroupChatroomView};
use crate::http::error::ApiError;
use crate::http::extractors::{ActingUser, ValidJson, ValidPath, ValidQuery};
use crate::http::server::AppState;
use crate::models::{ChatContent, Paginated, Pagination, PaginationParams};

#[derive(Debug, Deserialize)]
pub struct PostChatRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct SetNoticeRequest {
    /// `null` clears the pin
    pub pinned_chat: Option<i64>,
}

/// GET /group-chatrooms
async fn list_rooms(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<Paginated<GroupChatroomView>>, ApiError> {
    let rooms = GroupChatRepo::new(&state.pool)
        .rooms_for_user(actor, Pagination::from(params))
        .await?;
    Ok(Json(rooms))
}

/// GET /group-chatrooms/{id}
async fn get_room(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<GroupChatroomView>, ApiError> {
    let room = GroupChatRepo::new(&state.pool).get(id, actor).await?;
    Ok(Json(room))
}

/// GET /group-chatrooms/{id}/chats - oldest first
async fn list_chats(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidPath(id): ValidPath<i64>,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<Paginated<GroupChat>>, ApiError> {
    let chats = GroupChatRepo::new(&state.pool)
        .list_chats(id, actor, Pagination::from(params))
        .await?;
    Ok(Json(chats))
}

/// POST /group-chatrooms/{id}/chats
async fn post_chat(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidPath(id): ValidPath<i64>,
    ValidJson(req): ValidJson<PostChatRequest>,
) -> Result<(StatusCode, Json<GroupChat>), ApiError> {
    let content = ChatContent::new(&req.content)?;
    let chat = GroupChatRepo::new(&state.pool)
        .post(id, actor, content)
        .await?;
    Ok((StatusCode::CREATED, Json(chat)))
}

/// PUT /group-chatrooms/{id}/notice - manager only
async fn set_notice(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidPath(id): ValidPath<i64>,
    ValidJson(req): ValidJson<SetNoticeRequest>,
) -> Result<Json<GroupChatroomView>, ApiError> {
    let room = GroupChatRepo::new(&state.pool)
        .set_notice(id, actor, req.pinned_chat)
        .await?;
    Ok(Json(room))
}

/// DELETE /group-chats/{id} - author only, soft delete
async fn delete_chat(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, ApiError> {
    GroupChatRepo::new(&state.pool).delete_chat(id, actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/group-chatrooms", get(list_rooms))
        .route("/group-chatrooms/{id}", get(get_room))
        .route("/group-chatrooms/{id}/chats", get(list_chats).post(post_chat))
        .route("/group-chatrooms/{id}/notice", put(set_notice))
        .route("/group-chats/{id}", delete(delete_chat))
}

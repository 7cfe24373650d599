//! Personal chatroom endpoints (participants only)

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;

use super::group_chat::PostChatRequest;
use crate::db::repos::{PersonalChat, PersonalChatRepo, PersonalChatroomView};
use crate::http::error::ApiError;
use crate::http::extractors::{ActingUser, ValidJson, ValidPath, ValidQuery};
use crate::http::server::AppState;
use crate::models::{ChatContent, Paginated, Pagination, PaginationParams};

#[derive(Debug, Deserialize)]
pub struct OpenRoomRequest {
    pub receiver: i64,
}

/// GET /personal-chatrooms
async fn list_rooms(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<Paginated<PersonalChatroomView>>, ApiError> {
    let rooms = PersonalChatRepo::new(&state.pool)
        .rooms_for_user(actor, Pagination::from(params))
        .await?;
    Ok(Json(rooms))
}

/// POST /personal-chatrooms - 201 when created, 200 when it already existed
async fn open_room(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidJson(req): ValidJson<OpenRoomRequest>,
) -> Result<(StatusCode, Json<PersonalChatroomView>), ApiError> {
    let (room, created) = PersonalChatRepo::new(&state.pool)
        .open(actor, req.receiver)
        .await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(room)))
}

/// GET /personal-chatrooms/{id}
async fn get_room(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<PersonalChatroomView>, ApiError> {
    let room = PersonalChatRepo::new(&state.pool).get(id, actor).await?;
    Ok(Json(room))
}

/// DELETE /personal-chatrooms/{id} - leave the room
async fn leave_room(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, ApiError> {
    PersonalChatRepo::new(&state.pool).leave(id, actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /personal-chatrooms/{id}/chats - oldest first
async fn list_chats(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidPath(id): ValidPath<i64>,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<Paginated<PersonalChat>>, ApiError> {
    let chats = PersonalChatRepo::new(&state.pool)
        .list_chats(id, actor, Pagination::from(params))
        .await?;
    Ok(Json(chats))
}

/// POST /personal-chatrooms/{id}/chats
async fn post_chat(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidPath(id): ValidPath<i64>,
    ValidJson(req): ValidJson<PostChatRequest>,
) -> Result<(StatusCode, Json<PersonalChat>), ApiError> {
    let content = ChatContent::new(&req.content)?;
    let chat = PersonalChatRepo::new(&state.pool)
        .post(id, actor, content)
        .await?;
    Ok((StatusCode::CREATED, Json(chat)))
}

/// DELETE /personal-chats/{id} - sender only, soft delete
async fn delete_chat(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, ApiError> {
    PersonalChatRepo::new(&state.pool).delete_chat(id, actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/personal-chatrooms", get(list_rooms).post(open_room))
        .route("/personal-chatrooms/{id}", get(get_room).delete(leave_room))
        .route("/personal-chatrooms/{id}/chats", get(list_chats).post(post_chat))
        .route("/personal-chats/{id}", delete(delete_chat))
}

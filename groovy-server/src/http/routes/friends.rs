//! Friend and friend request endpoints

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::StatusFilter;
use crate::db::repos::{FriendRepo, FriendRequest, RequestBox, SimplifiedUser};
use crate::http::error::ApiError;
use crate::http::extractors::{ActingUser, ValidJson, ValidPath, ValidQuery};
use crate::http::server::AppState;
use crate::models::{Decision, Paginated, Pagination, PaginationParams};

#[derive(Debug, Deserialize)]
pub struct SendFriendRequest {
    pub request_to: i64,
}

/// `?box=received|sent`
#[derive(Debug, Default, Deserialize)]
pub struct BoxFilter {
    #[serde(rename = "box", default)]
    pub which: RequestBox,
}

#[derive(Debug, Serialize)]
pub struct FriendRequestResponse {
    pub id: i64,
    pub request_from: SimplifiedUser,
    pub request_to: SimplifiedUser,
    pub status: String,
    pub status_changed_at: String,
    pub created_at: String,
}

impl From<FriendRequest> for FriendRequestResponse {
    fn from(r: FriendRequest) -> Self {
        Self {
            id: r.id,
            request_from: r.request_from,
            request_to: r.request_to,
            status: r.status,
            status_changed_at: r.status_changed_at.to_rfc3339(),
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

/// GET /friends
async fn list_friends(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<Paginated<SimplifiedUser>>, ApiError> {
    let friends = FriendRepo::new(&state.pool)
        .list_friends(actor, Pagination::from(params))
        .await?;
    Ok(Json(friends))
}

/// DELETE /friends/{id}
async fn remove_friend(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidPath(friend_id): ValidPath<i64>,
) -> Result<StatusCode, ApiError> {
    FriendRepo::new(&state.pool).remove(actor, friend_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /friend-requests?box=&status=
async fn list_requests(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidQuery(params): ValidQuery<PaginationParams>,
    ValidQuery(filter): ValidQuery<StatusFilter>,
    ValidQuery(mailbox): ValidQuery<BoxFilter>,
) -> Result<Json<Paginated<FriendRequestResponse>>, ApiError> {
    let status = filter.parse()?;
    let requests = FriendRepo::new(&state.pool)
        .list_requests(actor, mailbox.which, status, Pagination::from(params))
        .await?;
    Ok(Json(requests.map(FriendRequestResponse::from)))
}

/// POST /friend-requests
async fn send_request(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidJson(req): ValidJson<SendFriendRequest>,
) -> Result<(StatusCode, Json<FriendRequestResponse>), ApiError> {
    let request = FriendRepo::new(&state.pool)
        .send_request(actor, req.request_to)
        .await?;
    Ok((StatusCode::CREATED, Json(FriendRequestResponse::from(request))))
}

/// POST /friend-requests/{id}/{accept|refuse}
async fn decide(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidPath((id, action)): ValidPath<(i64, String)>,
) -> Result<Json<FriendRequestResponse>, ApiError> {
    let decision = Decision::parse(&action)?;
    let request = FriendRepo::new(&state.pool)
        .decide(id, actor, decision)
        .await?;
    Ok(Json(FriendRequestResponse::from(request)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/friends", get(list_friends))
        .route("/friends/{id}", delete(remove_friend))
        .route("/friend-requests", get(list_requests).post(send_request))
        .route("/friend-requests/{id}/{action}", post(decide))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_defaults_to_received() {
        let filter: BoxFilter = serde_json::from_str("{}").unwrap();
        assert_eq!(filter.which, RequestBox::Received);
        let filter: BoxFilter = serde_json::from_str(r#"{"box": "sent"}"#).unwrap();
        assert_eq!(filter.which, RequestBox::Sent);
    }
}

//! Route handlers organized by resource

pub mod health;
pub mod root;
pub mod auth;
pub mod users;
pub mod universities;
pub mod verifications;
pub mod suggestions;
pub mod notifications;
pub mod friends;
pub mod groups;
pub mod group_chat;
pub mod personal_chat;

use std::sync::Arc;

use axum::Router;
use serde::Deserialize;

use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::models::RequestStatus;

/// Everything served under `/v1`
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(universities::router())
        .merge(verifications::router())
        .merge(suggestions::router())
        .merge(notifications::router())
        .merge(friends::router())
        .merge(groups::router())
        .merge(group_chat::router())
        .merge(personal_chat::router())
}

/// `?status=` filter on request lists
#[derive(Debug, Default, Deserialize)]
pub struct StatusFilter {
    pub status: Option<String>,
}

impl StatusFilter {
    pub fn parse(&self) -> Result<Option<RequestStatus>, ApiError> {
        Ok(self
            .status
            .as_deref()
            .map(RequestStatus::parse)
            .transpose()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use crate::http::server::build_router;

    /// Router over a pool that never connects; only paths that fail before
    /// touching the database can be exercised.
    fn app() -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/groovy_test")
            .unwrap();
        build_router(AppState { pool })
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_check_is_empty_200() {
        let response = app()
            .oneshot(Request::get("/health-check").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn root_links_use_host() {
        let response = app()
            .oneshot(
                Request::get("/v1/")
                    .header("host", "api.groovy.test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["users"], "http://api.groovy.test/v1/users");
        assert_eq!(body["university"], "http://api.groovy.test/v1/university");

        // Both links resolve to registered routes. DELETE is not served on
        // either collection, so a 405 proves the path matched without a query.
        for key in ["users", "university"] {
            let link = body[key].as_str().unwrap();
            let path = link.trim_start_matches("http://api.groovy.test");
            let response = app()
                .oneshot(Request::delete(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{link}");
        }
    }

    #[tokio::test]
    async fn malformed_input_gets_json_error() {
        let cases = [
            // no content type
            Request::post("/v1/groups")
                .header("x-user-id", "1")
                .body(Body::from(r#"{"title": "study"}"#))
                .unwrap(),
            // broken JSON on an optional body
            Request::post("/v1/groups/1/join-requests")
                .header("content-type", "application/json")
                .header("x-user-id", "1")
                .body(Body::from("{"))
                .unwrap(),
            // non-numeric id
            Request::get("/v1/groups/abc")
                .header("x-user-id", "1")
                .body(Body::empty())
                .unwrap(),
            // bad paging
            Request::get("/v1/groups?page=first")
                .header("x-user-id", "1")
                .body(Body::empty())
                .unwrap(),
        ];
        for request in cases {
            let uri = request.uri().to_string();
            let response = app().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(json_body(response).await["error"], "validation_error", "{uri}");
        }
    }

    #[tokio::test]
    async fn acting_user_required() {
        for uri in [
            "/v1/notifications",
            "/v1/friends",
            "/v1/friend-requests",
            "/v1/group-chatrooms",
            "/v1/personal-chatrooms",
        ] {
            let response = app()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn sign_up_rejects_bad_email() {
        let response = app()
            .oneshot(
                Request::post("/v1/users")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"email": "not-an-email", "grade": 1}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "validation_error");
    }

    #[tokio::test]
    async fn group_title_validated_before_storage() {
        let response = app()
            .oneshot(
                Request::post("/v1/groups")
                    .header("content-type", "application/json")
                    .header("x-user-id", "1")
                    .body(Body::from(r#"{"title": "   "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_decision_is_400() {
        let response = app()
            .oneshot(
                Request::post("/v1/friend-requests/5/maybe")
                    .header("x-user-id", "1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn status_filter_is_validated() {
        let response = app()
            .oneshot(
                Request::get("/v1/friend-requests?status=pending")
                    .header("x-user-id", "1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn empty_chat_rejected() {
        let response = app()
            .oneshot(
                Request::post("/v1/personal-chatrooms/3/chats")
                    .header("content-type", "application/json")
                    .header("x-user-id", "1")
                    .body(Body::from(r#"{"content": ""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn status_filter_parses() {
        let filter = StatusFilter {
            status: Some("REFUSED".into()),
        };
        assert_eq!(filter.parse().unwrap(), Some(RequestStatus::Refused));
        assert_eq!(StatusFilter::default().parse().unwrap(), None);
    }
}

//! API root: links to the browsable collections

use axum::{
    http::{header, HeaderMap},
    routing::get,
    Json, Router,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RootLinks {
    pub users: String,
    pub university: String,
}

impl RootLinks {
    fn for_host(host: &str) -> Self {
        Self {
            users: format!("http://{host}/v1/users"),
            university: format!("http://{host}/v1/university"),
        }
    }
}

/// GET /v1/
async fn api_root(headers: HeaderMap) -> Json<RootLinks> {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    Json(RootLinks::for_host(host))
}

pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/v1", get(api_root))
        .route("/v1/", get(api_root))
}

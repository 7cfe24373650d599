//! Health check endpoint

use axum::{http::StatusCode, routing::get, Router};

/// GET /health-check - liveness probe, empty body
async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Health routes
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health-check", get(health_check))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_returns_ok() {
        assert_eq!(health_check().await, StatusCode::OK);
    }
}

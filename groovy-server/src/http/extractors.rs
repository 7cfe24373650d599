//! Custom Axum extractors

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use super::error::ApiError;
use crate::models::ValidationError;

/// Header carrying the authenticated user id, set by the auth gateway
pub const USER_ID_HEADER: &str = "x-user-id";

/// Id of the user making the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingUser(pub i64);

impl ActingUser {
    fn parse(value: &str) -> Result<Self, ApiError> {
        match value.trim().parse::<i64>() {
            Ok(id) if id > 0 => Ok(Self(id)),
            _ => Err(ApiError::unauthorized("invalid X-User-Id header")),
        }
    }
}

impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::unauthorized("missing X-User-Id header"))?;
        let value = value
            .to_str()
            .map_err(|_| ApiError::unauthorized("invalid X-User-Id header"))?;
        Self::parse(value)
    }
}

fn malformed(part: &'static str, detail: String) -> ApiError {
    ApiError::Validation(ValidationError::Malformed { part, detail })
}

/// JSON body; decode failures become a 400 `validation_error`
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| malformed("body", e.body_text()))?;
        Ok(Self(value))
    }
}

/// JSON body that may be omitted entirely; an empty body yields `T::default()`
pub struct OptionalJson<T>(pub T);

impl<S, T> FromRequest<S> for OptionalJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| malformed("body", e.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(T::default()));
        }
        let Json(value) =
            Json::<T>::from_bytes(&bytes).map_err(|e| malformed("body", e.body_text()))?;
        Ok(Self(value))
    }
}

/// Query string; unknown values for typed fields become a 400
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| malformed("query", e.body_text()))?;
        Ok(Self(value))
    }
}

/// Path parameters, e.g. a non-numeric `{id}`
pub struct ValidPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| malformed("path", e.body_text()))?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize)]
    struct Greeting {
        message: Option<String>,
    }

    async fn extract(header: Option<&str>) -> Result<ActingUser, ApiError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(USER_ID_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        ActingUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn reads_user_id() {
        assert_eq!(extract(Some("42")).await.unwrap(), ActingUser(42));
        assert_eq!(extract(Some(" 7 ")).await.unwrap(), ActingUser(7));
    }

    #[tokio::test]
    async fn rejects_missing_or_bad_header() {
        for header in [None, Some(""), Some("abc"), Some("0"), Some("-3")] {
            assert!(
                matches!(extract(header).await, Err(ApiError::Unauthorized { .. })),
                "{header:?}"
            );
        }
    }

    #[tokio::test]
    async fn optional_json_defaults_on_empty_body() {
        let req = Request::post("/").body(Body::empty()).unwrap();
        let OptionalJson(greeting) = OptionalJson::<Greeting>::from_request(req, &())
            .await
            .unwrap();
        assert!(greeting.message.is_none());
    }

    #[tokio::test]
    async fn optional_json_reads_present_body() {
        let req = Request::post("/")
            .body(Body::from(r#"{"message": "안녕하세요"}"#))
            .unwrap();
        let OptionalJson(greeting) = OptionalJson::<Greeting>::from_request(req, &())
            .await
            .unwrap();
        assert_eq!(greeting.message.as_deref(), Some("안녕하세요"));
    }

    #[tokio::test]
    async fn malformed_json_is_validation_error() {
        let req = Request::post("/")
            .header("content-type", "application/json")
            .body(Body::from("{oops"))
            .unwrap();
        let result = ValidJson::<Greeting>::from_request(req, &()).await;
        assert!(matches!(
            result,
            Err(ApiError::Validation(ValidationError::Malformed { part: "body", .. }))
        ));
    }
}

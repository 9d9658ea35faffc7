//! Extractors whose rejections render as the `{ok, code, error}` envelope.
//!
//! Handlers import `Json`, `Path` and `Query` from here instead of from
//! `axum::extract` so that a malformed body, path segment or query string
//! is answered the same way as any other `AppError::Validation`.

use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::AppError;

/// JSON body extractor and response wrapper.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Path parameter extractor.
#[derive(Debug)]
pub struct Path<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Path(value) =
            axum::extract::Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Query string extractor.
#[derive(Debug)]
pub struct Query<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Query(value) =
            axum::extract::Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use serde::Deserialize;
    use uuid::Uuid;

    #[derive(Debug, Deserialize)]
    struct StatusBody {
        status: String,
    }

    async fn envelope(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_malformed_json_body_is_validation_error() {
        let req = Request::builder()
            .method("PATCH")
            .header("content-type", "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let err = Json::<StatusBody>::from_request(req, &()).await.unwrap_err();
        let (status, body) = envelope(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_wrong_field_type_is_validation_error() {
        let req = Request::builder()
            .method("PATCH")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"status":5}"#))
            .unwrap();
        let err = Json::<StatusBody>::from_request(req, &()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_missing_content_type_is_validation_error() {
        let req = Request::builder()
            .method("POST")
            .body(Body::from(r#"{"status":"open"}"#))
            .unwrap();
        let err = Json::<StatusBody>::from_request(req, &()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_valid_json_body_is_extracted() {
        let req = Request::builder()
            .method("PATCH")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"status":"completed"}"#))
            .unwrap();
        let Json(body) = Json::<StatusBody>::from_request(req, &()).await.unwrap();
        assert_eq!(body.status, "completed");
    }

    #[tokio::test]
    async fn test_bad_query_is_validation_error() {
        #[derive(Debug, Deserialize)]
        struct Filter {
            #[allow(dead_code)]
            assignee_id: Uuid,
        }
        let req = Request::builder()
            .uri("/tasks?assignee_id=nobody")
            .body(Body::empty())
            .unwrap();
        let (mut parts, _) = req.into_parts();
        let err = Query::<Filter>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        let (status, body) = envelope(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }
}

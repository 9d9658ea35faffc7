//! Read-only mode middleware that blocks write operations.

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::SharedState;
use crate::error::AppError;

pub fn is_write(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Reject POST/PUT/PATCH/DELETE when `READ_ONLY` is set.
pub async fn read_only_guard(
    State(state): State<SharedState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.read_only || !is_write(request.method()) {
        return next.run(request).await;
    }

    AppError::Forbidden("The journal is in read-only mode.".to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_methods() {
        assert!(is_write(&Method::POST));
        assert!(is_write(&Method::PATCH));
        assert!(is_write(&Method::PUT));
        assert!(is_write(&Method::DELETE));
        assert!(!is_write(&Method::GET));
        assert!(!is_write(&Method::HEAD));
        assert!(!is_write(&Method::OPTIONS));
    }
}

//! Liveness, Prometheus scrape and OpenAPI document.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::api::openapi::build_openapi;
use crate::api::SharedState;

#[derive(OpenApi)]
#[openapi(paths(health_check), components(schemas(HealthResponse)))]
pub struct HealthApiDoc;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/api/openapi.json", get(openapi_json))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub ok: bool,
    pub version: String,
    pub database: String,
}

/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    operation_id = "health_check",
    responses(
        (status = 200, description = "Service and database reachable", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse),
    ),
)]
pub async fn health_check(State(state): State<SharedState>) -> impl IntoResponse {
    let database = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await;

    let (status, ok, database) = match database {
        Ok(_) => (StatusCode::OK, true, "ok".to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the database");
            (StatusCode::SERVICE_UNAVAILABLE, false, "unavailable".to_string())
        }
    };

    (
        status,
        Json(HealthResponse {
            ok,
            version: env!("CARGO_PKG_VERSION").to_string(),
            database,
        }),
    )
}

/// GET /metrics
pub async fn metrics(State(state): State<SharedState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// GET /api/openapi.json
pub async fn openapi_json() -> impl IntoResponse {
    Json(build_openapi())
}

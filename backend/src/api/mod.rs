//! HTTP API: shared state, router assembly and the response envelope.

pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod validation;

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, middleware as axum_middleware, Router};
use jsonwebtoken::DecodingKey;
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::storage::StorageBackend;

/// State shared by every handler.
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub storage: Arc<dyn StorageBackend>,
    pub metrics: PrometheusHandle,
    pub jwt_key: DecodingKey,
}

impl AppState {
    pub fn new(
        db: PgPool,
        config: Config,
        storage: Arc<dyn StorageBackend>,
        metrics: PrometheusHandle,
    ) -> Self {
        let jwt_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        Self {
            db,
            config,
            storage,
            metrics,
            jwt_key,
        }
    }
}

pub type SharedState = Arc<AppState>;

/// Build the application router.
pub fn build_router(state: SharedState) -> Router {
    let api = Router::new()
        .nest("/editor", handlers::editor_router())
        .nest("/reviewer", handlers::reviewer::router())
        .nest("/author", handlers::author::router())
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::read_only::read_only_guard,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .nest("/api", api)
        .merge(handlers::health::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(state.config.max_upload_bytes)),
        )
        .with_state(state)
}

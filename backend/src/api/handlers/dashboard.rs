//! Editor dashboard counters.

use axum::{
    extract::{Extension, State},
    routing::get,
    Router,
};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::api::extract::Json;
use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::Result;
use crate::models::submission::DashboardStats;
use crate::services::submission_service::SubmissionService;

#[derive(OpenApi)]
#[openapi(paths(get_dashboard), components(schemas(DashboardResponse, DashboardStats)))]
pub struct DashboardApiDoc;

pub fn router() -> Router<SharedState> {
    Router::new().route("/dashboard", get(get_dashboard))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub ok: bool,
    pub stats: DashboardStats,
}

/// GET /api/editor/dashboard
#[utoipa::path(
    get,
    path = "/dashboard",
    context_path = "/api/editor",
    tag = "dashboard",
    operation_id = "get_dashboard",
    responses(
        (status = 200, description = "Queue and stage counters", body = DashboardResponse),
        (status = 403, description = "Editor role required"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn get_dashboard(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
) -> Result<Json<DashboardResponse>> {
    auth.actor().require_editor()?;
    let service = SubmissionService::new(state.db.clone());
    let stats = service.dashboard_stats(auth.user_id).await?;
    Ok(Json(DashboardResponse { ok: true, stats }))
}

//! Publication version handlers.

use axum::{
    extract::{Extension, State},
    routing::{get, patch, post},
    Router,
};
use serde::Serialize;
use serde_json::Value;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::extract::{Json, Path};
use crate::api::handlers::MessageResponse;
use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::Result;
use crate::models::publication::{
    CreateVersionRequest, Identifiers, MetadataPatch, PublicationAuthor, PublicationVersion,
    PublishRequest, UnpublishRequest, VersionStatus,
};
use crate::services::publication_service::{created_message, PublicationService};

#[derive(OpenApi)]
#[openapi(
    paths(list_versions, create_version, publish, unpublish, update_metadata),
    components(schemas(
        VersionListResponse,
        VersionResponse,
        MetadataResponse,
        MessageResponse,
        PublicationVersion,
        VersionStatus,
        CreateVersionRequest,
        PublishRequest,
        UnpublishRequest,
        MetadataPatch,
        PublicationAuthor,
        Identifiers,
    ))
)]
pub struct PublicationsApiDoc;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/submissions/:id/publications/versions",
            get(list_versions).post(create_version),
        )
        .route("/submissions/:id/publications/publish", post(publish))
        .route("/submissions/:id/publications/unpublish", post(unpublish))
        .route(
            "/submissions/:id/publications/:version_id/metadata",
            patch(update_metadata),
        )
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VersionListResponse {
    pub ok: bool,
    pub versions: Vec<PublicationVersion>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VersionResponse {
    pub ok: bool,
    pub version: PublicationVersion,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MetadataResponse {
    pub ok: bool,
    #[schema(value_type = Object)]
    pub metadata: Value,
}

/// GET /api/editor/submissions/:id/publications/versions
#[utoipa::path(
    get,
    path = "/submissions/{id}/publications/versions",
    context_path = "/api/editor",
    tag = "publications",
    operation_id = "list_publication_versions",
    params(("id" = Uuid, Path, description = "Submission ID")),
    responses((status = 200, description = "Versions, oldest first", body = VersionListResponse)),
    security(("bearer_auth" = [])),
)]
pub async fn list_versions(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<Json<VersionListResponse>> {
    let versions = PublicationService::new(state.db.clone())
        .list(id, &auth.actor())
        .await?;
    Ok(Json(VersionListResponse { ok: true, versions }))
}

/// POST /api/editor/submissions/:id/publications/versions
#[utoipa::path(
    post,
    path = "/submissions/{id}/publications/versions",
    context_path = "/api/editor",
    tag = "publications",
    operation_id = "create_publication_version",
    params(("id" = Uuid, Path, description = "Submission ID")),
    request_body = CreateVersionRequest,
    responses(
        (status = 200, description = "Version queued", body = VersionResponse),
        (status = 404, description = "Submission not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn create_version(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
    payload: Option<Json<CreateVersionRequest>>,
) -> Result<Json<VersionResponse>> {
    let req = payload.map(|Json(body)| body).unwrap_or_default();
    let version = PublicationService::new(state.db.clone())
        .create_version(id, req, &auth.actor())
        .await?;
    let message = created_message(version.version);
    Ok(Json(VersionResponse {
        ok: true,
        version,
        message,
    }))
}

/// POST /api/editor/submissions/:id/publications/publish
#[utoipa::path(
    post,
    path = "/submissions/{id}/publications/publish",
    context_path = "/api/editor",
    tag = "publications",
    operation_id = "publish_version",
    params(("id" = Uuid, Path, description = "Submission ID")),
    request_body = PublishRequest,
    responses(
        (status = 200, description = "Version published or scheduled", body = VersionResponse),
        (status = 400, description = "Publish date missing"),
        (status = 404, description = "Version not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn publish(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PublishRequest>,
) -> Result<Json<VersionResponse>> {
    let version = PublicationService::new(state.db.clone())
        .publish(id, &payload, &auth.actor())
        .await?;
    Ok(Json(VersionResponse {
        ok: true,
        version,
        message: payload.response_message().to_string(),
    }))
}

/// POST /api/editor/submissions/:id/publications/unpublish
#[utoipa::path(
    post,
    path = "/submissions/{id}/publications/unpublish",
    context_path = "/api/editor",
    tag = "publications",
    operation_id = "unpublish_version",
    params(("id" = Uuid, Path, description = "Submission ID")),
    request_body = UnpublishRequest,
    responses(
        (status = 200, description = "Returned to the queue", body = MessageResponse),
        (status = 404, description = "Version not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn unpublish(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
    payload: Option<Json<UnpublishRequest>>,
) -> Result<Json<MessageResponse>> {
    let req = payload.map(|Json(body)| body).unwrap_or_default();
    PublicationService::new(state.db.clone())
        .unpublish(id, &req, &auth.actor())
        .await?;
    Ok(Json(MessageResponse::new("Publication unpublished successfully.")))
}

/// PATCH /api/editor/submissions/:id/publications/:version_id/metadata
#[utoipa::path(
    patch,
    path = "/submissions/{id}/publications/{version_id}/metadata",
    context_path = "/api/editor",
    tag = "publications",
    operation_id = "update_publication_metadata",
    params(
        ("id" = Uuid, Path, description = "Submission ID"),
        ("version_id" = Uuid, Path, description = "Version ID"),
    ),
    request_body = MetadataPatch,
    responses(
        (status = 200, description = "Merged metadata", body = MetadataResponse),
        (status = 400, description = "Empty patch"),
        (status = 403, description = "Not an editor or the submitting author, or version published"),
        (status = 404, description = "Version not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn update_metadata(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path((id, version_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<MetadataPatch>,
) -> Result<Json<MetadataResponse>> {
    let metadata = PublicationService::new(state.db.clone())
        .update_metadata(id, version_id, payload, &auth.actor())
        .await?;
    Ok(Json(MetadataResponse { ok: true, metadata }))
}

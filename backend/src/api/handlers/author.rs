//! Author-facing file handlers for a caller's own submissions.

use axum::{
    extract::{Extension, Multipart, State},
    routing::get,
    Router,
};
use utoipa::OpenApi;
use uuid::Uuid;

use crate::api::extract::{Json, Path};
use crate::api::handlers::files::{read_file_form, FileListResponse, FileUploadResponse};
use crate::api::middleware::auth::AuthExtension;
use crate::api::validation::UploadForm;
use crate::api::SharedState;
use crate::error::Result;
use crate::models::submission::Stage;
use crate::services::file_service::FileService;

#[derive(OpenApi)]
#[openapi(paths(list_author_files, upload_author_file))]
pub struct AuthorApiDoc;

pub fn router() -> Router<SharedState> {
    Router::new().route(
        "/submissions/:id/files",
        get(list_author_files).post(upload_author_file),
    )
}

/// GET /api/author/submissions/:id/files
#[utoipa::path(
    get,
    path = "/submissions/{id}/files",
    context_path = "/api/author",
    tag = "author",
    operation_id = "list_author_files",
    params(("id" = Uuid, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Files visible to the author", body = FileListResponse),
        (status = 404, description = "Submission not found or not owned by the caller"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn list_author_files(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<Json<FileListResponse>> {
    let files = FileService::new(state.db.clone(), state.storage.clone())
        .author_files(id, &auth.actor())
        .await?;
    Ok(Json(FileListResponse { ok: true, files }))
}

/// POST /api/author/submissions/:id/files (multipart)
#[utoipa::path(
    post,
    path = "/submissions/{id}/files",
    context_path = "/api/author",
    tag = "author",
    operation_id = "upload_author_file",
    params(("id" = Uuid, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "File stored", body = FileUploadResponse),
        (status = 403, description = "Uploads closed at the current stage"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn upload_author_file(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<FileUploadResponse>> {
    let mut form = UploadForm::read(multipart).await?;
    let (file, content) = read_file_form(&mut form, Some(Stage::Submission))?;

    let file = FileService::new(state.db.clone(), state.storage.clone())
        .upload_as_author(id, file, content, &auth.actor())
        .await?;
    Ok(Json(FileUploadResponse {
        ok: true,
        file,
        message: "File uploaded successfully".to_string(),
    }))
}

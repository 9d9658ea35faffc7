//! Editor file handlers: list, upload, copy between stages, download.

use axum::{
    body::Body,
    extract::{Extension, Multipart, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::extract::{Json, Path, Query};
use crate::api::middleware::auth::AuthExtension;
use crate::api::validation::{
    parse_form_bool, parse_optional_uuid, parse_round, parse_stage, UploadForm,
};
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::submission::Stage;
use crate::models::submission_file::{
    CopyFilesRequest, NewSubmissionFile, SubmissionFile, DEFAULT_FILE_KIND,
};
use crate::services::file_service::{copy_message, file_extension, sanitize_label, FileService};

#[derive(OpenApi)]
#[openapi(
    paths(list_files, upload_file, copy_files, download_file),
    components(schemas(FileListResponse, FileUploadResponse, CopyFilesResponse, SubmissionFile, CopyFilesRequest))
)]
pub struct FilesApiDoc;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/submissions/:id/files", get(list_files).post(upload_file))
        .route("/submissions/:id/files/copy", post(copy_files))
        .route("/submissions/:id/files/:file_id/download", get(download_file))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListFilesQuery {
    pub stage: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FileListResponse {
    pub ok: bool,
    pub files: Vec<SubmissionFile>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FileUploadResponse {
    pub ok: bool,
    pub file: SubmissionFile,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CopyFilesResponse {
    pub ok: bool,
    pub copied: Vec<SubmissionFile>,
    pub message: String,
}

/// Read the `file` part and its metadata fields from an upload form.
pub fn read_file_form(form: &mut UploadForm, default_stage: Option<Stage>) -> Result<(NewSubmissionFile, bytes::Bytes)> {
    let part = form
        .take_file("file")
        .ok_or_else(|| AppError::Validation("File is required".to_string()))?;
    let label = form
        .text("label")
        .unwrap_or_else(|| part.file_name.clone());
    let stage = match (form.text("stage"), default_stage) {
        (Some(raw), _) => parse_stage(Some(&raw), "stage")?,
        (None, Some(stage)) => stage,
        (None, None) => return Err(AppError::Validation("Stage is required".to_string())),
    };

    let file = NewSubmissionFile {
        label,
        stage,
        kind: form.text("kind").unwrap_or_else(|| DEFAULT_FILE_KIND.to_string()),
        version_label: form.text("versionLabel"),
        round: parse_round(form.text("round").as_deref())?,
        is_visible_to_authors: parse_form_bool(form.text("isVisibleToAuthors").as_deref()),
        review_round_id: parse_optional_uuid(form.text("reviewRoundId").as_deref(), "review round")?,
        original_name: part.file_name,
        content_type: part.content_type,
    };
    Ok((file, part.content))
}

/// GET /api/editor/submissions/:id/files
#[utoipa::path(
    get,
    path = "/submissions/{id}/files",
    context_path = "/api/editor",
    tag = "files",
    operation_id = "list_files",
    params(("id" = Uuid, Path, description = "Submission ID"), ListFilesQuery),
    responses((status = 200, description = "Submission files", body = FileListResponse)),
    security(("bearer_auth" = [])),
)]
pub async fn list_files(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<FileListResponse>> {
    auth.actor().require_editor()?;
    let stage = match query.stage.as_deref() {
        Some(raw) if !raw.is_empty() => Some(parse_stage(Some(raw), "stage")?),
        _ => None,
    };
    let service = FileService::new(state.db.clone(), state.storage.clone());
    let files = service.list(id, stage).await?;
    Ok(Json(FileListResponse { ok: true, files }))
}

/// POST /api/editor/submissions/:id/files (multipart)
#[utoipa::path(
    post,
    path = "/submissions/{id}/files",
    context_path = "/api/editor",
    tag = "files",
    operation_id = "upload_file",
    params(("id" = Uuid, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "File stored", body = FileUploadResponse),
        (status = 400, description = "Missing file or invalid stage"),
        (status = 403, description = "Editor role required"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn upload_file(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<FileUploadResponse>> {
    auth.actor().require_editor()?;
    let mut form = UploadForm::read(multipart).await?;
    let (file, content) = read_file_form(&mut form, None)?;

    let service = FileService::new(state.db.clone(), state.storage.clone());
    let file = service.upload(id, file, content, &auth.actor()).await?;
    Ok(Json(FileUploadResponse {
        ok: true,
        file,
        message: "File uploaded successfully".to_string(),
    }))
}

/// POST /api/editor/submissions/:id/files/copy
#[utoipa::path(
    post,
    path = "/submissions/{id}/files/copy",
    context_path = "/api/editor",
    tag = "files",
    operation_id = "copy_files",
    params(("id" = Uuid, Path, description = "Submission ID")),
    request_body = CopyFilesRequest,
    responses(
        (status = 200, description = "Files copied", body = CopyFilesResponse),
        (status = 400, description = "No files selected or invalid target stage"),
        (status = 404, description = "None of the files belong to the submission"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn copy_files(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CopyFilesRequest>,
) -> Result<Json<CopyFilesResponse>> {
    auth.actor().require_editor()?;
    if payload.file_ids.is_empty() {
        return Err(AppError::Validation("No files selected".to_string()));
    }
    let target_stage = parse_stage(payload.target_stage.as_deref(), "target stage")?;

    let service = FileService::new(state.db.clone(), state.storage.clone());
    let copied = service
        .copy(id, &payload.file_ids, target_stage, &auth.actor())
        .await?;
    let message = copy_message(copied.len(), target_stage);
    Ok(Json(CopyFilesResponse {
        ok: true,
        copied,
        message,
    }))
}

/// GET /api/editor/submissions/:id/files/:file_id/download
#[utoipa::path(
    get,
    path = "/submissions/{id}/files/{file_id}/download",
    context_path = "/api/editor",
    tag = "files",
    operation_id = "download_file",
    params(
        ("id" = Uuid, Path, description = "Submission ID"),
        ("file_id" = Uuid, Path, description = "File ID"),
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 404, description = "File not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn download_file(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path((id, file_id)): Path<(Uuid, Uuid)>,
) -> Result<Response> {
    auth.actor().require_editor()?;
    let service = FileService::new(state.db.clone(), state.storage.clone());
    let (file, content) = service.download(id, file_id).await?;

    let content_type = mime_guess::from_path(&file.storage_path)
        .first_or_octet_stream()
        .to_string();
    let disposition = format!("attachment; filename=\"{}\"", download_name(&file));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from(content),
    )
        .into_response())
}

/// Label with the stored extension, safe for a `Content-Disposition` header.
pub fn download_name(file: &SubmissionFile) -> String {
    let name = sanitize_label(&file.label);
    let ext = file_extension(&file.storage_path);
    if ext == "bin" || name.ends_with(&format!(".{}", ext)) {
        name
    } else {
        format!("{}.{}", name, ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chrono::Utc;

    use crate::api::validation::UploadedPart;

    fn file(label: &str, storage_path: &str) -> SubmissionFile {
        SubmissionFile {
            id: Uuid::nil(),
            submission_id: Uuid::nil(),
            label: label.into(),
            stage: Stage::Review,
            kind: DEFAULT_FILE_KIND.into(),
            storage_path: storage_path.into(),
            version_label: None,
            round: 1,
            is_visible_to_authors: false,
            size: 1,
            uploaded_by: None,
            uploaded_at: Utc::now(),
            review_round_id: None,
        }
    }

    #[test]
    fn test_download_name_appends_extension() {
        assert_eq!(
            download_name(&file("Blind manuscript", "submissions/x/review/1-Blind_manuscript.pdf")),
            "Blind_manuscript.pdf"
        );
        assert_eq!(
            download_name(&file("paper.pdf", "submissions/x/review/1-paper.pdf.pdf")),
            "paper.pdf"
        );
    }

    fn form_with_file(fields: Vec<(&str, &str)>) -> UploadForm {
        UploadForm {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files: vec![UploadedPart {
                field: "file".into(),
                file_name: "paper.docx".into(),
                content_type: Some("application/msword".into()),
                content: Bytes::from_static(b"doc"),
            }],
        }
    }

    #[test]
    fn test_read_file_form_defaults() {
        let mut form = form_with_file(vec![("stage", "review")]);
        let (file, content) = read_file_form(&mut form, None).unwrap();
        assert_eq!(file.label, "paper.docx");
        assert_eq!(file.stage, Stage::Review);
        assert_eq!(file.kind, "manuscript");
        assert_eq!(file.round, 1);
        assert!(!file.is_visible_to_authors);
        assert_eq!(content, Bytes::from_static(b"doc"));
    }

    #[test]
    fn test_read_file_form_requires_stage() {
        let mut form = form_with_file(vec![("label", "Paper")]);
        assert!(read_file_form(&mut form, None).is_err());

        let mut form = form_with_file(vec![("label", "Paper")]);
        let (file, _) = read_file_form(&mut form, Some(Stage::Submission)).unwrap();
        assert_eq!(file.stage, Stage::Submission);
    }

    #[test]
    fn test_read_file_form_requires_file() {
        let mut form = UploadForm::default();
        let err = read_file_form(&mut form, Some(Stage::Review)).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: File is required");
    }
}

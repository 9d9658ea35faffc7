//! Reviewer assignment handlers.

use axum::{
    extract::{Extension, Multipart, State},
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::extract::{Json, Path, Query};
use crate::api::handlers::Ack;
use crate::api::middleware::auth::AuthExtension;
use crate::api::validation::UploadForm;
use crate::api::SharedState;
use crate::error::Result;
use crate::models::review::{
    AcceptReviewRequest, AssignmentDetails, AssignmentFilter, DeclineReviewRequest,
    ReviewAttachment, ReviewDraft, ReviewForm, ReviewFormQuestion, ReviewerAssignment,
    SubmitReviewRequest,
};
use crate::models::submission_file::SubmissionFile;
use crate::services::review_service::{ReviewService, UploadedAttachment};

#[derive(OpenApi)]
#[openapi(
    paths(
        list_assignments,
        get_assignment,
        get_details,
        get_review_form,
        accept_assignment,
        decline_assignment,
        save_draft,
        submit_review,
        list_review_files,
        list_attachments,
        upload_attachments,
        delete_attachment,
    ),
    components(schemas(
        AssignmentListResponse,
        AssignmentResponse,
        AssignmentDetailsResponse,
        ReviewFormResponse,
        AttachmentListResponse,
        ReviewFilesResponse,
        ReviewerAssignment,
        AssignmentDetails,
        ReviewForm,
        ReviewFormQuestion,
        ReviewAttachment,
        AcceptReviewRequest,
        DeclineReviewRequest,
        ReviewDraft,
        SubmitReviewRequest,
    ))
)]
pub struct ReviewerApiDoc;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/assignments", get(list_assignments))
        .route("/assignments/:id", get(get_assignment))
        .route("/assignments/:id/details", get(get_details))
        .route("/assignments/:id/review-form", get(get_review_form))
        .route("/assignments/:id/accept", post(accept_assignment))
        .route("/assignments/:id/decline", post(decline_assignment))
        .route("/assignments/:id/draft", put(save_draft))
        .route("/assignments/:id/submit", post(submit_review))
        .route("/assignments/:id/files", get(list_review_files))
        .route(
            "/assignments/:id/attachments",
            get(list_attachments).post(upload_attachments),
        )
        .route(
            "/assignments/:id/attachments/:attachment_id",
            delete(delete_attachment),
        )
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListAssignmentsQuery {
    /// all (default), pending, active or completed
    pub filter: Option<String>,
}

impl ListAssignmentsQuery {
    pub fn filter(&self) -> Result<AssignmentFilter> {
        match self.filter.as_deref() {
            Some(raw) if !raw.is_empty() => Ok(raw.parse::<AssignmentFilter>()?),
            _ => Ok(AssignmentFilter::default()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignmentListResponse {
    pub ok: bool,
    pub assignments: Vec<ReviewerAssignment>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignmentResponse {
    pub ok: bool,
    pub assignment: ReviewerAssignment,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignmentDetailsResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub details: AssignmentDetails,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFormResponse {
    pub ok: bool,
    /// `null` when the assignment has no form
    pub review_form: Option<ReviewForm>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttachmentListResponse {
    pub ok: bool,
    pub attachments: Vec<ReviewAttachment>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewFilesResponse {
    pub ok: bool,
    pub files: Vec<SubmissionFile>,
}

fn service(state: &SharedState) -> ReviewService {
    ReviewService::new(state.db.clone(), state.storage.clone())
}

/// GET /api/reviewer/assignments
#[utoipa::path(
    get,
    path = "/assignments",
    context_path = "/api/reviewer",
    tag = "reviewer",
    operation_id = "list_assignments",
    params(ListAssignmentsQuery),
    responses(
        (status = 200, description = "The caller's assignments", body = AssignmentListResponse),
        (status = 403, description = "Reviewer role required"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn list_assignments(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Query(query): Query<ListAssignmentsQuery>,
) -> Result<Json<AssignmentListResponse>> {
    let filter = query.filter()?;
    let assignments = service(&state)
        .list_for_reviewer(&auth.actor(), filter)
        .await?;
    Ok(Json(AssignmentListResponse {
        ok: true,
        assignments,
    }))
}

/// GET /api/reviewer/assignments/:id
#[utoipa::path(
    get,
    path = "/assignments/{id}",
    context_path = "/api/reviewer",
    tag = "reviewer",
    operation_id = "get_assignment",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment", body = AssignmentResponse),
        (status = 404, description = "Assignment not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn get_assignment(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<Json<AssignmentResponse>> {
    let assignment = service(&state).get_assignment(id, &auth.actor()).await?;
    Ok(Json(AssignmentResponse {
        ok: true,
        assignment,
    }))
}

/// GET /api/reviewer/assignments/:id/details
#[utoipa::path(
    get,
    path = "/assignments/{id}/details",
    context_path = "/api/reviewer",
    tag = "reviewer",
    operation_id = "get_assignment_details",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses((status = 200, description = "Invitation details", body = AssignmentDetailsResponse)),
    security(("bearer_auth" = [])),
)]
pub async fn get_details(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<Json<AssignmentDetailsResponse>> {
    let details = service(&state).details(id, &auth.actor()).await?;
    Ok(Json(AssignmentDetailsResponse { ok: true, details }))
}

/// GET /api/reviewer/assignments/:id/review-form
#[utoipa::path(
    get,
    path = "/assignments/{id}/review-form",
    context_path = "/api/reviewer",
    tag = "reviewer",
    operation_id = "get_review_form",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Review form questions, or null", body = ReviewFormResponse),
        (status = 404, description = "Assignment not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn get_review_form(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReviewFormResponse>> {
    let review_form = service(&state).review_form(id, &auth.actor()).await?;
    Ok(Json(ReviewFormResponse { ok: true, review_form }))
}

/// POST /api/reviewer/assignments/:id/accept
#[utoipa::path(
    post,
    path = "/assignments/{id}/accept",
    context_path = "/api/reviewer",
    tag = "reviewer",
    operation_id = "accept_assignment",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    request_body = AcceptReviewRequest,
    responses(
        (status = 200, description = "Accepted", body = Ack),
        (status = 409, description = "Assignment is not pending"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn accept_assignment(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
    payload: Option<Json<AcceptReviewRequest>>,
) -> Result<Json<Ack>> {
    let payload = payload.map(|Json(body)| body).unwrap_or_default();
    service(&state).accept(id, &auth.actor(), payload).await?;
    Ok(Json(Ack::new()))
}

/// POST /api/reviewer/assignments/:id/decline
#[utoipa::path(
    post,
    path = "/assignments/{id}/decline",
    context_path = "/api/reviewer",
    tag = "reviewer",
    operation_id = "decline_assignment",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    request_body = DeclineReviewRequest,
    responses(
        (status = 200, description = "Declined", body = Ack),
        (status = 400, description = "Reason missing"),
        (status = 409, description = "Assignment already finished"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn decline_assignment(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DeclineReviewRequest>,
) -> Result<Json<Ack>> {
    service(&state)
        .decline(id, &auth.actor(), &payload.reason)
        .await?;
    Ok(Json(Ack::new()))
}

/// PUT /api/reviewer/assignments/:id/draft
#[utoipa::path(
    put,
    path = "/assignments/{id}/draft",
    context_path = "/api/reviewer",
    tag = "reviewer",
    operation_id = "save_review_draft",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    request_body = ReviewDraft,
    responses(
        (status = 200, description = "Draft saved", body = Ack),
        (status = 409, description = "Assignment is not accepted"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn save_draft(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewDraft>,
) -> Result<Json<Ack>> {
    service(&state).save_draft(id, &auth.actor(), payload).await?;
    Ok(Json(Ack::new()))
}

/// POST /api/reviewer/assignments/:id/submit
#[utoipa::path(
    post,
    path = "/assignments/{id}/submit",
    context_path = "/api/reviewer",
    tag = "reviewer",
    operation_id = "submit_review",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    request_body = SubmitReviewRequest,
    responses(
        (status = 200, description = "Review submitted", body = Ack),
        (status = 409, description = "Assignment is not accepted"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn submit_review(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitReviewRequest>,
) -> Result<Json<Ack>> {
    service(&state).submit(id, &auth.actor(), payload).await?;
    Ok(Json(Ack::new()))
}

/// GET /api/reviewer/assignments/:id/files
#[utoipa::path(
    get,
    path = "/assignments/{id}/files",
    context_path = "/api/reviewer",
    tag = "reviewer",
    operation_id = "list_review_files",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses((status = 200, description = "Files for review", body = ReviewFilesResponse)),
    security(("bearer_auth" = [])),
)]
pub async fn list_review_files(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReviewFilesResponse>> {
    let files = service(&state).review_files(id, &auth.actor()).await?;
    Ok(Json(ReviewFilesResponse { ok: true, files }))
}

/// GET /api/reviewer/assignments/:id/attachments
#[utoipa::path(
    get,
    path = "/assignments/{id}/attachments",
    context_path = "/api/reviewer",
    tag = "reviewer",
    operation_id = "list_review_attachments",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses((status = 200, description = "Attachments", body = AttachmentListResponse)),
    security(("bearer_auth" = [])),
)]
pub async fn list_attachments(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<Json<AttachmentListResponse>> {
    let attachments = service(&state).list_attachments(id, &auth.actor()).await?;
    Ok(Json(AttachmentListResponse {
        ok: true,
        attachments,
    }))
}

/// POST /api/reviewer/assignments/:id/attachments (multipart `files`)
#[utoipa::path(
    post,
    path = "/assignments/{id}/attachments",
    context_path = "/api/reviewer",
    tag = "reviewer",
    operation_id = "upload_review_attachments",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Stored attachments", body = AttachmentListResponse),
        (status = 400, description = "No files provided"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn upload_attachments(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<AttachmentListResponse>> {
    let mut form = UploadForm::read(multipart).await?;
    let files = form
        .take_files("files")
        .into_iter()
        .map(|part| UploadedAttachment {
            file_name: part.file_name,
            content: part.content,
        })
        .collect();
    let attachments = service(&state)
        .upload_attachments(id, &auth.actor(), files)
        .await?;
    Ok(Json(AttachmentListResponse {
        ok: true,
        attachments,
    }))
}

/// DELETE /api/reviewer/assignments/:id/attachments/:attachment_id
#[utoipa::path(
    delete,
    path = "/assignments/{id}/attachments/{attachment_id}",
    context_path = "/api/reviewer",
    tag = "reviewer",
    operation_id = "delete_review_attachment",
    params(
        ("id" = Uuid, Path, description = "Assignment ID"),
        ("attachment_id" = Uuid, Path, description = "Attachment ID"),
    ),
    responses(
        (status = 200, description = "Attachment deleted", body = Ack),
        (status = 404, description = "Attachment not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn delete_attachment(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path((id, attachment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Ack>> {
    service(&state)
        .delete_attachment(id, attachment_id, &auth.actor())
        .await?;
    Ok(Json(Ack::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults_to_all() {
        assert_eq!(
            ListAssignmentsQuery::default().filter().unwrap(),
            AssignmentFilter::All
        );
    }

    #[test]
    fn test_filter_parses_active() {
        let query = ListAssignmentsQuery {
            filter: Some("active".into()),
        };
        assert_eq!(query.filter().unwrap(), AssignmentFilter::Active);
    }

    #[test]
    fn test_details_response_is_flat() {
        let response = AssignmentDetailsResponse {
            ok: true,
            details: AssignmentDetails::from_metadata(&serde_json::json!({})),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["reviewMethod"], "Double-blind");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_missing_review_form_serializes_as_null() {
        let response = ReviewFormResponse {
            ok: true,
            review_form: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["ok"], true);
        assert!(json["reviewForm"].is_null());
    }
}

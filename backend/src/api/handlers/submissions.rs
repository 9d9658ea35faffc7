//! Submission queues, detail view and workflow changes.

use axum::{
    extract::{Extension, State},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::extract::{Json, Path, Query};
use crate::api::handlers::Ack;
use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::Result;
use crate::models::submission::{
    Queue, Stage, SubmissionDetail, SubmissionSummary, WorkflowUpdateRequest,
};
use crate::services::submission_service::{SubmissionListParams, SubmissionService};

#[derive(OpenApi)]
#[openapi(
    paths(list_submissions, get_submission, update_workflow),
    components(schemas(
        SubmissionListResponse,
        SubmissionDetailResponse,
        SubmissionSummary,
        SubmissionDetail,
        WorkflowUpdateRequest,
    ))
)]
pub struct SubmissionsApiDoc;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/submissions", get(list_submissions))
        .route("/submissions/:id", get(get_submission))
        .route("/submissions/:id/workflow", post(update_workflow))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListSubmissionsQuery {
    /// my, unassigned, all (default) or archived
    pub queue: Option<String>,
    pub stage: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListSubmissionsQuery {
    pub fn list_params(self, user_id: Uuid, default_limit: i64) -> Result<SubmissionListParams> {
        let queue = match self.queue.as_deref() {
            Some(raw) if !raw.is_empty() => raw.parse::<Queue>()?,
            _ => Queue::default(),
        };
        let stage = match self.stage.as_deref() {
            Some(raw) if !raw.is_empty() => Some(raw.parse::<Stage>()?),
            _ => None,
        };
        Ok(SubmissionListParams {
            queue,
            stage,
            search: self.search.filter(|s| !s.trim().is_empty()),
            limit: self.limit.unwrap_or(default_limit),
            offset: self.offset.unwrap_or(0),
            user_id: Some(user_id),
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmissionListResponse {
    pub ok: bool,
    pub submissions: Vec<SubmissionSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmissionDetailResponse {
    pub ok: bool,
    pub submission: SubmissionDetail,
}

/// GET /api/editor/submissions
#[utoipa::path(
    get,
    path = "/submissions",
    context_path = "/api/editor",
    tag = "submissions",
    operation_id = "list_submissions",
    params(ListSubmissionsQuery),
    responses(
        (status = 200, description = "Submissions in the queue", body = SubmissionListResponse),
        (status = 400, description = "Unknown queue or stage"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn list_submissions(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Query(query): Query<ListSubmissionsQuery>,
) -> Result<Json<SubmissionListResponse>> {
    auth.actor().require_editor()?;
    let params = query.list_params(auth.user_id, state.config.task_list_limit)?;
    let service = SubmissionService::new(state.db.clone());
    let submissions = service.list(&params).await?;
    Ok(Json(SubmissionListResponse {
        ok: true,
        submissions,
    }))
}

/// GET /api/editor/submissions/:id
#[utoipa::path(
    get,
    path = "/submissions/{id}",
    context_path = "/api/editor",
    tag = "submissions",
    operation_id = "get_submission",
    params(("id" = Uuid, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Submission workspace", body = SubmissionDetailResponse),
        (status = 404, description = "Submission not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn get_submission(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<Json<SubmissionDetailResponse>> {
    auth.actor().require_editor()?;
    let service = SubmissionService::new(state.db.clone());
    let submission = service.detail(id).await?;
    Ok(Json(SubmissionDetailResponse {
        ok: true,
        submission,
    }))
}

/// POST /api/editor/submissions/:id/workflow
#[utoipa::path(
    post,
    path = "/submissions/{id}/workflow",
    context_path = "/api/editor",
    tag = "submissions",
    operation_id = "update_workflow",
    params(("id" = Uuid, Path, description = "Submission ID")),
    request_body = WorkflowUpdateRequest,
    responses(
        (status = 200, description = "Workflow updated", body = Ack),
        (status = 400, description = "Nothing to update or invalid stage/status"),
        (status = 404, description = "Submission not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn update_workflow(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
    Json(payload): Json<WorkflowUpdateRequest>,
) -> Result<Json<Ack>> {
    let change = payload.validate()?;
    let service = SubmissionService::new(state.db.clone());
    service.update_workflow(id, change, &auth.actor()).await?;
    Ok(Json(Ack::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults() {
        let user = Uuid::new_v4();
        let params = ListSubmissionsQuery::default().list_params(user, 20).unwrap();
        assert_eq!(params.queue, Queue::All);
        assert_eq!(params.stage, None);
        assert_eq!(params.limit, 20);
        assert_eq!(params.offset, 0);
        assert_eq!(params.user_id, Some(user));
    }

    #[test]
    fn test_query_parses_queue_and_stage() {
        let query = ListSubmissionsQuery {
            queue: Some("unassigned".into()),
            stage: Some("copyediting".into()),
            search: Some("  ".into()),
            limit: Some(5),
            offset: Some(10),
        };
        let params = query.list_params(Uuid::nil(), 20).unwrap();
        assert_eq!(params.queue, Queue::Unassigned);
        assert_eq!(params.stage, Some(Stage::Copyediting));
        assert_eq!(params.search, None);
        assert_eq!(params.limit, 5);
        assert_eq!(params.offset, 10);
    }

    #[test]
    fn test_unknown_queue_is_validation_error() {
        let query = ListSubmissionsQuery {
            queue: Some("mine".into()),
            ..Default::default()
        };
        let err = query.list_params(Uuid::nil(), 20).unwrap_err();
        assert!(matches!(err, crate::error::AppError::Validation(_)));
    }
}

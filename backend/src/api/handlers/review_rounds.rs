//! Editor-side review round handlers.

use axum::{
    extract::{Extension, State},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::extract::{Json, Path};
use crate::api::handlers::Ack;
use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::Result;
use crate::models::review::{AssignReviewerRequest, CreateRoundRequest, ReviewRound, SubmissionReview};
use crate::services::review_service::ReviewService;

#[derive(OpenApi)]
#[openapi(
    paths(list_rounds, create_round, assign_reviewer, cancel_review),
    components(schemas(
        ReviewRoundListResponse,
        ReviewRoundResponse,
        ReviewAssignmentResponse,
        ReviewRound,
        SubmissionReview,
        CreateRoundRequest,
        AssignReviewerRequest,
    ))
)]
pub struct ReviewRoundsApiDoc;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/submissions/:id/review-rounds", get(list_rounds).post(create_round))
        .route("/review-rounds/:id/reviewers", post(assign_reviewer))
        .route("/reviews/:id/cancel", post(cancel_review))
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRoundListResponse {
    pub ok: bool,
    pub review_rounds: Vec<ReviewRound>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRoundResponse {
    pub ok: bool,
    pub review_round: ReviewRound,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewAssignmentResponse {
    pub ok: bool,
    pub assignment: SubmissionReview,
}

/// GET /api/editor/submissions/:id/review-rounds
#[utoipa::path(
    get,
    path = "/submissions/{id}/review-rounds",
    context_path = "/api/editor",
    tag = "review",
    operation_id = "list_review_rounds",
    params(("id" = Uuid, Path, description = "Submission ID")),
    responses((status = 200, description = "Rounds with their reviews", body = ReviewRoundListResponse)),
    security(("bearer_auth" = [])),
)]
pub async fn list_rounds(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReviewRoundListResponse>> {
    auth.actor().require_editor()?;
    let review_rounds = ReviewService::rounds_for_submission(&state.db, id).await?;
    Ok(Json(ReviewRoundListResponse {
        ok: true,
        review_rounds,
    }))
}

/// POST /api/editor/submissions/:id/review-rounds
#[utoipa::path(
    post,
    path = "/submissions/{id}/review-rounds",
    context_path = "/api/editor",
    tag = "review",
    operation_id = "create_review_round",
    params(("id" = Uuid, Path, description = "Submission ID")),
    request_body = CreateRoundRequest,
    responses((status = 200, description = "Round opened", body = ReviewRoundResponse)),
    security(("bearer_auth" = [])),
)]
pub async fn create_round(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateRoundRequest>,
) -> Result<Json<ReviewRoundResponse>> {
    let service = ReviewService::new(state.db.clone(), state.storage.clone());
    let review_round = service.create_round(id, payload, &auth.actor()).await?;
    Ok(Json(ReviewRoundResponse {
        ok: true,
        review_round,
    }))
}

/// POST /api/editor/review-rounds/:id/reviewers
#[utoipa::path(
    post,
    path = "/review-rounds/{id}/reviewers",
    context_path = "/api/editor",
    tag = "review",
    operation_id = "assign_reviewer",
    params(("id" = Uuid, Path, description = "Review round ID")),
    request_body = AssignReviewerRequest,
    responses(
        (status = 200, description = "Reviewer invited", body = ReviewAssignmentResponse),
        (status = 409, description = "Round closed or reviewer already assigned"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn assign_reviewer(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(round_id): Path<Uuid>,
    Json(payload): Json<AssignReviewerRequest>,
) -> Result<Json<ReviewAssignmentResponse>> {
    let service = ReviewService::new(state.db.clone(), state.storage.clone());
    let assignment = service
        .assign_reviewer(round_id, payload, &auth.actor())
        .await?;
    Ok(Json(ReviewAssignmentResponse {
        ok: true,
        assignment,
    }))
}

/// POST /api/editor/reviews/:id/cancel
#[utoipa::path(
    post,
    path = "/reviews/{id}/cancel",
    context_path = "/api/editor",
    tag = "review",
    operation_id = "cancel_review",
    params(("id" = Uuid, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Review request cancelled", body = Ack),
        (status = 409, description = "Review already finished"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn cancel_review(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(review_id): Path<Uuid>,
) -> Result<Json<Ack>> {
    let service = ReviewService::new(state.db.clone(), state.storage.clone());
    service.cancel(review_id, &auth.actor()).await?;
    Ok(Json(Ack::new()))
}

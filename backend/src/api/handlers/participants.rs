//! Submission participant handlers.

use axum::{
    extract::{Extension, State},
    routing::{delete, get},
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
use crate::models::participant::{AssignParticipantRequest, Participant};
use crate::services::participant_service::ParticipantService;

#[derive(OpenApi)]
#[openapi(
    paths(list_participants, assign_participant, remove_participant),
    components(schemas(ParticipantListResponse, ParticipantResponse, Participant, AssignParticipantRequest))
)]
pub struct ParticipantsApiDoc;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/submissions/:id/participants",
            get(list_participants).post(assign_participant),
        )
        .route(
            "/submissions/:id/participants/:participant_id",
            delete(remove_participant),
        )
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantListResponse {
    pub ok: bool,
    pub participants: Vec<Participant>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantResponse {
    pub ok: bool,
    pub participant: Participant,
}

/// GET /api/editor/submissions/:id/participants
#[utoipa::path(
    get,
    path = "/submissions/{id}/participants",
    context_path = "/api/editor",
    tag = "participants",
    operation_id = "list_participants",
    params(("id" = Uuid, Path, description = "Submission ID")),
    responses((status = 200, description = "Participants", body = ParticipantListResponse)),
    security(("bearer_auth" = [])),
)]
pub async fn list_participants(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<Json<ParticipantListResponse>> {
    auth.actor().require_editor()?;
    let service = ParticipantService::new(state.db.clone());
    let participants = service.list(id).await?;
    Ok(Json(ParticipantListResponse {
        ok: true,
        participants,
    }))
}

/// POST /api/editor/submissions/:id/participants
#[utoipa::path(
    post,
    path = "/submissions/{id}/participants",
    context_path = "/api/editor",
    tag = "participants",
    operation_id = "assign_participant",
    params(("id" = Uuid, Path, description = "Submission ID")),
    request_body = AssignParticipantRequest,
    responses(
        (status = 200, description = "Participant assigned", body = ParticipantResponse),
        (status = 409, description = "Role already held on the stage"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn assign_participant(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignParticipantRequest>,
) -> Result<Json<ParticipantResponse>> {
    let service = ParticipantService::new(state.db.clone());
    let participant = service.assign(id, payload, &auth.actor()).await?;
    Ok(Json(ParticipantResponse {
        ok: true,
        participant,
    }))
}

/// DELETE /api/editor/submissions/:id/participants/:participant_id
#[utoipa::path(
    delete,
    path = "/submissions/{id}/participants/{participant_id}",
    context_path = "/api/editor",
    tag = "participants",
    operation_id = "remove_participant",
    params(
        ("id" = Uuid, Path, description = "Submission ID"),
        ("participant_id" = Uuid, Path, description = "Participant ID"),
    ),
    responses(
        (status = 200, description = "Participant removed", body = Ack),
        (status = 404, description = "Participant not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn remove_participant(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path((id, participant_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Ack>> {
    let service = ParticipantService::new(state.db.clone());
    service.remove(id, participant_id, &auth.actor()).await?;
    Ok(Json(Ack::new()))
}

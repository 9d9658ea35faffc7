//! Editorial discussion handlers.

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
use crate::models::query::{AddNoteRequest, CreateQueryRequest, QueryNote, SubmissionQuery};
use crate::services::query_service::QueryService;

#[derive(OpenApi)]
#[openapi(
    paths(list_queries, create_query, add_note, close_query),
    components(schemas(
        QueryListResponse,
        QueryResponse,
        NoteResponse,
        SubmissionQuery,
        QueryNote,
        CreateQueryRequest,
        AddNoteRequest,
    ))
)]
pub struct QueriesApiDoc;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/submissions/:id/queries", get(list_queries).post(create_query))
        .route("/submissions/:id/queries/:query_id/notes", post(add_note))
        .route("/submissions/:id/queries/:query_id/close", post(close_query))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QueryListResponse {
    pub ok: bool,
    pub queries: Vec<SubmissionQuery>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QueryResponse {
    pub ok: bool,
    pub query: SubmissionQuery,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NoteResponse {
    pub ok: bool,
    pub note: QueryNote,
}

/// GET /api/editor/submissions/:id/queries
#[utoipa::path(
    get,
    path = "/submissions/{id}/queries",
    context_path = "/api/editor",
    tag = "discussions",
    operation_id = "list_queries",
    params(("id" = Uuid, Path, description = "Submission ID")),
    responses((status = 200, description = "Discussions with notes", body = QueryListResponse)),
    security(("bearer_auth" = [])),
)]
pub async fn list_queries(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<Json<QueryListResponse>> {
    auth.actor().require_editor()?;
    let queries = QueryService::new(state.db.clone()).list(id).await?;
    Ok(Json(QueryListResponse { ok: true, queries }))
}

/// POST /api/editor/submissions/:id/queries
#[utoipa::path(
    post,
    path = "/submissions/{id}/queries",
    context_path = "/api/editor",
    tag = "discussions",
    operation_id = "create_query",
    params(("id" = Uuid, Path, description = "Submission ID")),
    request_body = CreateQueryRequest,
    responses((status = 200, description = "Discussion opened", body = QueryResponse)),
    security(("bearer_auth" = [])),
)]
pub async fn create_query(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateQueryRequest>,
) -> Result<Json<QueryResponse>> {
    let query = QueryService::new(state.db.clone())
        .create(id, payload, &auth.actor())
        .await?;
    Ok(Json(QueryResponse { ok: true, query }))
}

/// POST /api/editor/submissions/:id/queries/:query_id/notes
#[utoipa::path(
    post,
    path = "/submissions/{id}/queries/{query_id}/notes",
    context_path = "/api/editor",
    tag = "discussions",
    operation_id = "add_query_note",
    params(
        ("id" = Uuid, Path, description = "Submission ID"),
        ("query_id" = Uuid, Path, description = "Query ID"),
    ),
    request_body = AddNoteRequest,
    responses(
        (status = 200, description = "Note added", body = NoteResponse),
        (status = 409, description = "Discussion is closed"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn add_note(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path((id, query_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<AddNoteRequest>,
) -> Result<Json<NoteResponse>> {
    let note = QueryService::new(state.db.clone())
        .add_note(id, query_id, payload, &auth.actor())
        .await?;
    Ok(Json(NoteResponse { ok: true, note }))
}

/// POST /api/editor/submissions/:id/queries/:query_id/close
#[utoipa::path(
    post,
    path = "/submissions/{id}/queries/{query_id}/close",
    context_path = "/api/editor",
    tag = "discussions",
    operation_id = "close_query",
    params(
        ("id" = Uuid, Path, description = "Submission ID"),
        ("query_id" = Uuid, Path, description = "Query ID"),
    ),
    responses((status = 200, description = "Discussion closed", body = Ack)),
    security(("bearer_auth" = [])),
)]
pub async fn close_query(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path((id, query_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Ack>> {
    QueryService::new(state.db.clone())
        .close(id, query_id, &auth.actor())
        .await?;
    Ok(Json(Ack::new()))
}

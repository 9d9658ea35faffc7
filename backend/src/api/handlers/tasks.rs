//! Editor task queue handlers.

use axum::{
    extract::{Extension, State},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::extract::{Json, Path, Query};
use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::Result;
use crate::models::task::{CreateTaskRequest, SubmissionTask, TaskFilter, TaskPatch};
use crate::services::task_service::TaskService;

#[derive(OpenApi)]
#[openapi(
    paths(list_tasks, create_task, get_task, update_task),
    components(schemas(TaskListResponse, TaskResponse, SubmissionTask, TaskPatch, CreateTaskRequest))
)]
pub struct TasksApiDoc;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/:id", get(get_task).patch(update_task))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    /// open (default), completed or all
    pub status: Option<String>,
    /// Defaults to the caller
    pub assignee_id: Option<Uuid>,
}

impl ListTasksQuery {
    pub fn filter(&self) -> Result<TaskFilter> {
        match self.status.as_deref() {
            Some(raw) if !raw.is_empty() => Ok(raw.parse::<TaskFilter>()?),
            _ => Ok(TaskFilter::default()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskListResponse {
    pub ok: bool,
    pub tasks: Vec<SubmissionTask>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskResponse {
    pub ok: bool,
    pub task: SubmissionTask,
}

/// GET /api/editor/tasks
#[utoipa::path(
    get,
    path = "/tasks",
    context_path = "/api/editor",
    tag = "tasks",
    operation_id = "list_tasks",
    params(ListTasksQuery),
    responses(
        (status = 200, description = "Tasks, newest first", body = TaskListResponse),
        (status = 400, description = "Unknown status filter"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn list_tasks(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<TaskListResponse>> {
    let filter = query.filter()?;
    let assignee = query.assignee_id.unwrap_or(auth.user_id);
    let service = TaskService::new(state.db.clone());
    let tasks = service
        .list(Some(assignee), filter, state.config.task_list_limit)
        .await?;
    Ok(Json(TaskListResponse { ok: true, tasks }))
}

/// POST /api/editor/tasks
#[utoipa::path(
    post,
    path = "/tasks",
    context_path = "/api/editor",
    tag = "tasks",
    operation_id = "create_task",
    request_body = CreateTaskRequest,
    responses(
        (status = 200, description = "Task created", body = TaskResponse),
        (status = 403, description = "Editor role required"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn create_task(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<Json<TaskResponse>> {
    let service = TaskService::new(state.db.clone());
    let task = service.create(payload, &auth.actor()).await?;
    Ok(Json(TaskResponse { ok: true, task }))
}

/// GET /api/editor/tasks/:id
#[utoipa::path(
    get,
    path = "/tasks/{id}",
    context_path = "/api/editor",
    tag = "tasks",
    operation_id = "get_task",
    params(("id" = Uuid, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task", body = TaskResponse),
        (status = 404, description = "Task not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn get_task(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskResponse>> {
    let service = TaskService::new(state.db.clone());
    let task = service.get(id).await?;
    Ok(Json(TaskResponse { ok: true, task }))
}

/// PATCH /api/editor/tasks/:id - complete, reopen, claim, reschedule
#[utoipa::path(
    patch,
    path = "/tasks/{id}",
    context_path = "/api/editor",
    tag = "tasks",
    operation_id = "update_task",
    params(("id" = Uuid, Path, description = "Task ID")),
    request_body = TaskPatch,
    responses(
        (status = 200, description = "Updated task", body = TaskResponse),
        (status = 400, description = "Empty patch or invalid status"),
        (status = 403, description = "Neither an editor nor the assignee"),
        (status = 404, description = "Task not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn update_task(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TaskPatch>,
) -> Result<Json<TaskResponse>> {
    let changes = payload.validate()?;
    let service = TaskService::new(state.db.clone());
    let task = service.update(id, changes, &auth.actor()).await?;
    Ok(Json(TaskResponse { ok: true, task }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults_to_open() {
        assert_eq!(ListTasksQuery::default().filter().unwrap(), TaskFilter::Open);
        let empty = ListTasksQuery {
            status: Some(String::new()),
            assignee_id: None,
        };
        assert_eq!(empty.filter().unwrap(), TaskFilter::Open);
    }

    #[test]
    fn test_filter_all_and_completed() {
        let all = ListTasksQuery {
            status: Some("all".into()),
            assignee_id: None,
        };
        assert_eq!(all.filter().unwrap(), TaskFilter::All);
        let done = ListTasksQuery {
            status: Some("completed".into()),
            assignee_id: None,
        };
        assert_eq!(done.filter().unwrap(), TaskFilter::Completed);
    }

    #[test]
    fn test_unknown_filter_is_rejected() {
        let query = ListTasksQuery {
            status: Some("overdue".into()),
            assignee_id: None,
        };
        assert!(query.filter().is_err());
    }
}

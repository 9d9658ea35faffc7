//! Editor task queue.
//!
//! Tasks are claimed, completed and reopened through a single partial
//! update. Concurrent updates are not arbitrated: the last write wins.

use serde_json::json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::activity::category;
use crate::models::task::{CreateTaskRequest, SubmissionTask, TaskChanges, TaskFilter, TaskStatus};
use crate::models::user::Actor;
use crate::services::activity_service::ActivityService;
use crate::services::metrics_service;

const TASK_COLUMNS: &str = r#"
    t.id, t.submission_id, s.title AS submission_title, t.stage, t.title, t.status,
    t.assignee_id, t.due_date, t.created_at, t.updated_at
"#;

pub struct TaskService {
    db: PgPool,
}

impl TaskService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List tasks newest first.
    ///
    /// When the caller's own open queue is empty the unassigned open tasks
    /// are returned instead, so there is something to claim.
    pub async fn list(
        &self,
        assignee_id: Option<Uuid>,
        filter: TaskFilter,
        limit: i64,
    ) -> Result<Vec<SubmissionTask>> {
        let sql = format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM submission_tasks t
            LEFT JOIN submissions s ON s.id = t.submission_id
            WHERE ($1::uuid IS NULL OR t.assignee_id = $1)
              AND ($2::text IS NULL OR t.status = $2)
            ORDER BY t.created_at DESC
            LIMIT $3
            "#
        );
        let tasks: Vec<SubmissionTask> = sqlx::query_as(&sql)
            .bind(assignee_id)
            .bind(filter.status())
            .bind(limit)
            .fetch_all(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if should_fall_back(assignee_id, filter, tasks.len()) {
            return self.list_unassigned_open(limit).await;
        }

        Ok(tasks)
    }

    async fn list_unassigned_open(&self, limit: i64) -> Result<Vec<SubmissionTask>> {
        let sql = format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM submission_tasks t
            LEFT JOIN submissions s ON s.id = t.submission_id
            WHERE t.assignee_id IS NULL AND t.status = 'open'
            ORDER BY t.created_at DESC
            LIMIT $1
            "#
        );
        let tasks: Vec<SubmissionTask> = sqlx::query_as(&sql)
            .bind(limit)
            .fetch_all(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(tasks)
    }

    pub async fn get(&self, id: Uuid) -> Result<SubmissionTask> {
        let sql = format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM submission_tasks t
            LEFT JOIN submissions s ON s.id = t.submission_id
            WHERE t.id = $1
            "#
        );
        sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound("Task not found".to_string()))
    }

    /// Apply a validated patch and log it to the submission's activity.
    pub async fn update(
        &self,
        id: Uuid,
        changes: TaskChanges,
        actor: &Actor,
    ) -> Result<SubmissionTask> {
        let task = self.get(id).await?;
        check_can_update(&task, actor)?;

        sqlx::query(
            r#"
            UPDATE submission_tasks SET
                status = COALESCE($2, status),
                assignee_id = CASE WHEN $3 THEN $4 ELSE assignee_id END,
                due_date = CASE WHEN $5 THEN $6 ELSE due_date END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(changes.status)
        .bind(changes.assignee_id.is_some())
        .bind(changes.assignee_id.flatten())
        .bind(changes.due_date.is_some())
        .bind(changes.due_date.flatten())
        .execute(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let message = changes.describe(&task.title);
        ActivityService::new(self.db.clone())
            .record(
                task.submission_id,
                actor.user_id,
                category::TASKS,
                &message,
                json!({
                    "taskId": id,
                    "status": changes.status,
                    "assigneeId": changes.assignee_id,
                    "dueDate": changes.due_date,
                }),
            )
            .await?;

        let updated = self.get(id).await?;
        metrics_service::record_task_update(updated.status.as_str());
        info!(task_id = %id, actor = %actor.user_id, status = %updated.status, "Task updated");

        Ok(updated)
    }

    pub async fn create(&self, req: CreateTaskRequest, actor: &Actor) -> Result<SubmissionTask> {
        actor.require_editor()?;

        let title = req.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Task title is required".to_string()));
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM submissions WHERE id = $1)")
                .bind(req.submission_id)
                .fetch_one(&self.db)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        if !exists {
            return Err(AppError::NotFound("Submission not found".to_string()));
        }

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO submission_tasks (submission_id, stage, title, status, assignee_id, due_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(req.submission_id)
        .bind(req.stage)
        .bind(title)
        .bind(TaskStatus::Open)
        .bind(req.assignee_id)
        .bind(req.due_date)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        ActivityService::new(self.db.clone())
            .record(
                req.submission_id,
                actor.user_id,
                category::TASKS,
                &format!("Task \"{}\" created.", title),
                json!({ "taskId": id, "assigneeId": req.assignee_id }),
            )
            .await?;

        info!(task_id = %id, submission_id = %req.submission_id, "Task created");
        self.get(id).await
    }
}

/// Editors may update any task, everyone else only tasks assigned to them.
pub fn check_can_update(task: &SubmissionTask, actor: &Actor) -> Result<()> {
    if actor.is_editor() || task.assignee_id == Some(actor.user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You do not have permission to update this task".to_string(),
        ))
    }
}

fn should_fall_back(assignee_id: Option<Uuid>, filter: TaskFilter, found: usize) -> bool {
    assignee_id.is_some() && filter == TaskFilter::Open && found == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::submission::Stage;
    use chrono::Utc;

    fn task(assignee_id: Option<Uuid>) -> SubmissionTask {
        SubmissionTask {
            id: Uuid::new_v4(),
            submission_id: Uuid::new_v4(),
            submission_title: None,
            stage: Stage::Copyediting,
            title: "Copyedit manuscript".into(),
            status: TaskStatus::Open,
            assignee_id,
            due_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_editor_can_update_any_task() {
        let editor = Actor::new(Uuid::new_v4(), vec!["section_editor".into()]);
        assert!(check_can_update(&task(None), &editor).is_ok());
        assert!(check_can_update(&task(Some(Uuid::new_v4())), &editor).is_ok());
    }

    #[test]
    fn test_assignee_can_update_own_task() {
        let user = Uuid::new_v4();
        let actor = Actor::new(user, vec!["reviewer".into()]);
        assert!(check_can_update(&task(Some(user)), &actor).is_ok());
    }

    #[test]
    fn test_non_editor_cannot_update_others_task() {
        let actor = Actor::new(Uuid::new_v4(), vec!["author".into()]);
        let err = check_can_update(&task(Some(Uuid::new_v4())), &actor).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(check_can_update(&task(None), &actor).is_err());
    }

    #[test]
    fn test_fallback_only_for_empty_open_queue() {
        let user = Some(Uuid::new_v4());
        assert!(should_fall_back(user, TaskFilter::Open, 0));
        assert!(!should_fall_back(user, TaskFilter::Open, 3));
        assert!(!should_fall_back(user, TaskFilter::Completed, 0));
        assert!(!should_fall_back(user, TaskFilter::All, 0));
        assert!(!should_fall_back(None, TaskFilter::Open, 0));
    }
}

//! Submission queues, dashboard counters and workflow changes.

use serde_json::json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::activity::category;
use crate::models::participant::EDITOR_PARTICIPANT_ROLES;
use crate::models::submission::{
    DashboardStats, Queue, Stage, SubmissionDetail, SubmissionSummary, WorkflowChange,
};
use crate::models::user::Actor;
use crate::services::activity_service::ActivityService;
use crate::services::file_service::FileService;
use crate::services::participant_service::ParticipantService;
use crate::services::query_service::QueryService;
use crate::services::review_service::ReviewService;

pub const MAX_PAGE_SIZE: i64 = 100;
const DETAIL_FILE_LIMIT: i64 = 50;
const DETAIL_ACTIVITY_LIMIT: i64 = 20;

const SUMMARY_COLUMNS: &str = r#"
    s.id, s.title, s.journal_id, j.title AS journal_title, s.current_stage, s.status,
    s.is_archived, s.submitted_at, s.updated_at,
    s.metadata->>'author_name' AS author_name,
    COALESCE(
        (SELECT array_agg(DISTINCT p.user_id) FROM submission_participants p
         WHERE p.submission_id = s.id AND p.role = ANY($1)),
        '{}'::uuid[]
    ) AS assignees
"#;

/// Listing parameters for a submission queue.
#[derive(Debug, Clone)]
pub struct SubmissionListParams {
    pub queue: Queue,
    pub stage: Option<Stage>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
    pub user_id: Option<Uuid>,
}

pub struct SubmissionService {
    db: PgPool,
}

impl SubmissionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, params: &SubmissionListParams) -> Result<Vec<SubmissionSummary>> {
        let mine_only = params.queue == Queue::My;
        if mine_only && params.user_id.is_none() {
            return Err(AppError::Unauthorized(
                "Sign in to view your queue".to_string(),
            ));
        }

        let sql = format!(
            r#"
            SELECT {SUMMARY_COLUMNS}
            FROM submissions s
            LEFT JOIN journals j ON j.id = s.journal_id
            WHERE s.is_archived = $2
              AND ($3::text IS NULL OR s.current_stage = $3)
              AND ($4::text IS NULL OR s.title ILIKE $4 ESCAPE '\')
              AND (NOT $5 OR EXISTS (
                    SELECT 1 FROM submission_participants p
                    WHERE p.submission_id = s.id AND p.user_id = $6 AND p.role = ANY($1)))
              AND (NOT $7 OR NOT EXISTS (
                    SELECT 1 FROM submission_participants p
                    WHERE p.submission_id = s.id AND p.role = ANY($1)))
            ORDER BY s.updated_at DESC
            LIMIT $8 OFFSET $9
            "#
        );

        let submissions: Vec<SubmissionSummary> = sqlx::query_as(&sql)
            .bind(&EDITOR_PARTICIPANT_ROLES[..])
            .bind(params.queue == Queue::Archived)
            .bind(params.stage)
            .bind(params.search.as_deref().map(like_pattern))
            .bind(mine_only)
            .bind(params.user_id)
            .bind(params.queue == Queue::Unassigned)
            .bind(params.limit.clamp(1, MAX_PAGE_SIZE))
            .bind(params.offset.max(0))
            .fetch_all(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(submissions)
    }

    /// Queue and stage counters for the dashboard, in one round trip.
    pub async fn dashboard_stats(&self, user_id: Uuid) -> Result<DashboardStats> {
        let stats: DashboardStats = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE NOT s.is_archived AND EXISTS (
                    SELECT 1 FROM submission_participants p
                    WHERE p.submission_id = s.id AND p.user_id = $1 AND p.role = ANY($2)
                )) AS my_queue,
                COUNT(*) FILTER (WHERE NOT s.is_archived AND NOT EXISTS (
                    SELECT 1 FROM submission_participants p
                    WHERE p.submission_id = s.id AND p.role = ANY($2)
                )) AS unassigned,
                COUNT(*) FILTER (WHERE NOT s.is_archived AND s.current_stage = 'submission') AS submission,
                COUNT(*) FILTER (WHERE NOT s.is_archived AND s.current_stage = 'review') AS in_review,
                COUNT(*) FILTER (WHERE NOT s.is_archived AND s.current_stage = 'copyediting') AS copyediting,
                COUNT(*) FILTER (WHERE NOT s.is_archived AND s.current_stage = 'production') AS production,
                COUNT(*) FILTER (WHERE NOT s.is_archived) AS all_active,
                COUNT(*) FILTER (WHERE s.is_archived) AS archived,
                (SELECT COUNT(*) FROM submission_tasks t
                 WHERE t.assignee_id = $1 AND t.status = 'open') AS tasks
            FROM submissions s
            "#,
        )
        .bind(user_id)
        .bind(&EDITOR_PARTICIPANT_ROLES[..])
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(stats)
    }

    pub async fn summary(&self, id: Uuid) -> Result<(SubmissionSummary, serde_json::Value)> {
        let sql = format!(
            r#"
            SELECT {SUMMARY_COLUMNS}
            FROM submissions s
            LEFT JOIN journals j ON j.id = s.journal_id
            WHERE s.id = $2
            "#
        );
        let summary: SubmissionSummary = sqlx::query_as(&sql)
            .bind(&EDITOR_PARTICIPANT_ROLES[..])
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound("Submission not found".to_string()))?;

        let metadata: sqlx::types::Json<serde_json::Value> =
            sqlx::query_scalar("SELECT metadata FROM submissions WHERE id = $1")
                .bind(id)
                .fetch_one(&self.db)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((summary, metadata.0))
    }

    pub async fn detail(&self, id: Uuid) -> Result<SubmissionDetail> {
        let (summary, metadata) = self.summary(id).await?;

        let participants = ParticipantService::new(self.db.clone());
        let activity = ActivityService::new(self.db.clone());
        let queries = QueryService::new(self.db.clone());
        let (participants, files, activity, review_rounds, queries) = futures::try_join!(
            participants.list(id),
            FileService::list_recent(&self.db, id, DETAIL_FILE_LIMIT),
            activity.recent(id, DETAIL_ACTIVITY_LIMIT),
            ReviewService::rounds_for_submission(&self.db, id),
            queries.list(id),
        )?;

        Ok(SubmissionDetail {
            summary,
            metadata,
            participants,
            files,
            activity,
            review_rounds,
            queries,
        })
    }

    /// Move a submission between stages, change its status, or log a note.
    pub async fn update_workflow(
        &self,
        id: Uuid,
        change: WorkflowChange,
        actor: &Actor,
    ) -> Result<()> {
        actor.require_editor()?;

        let result = sqlx::query(
            r#"
            UPDATE submissions SET
                current_stage = COALESCE($2, current_stage),
                status = COALESCE($3, status),
                is_archived = CASE WHEN $3::text IS NULL THEN is_archived ELSE $3 = 'archived' END,
                updated_at = CASE WHEN $2::text IS NULL AND $3::text IS NULL THEN updated_at ELSE NOW() END
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(change.target_stage)
        .bind(change.status)
        .execute(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Submission not found".to_string()));
        }

        ActivityService::new(self.db.clone())
            .record(
                id,
                actor.user_id,
                category::WORKFLOW,
                &change.message(),
                json!({
                    "targetStage": change.target_stage,
                    "status": change.status,
                }),
            )
            .await?;

        info!(submission_id = %id, stage = ?change.target_stage, status = ?change.status, "Workflow updated");
        Ok(())
    }
}

/// `ILIKE` pattern matching `search` anywhere, with wildcards escaped.
pub fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_wraps_search() {
        assert_eq!(like_pattern("climate"), "%climate%");
        assert_eq!(like_pattern("  climate "), "%climate%");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("100%_sure"), "%100\\%\\_sure%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}

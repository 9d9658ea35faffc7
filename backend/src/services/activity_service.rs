//! Submission activity log.

use serde_json::Value;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::activity::ActivityEntry;

pub struct ActivityService {
    db: PgPool,
}

impl ActivityService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Append an entry to a submission's activity log.
    pub async fn record(
        &self,
        submission_id: Uuid,
        actor_id: Uuid,
        category: &str,
        message: &str,
        metadata: Value,
    ) -> Result<()> {
        Self::record_with(&self.db, submission_id, actor_id, category, message, metadata).await
    }

    /// Append an entry using any executor, e.g. an open transaction.
    pub async fn record_with<'e, E>(
        executor: E,
        submission_id: Uuid,
        actor_id: Uuid,
        category: &str,
        message: &str,
        metadata: Value,
    ) -> Result<()>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO submission_activity_logs (submission_id, actor_id, category, message, metadata)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(submission_id)
        .bind(actor_id)
        .bind(category)
        .bind(message)
        .bind(sqlx::types::Json(metadata))
        .execute(executor)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Newest entries first.
    pub async fn recent(&self, submission_id: Uuid, limit: i64) -> Result<Vec<ActivityEntry>> {
        let entries: Vec<ActivityEntry> = sqlx::query_as(
            r#"
            SELECT a.id, a.submission_id, a.category, a.message, a.metadata, a.actor_id,
                   u.display_name AS actor_name, a.created_at
            FROM submission_activity_logs a
            LEFT JOIN users u ON u.id = a.actor_id
            WHERE a.submission_id = $1
            ORDER BY a.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(submission_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(entries)
    }
}

//! Editorial discussions attached to a submission stage.

use std::collections::HashMap;

use serde_json::json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::activity::category;
use crate::models::query::{note_contents, AddNoteRequest, CreateQueryRequest, QueryNote, SubmissionQuery};
use crate::models::user::Actor;
use crate::services::activity_service::ActivityService;

const QUERY_COLUMNS: &str = r#"
    q.id, q.submission_id, q.stage, q.seq, q.date_posted, q.date_modified, q.closed,
    COALESCE(
        (SELECT array_agg(qp.user_id) FROM query_participants qp WHERE qp.query_id = q.id),
        '{}'::uuid[]
    ) AS participant_ids
"#;

pub struct QueryService {
    db: PgPool,
}

impl QueryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Queries of a submission in sequence order, each with its notes.
    pub async fn list(&self, submission_id: Uuid) -> Result<Vec<SubmissionQuery>> {
        let sql = format!(
            "SELECT {QUERY_COLUMNS} FROM queries q WHERE q.submission_id = $1 ORDER BY q.seq"
        );
        let mut queries: Vec<SubmissionQuery> = sqlx::query_as(&sql)
            .bind(submission_id)
            .fetch_all(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let notes: Vec<QueryNote> = sqlx::query_as(
            r#"
            SELECT n.id, n.query_id, n.user_id, u.display_name AS author_name,
                   n.title, n.contents, n.date_created
            FROM query_notes n
            JOIN queries q ON q.id = n.query_id
            LEFT JOIN users u ON u.id = n.user_id
            WHERE q.submission_id = $1
            ORDER BY n.date_created
            "#,
        )
        .bind(submission_id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let mut by_query: HashMap<Uuid, Vec<QueryNote>> = HashMap::new();
        for note in notes {
            by_query.entry(note.query_id).or_default().push(note);
        }
        for query in &mut queries {
            query.notes = by_query.remove(&query.id).unwrap_or_default();
        }

        Ok(queries)
    }

    /// Open a discussion with its first note. `seq` continues the
    /// submission's numbering.
    pub async fn create(
        &self,
        submission_id: Uuid,
        req: CreateQueryRequest,
        actor: &Actor,
    ) -> Result<SubmissionQuery> {
        actor.require_editor()?;
        let contents = note_contents(&req.contents)?;

        let mut tx = self.db.begin().await?;

        let query_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO queries (submission_id, stage, seq)
            SELECT $1, $2, COALESCE(MAX(seq), 0) + 1 FROM queries WHERE submission_id = $1
            RETURNING id
            "#,
        )
        .bind(submission_id)
        .bind(req.stage)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let mut participants = req.participant_ids.clone();
        if !participants.contains(&actor.user_id) {
            participants.push(actor.user_id);
        }
        sqlx::query(
            r#"
            INSERT INTO query_participants (query_id, user_id)
            SELECT $1, unnest($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(query_id)
        .bind(&participants)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        sqlx::query(
            "INSERT INTO query_notes (query_id, user_id, title, contents) VALUES ($1, $2, $3, $4)",
        )
        .bind(query_id)
        .bind(actor.user_id)
        .bind(&req.title)
        .bind(&contents)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        ActivityService::record_with(
            &mut *tx,
            submission_id,
            actor.user_id,
            category::DISCUSSION,
            &format!(
                "Opened discussion \"{}\".",
                req.title.as_deref().unwrap_or("Untitled")
            ),
            json!({ "queryId": query_id, "stage": req.stage }),
        )
        .await?;

        tx.commit().await?;
        info!(submission_id = %submission_id, query_id = %query_id, "Query opened");

        self.get(submission_id, query_id).await
    }

    async fn get(&self, submission_id: Uuid, query_id: Uuid) -> Result<SubmissionQuery> {
        self.list(submission_id)
            .await?
            .into_iter()
            .find(|q| q.id == query_id)
            .ok_or_else(|| AppError::NotFound("Query not found".to_string()))
    }

    async fn is_closed(&self, submission_id: Uuid, query_id: Uuid) -> Result<bool> {
        sqlx::query_scalar("SELECT closed FROM queries WHERE id = $1 AND submission_id = $2")
            .bind(query_id)
            .bind(submission_id)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound("Query not found".to_string()))
    }

    pub async fn add_note(
        &self,
        submission_id: Uuid,
        query_id: Uuid,
        req: AddNoteRequest,
        actor: &Actor,
    ) -> Result<QueryNote> {
        let contents = note_contents(&req.contents)?;
        if self.is_closed(submission_id, query_id).await? {
            return Err(AppError::Conflict("Query is closed".to_string()));
        }

        let note: QueryNote = sqlx::query_as(
            r#"
            WITH inserted AS (
                INSERT INTO query_notes (query_id, user_id, title, contents)
                VALUES ($1, $2, $3, $4)
                RETURNING id, query_id, user_id, title, contents, date_created
            )
            SELECT i.id, i.query_id, i.user_id, u.display_name AS author_name,
                   i.title, i.contents, i.date_created
            FROM inserted i
            LEFT JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(query_id)
        .bind(actor.user_id)
        .bind(&req.title)
        .bind(&contents)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        sqlx::query("UPDATE queries SET date_modified = NOW() WHERE id = $1")
            .bind(query_id)
            .execute(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(note)
    }

    pub async fn close(&self, submission_id: Uuid, query_id: Uuid, actor: &Actor) -> Result<()> {
        actor.require_editor()?;

        let result = sqlx::query(
            r#"
            UPDATE queries SET closed = TRUE, date_modified = NOW()
            WHERE id = $1 AND submission_id = $2
            "#,
        )
        .bind(query_id)
        .bind(submission_id)
        .execute(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Query not found".to_string()));
        }

        ActivityService::new(self.db.clone())
            .record(
                submission_id,
                actor.user_id,
                category::DISCUSSION,
                "Closed discussion.",
                json!({ "queryId": query_id }),
            )
            .await?;

        Ok(())
    }
}

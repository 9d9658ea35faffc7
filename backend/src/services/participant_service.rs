//! Submission participants (editors, authors, reviewers on a stage).

use serde_json::json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::activity::category;
use crate::models::participant::{AssignParticipantRequest, Participant};
use crate::models::user::Actor;
use crate::services::activity_service::ActivityService;

pub struct ParticipantService {
    db: PgPool,
}

impl ParticipantService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, submission_id: Uuid) -> Result<Vec<Participant>> {
        let participants: Vec<Participant> = sqlx::query_as(
            r#"
            SELECT p.id, p.submission_id, p.user_id, p.role, p.stage, p.assigned_at,
                   u.display_name, u.email
            FROM submission_participants p
            LEFT JOIN users u ON u.id = p.user_id
            WHERE p.submission_id = $1
            ORDER BY p.assigned_at
            "#,
        )
        .bind(submission_id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(participants)
    }

    pub async fn assign(
        &self,
        submission_id: Uuid,
        req: AssignParticipantRequest,
        actor: &Actor,
    ) -> Result<Participant> {
        actor.require_editor()?;
        let role = req.role()?;

        let id: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO submission_participants (submission_id, user_id, role, stage)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (submission_id, user_id, role, stage) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(submission_id)
        .bind(req.user_id)
        .bind(&role)
        .bind(req.stage)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                AppError::NotFound("Submission or user not found".to_string())
            }
            _ => AppError::Database(e.to_string()),
        })?;

        let id = id.ok_or_else(|| {
            AppError::Conflict("User already holds this role on the stage".to_string())
        })?;

        ActivityService::new(self.db.clone())
            .record(
                submission_id,
                actor.user_id,
                category::PARTICIPANTS,
                &format!("Assigned {} as {} in the {} stage.", req.user_id, role, req.stage),
                json!({ "participantId": id, "userId": req.user_id, "role": role }),
            )
            .await?;

        info!(submission_id = %submission_id, user_id = %req.user_id, role = %role, "Participant assigned");
        self.get(submission_id, id).await
    }

    async fn get(&self, submission_id: Uuid, id: Uuid) -> Result<Participant> {
        sqlx::query_as(
            r#"
            SELECT p.id, p.submission_id, p.user_id, p.role, p.stage, p.assigned_at,
                   u.display_name, u.email
            FROM submission_participants p
            LEFT JOIN users u ON u.id = p.user_id
            WHERE p.id = $1 AND p.submission_id = $2
            "#,
        )
        .bind(id)
        .bind(submission_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Participant not found".to_string()))
    }

    pub async fn remove(&self, submission_id: Uuid, participant_id: Uuid, actor: &Actor) -> Result<()> {
        actor.require_editor()?;

        let removed: Option<(Uuid, String)> = sqlx::query_as(
            r#"
            DELETE FROM submission_participants
            WHERE id = $1 AND submission_id = $2
            RETURNING user_id, role
            "#,
        )
        .bind(participant_id)
        .bind(submission_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let (user_id, role) =
            removed.ok_or_else(|| AppError::NotFound("Participant not found".to_string()))?;

        ActivityService::new(self.db.clone())
            .record(
                submission_id,
                actor.user_id,
                category::PARTICIPANTS,
                &format!("Removed {} as {}.", user_id, role),
                json!({ "participantId": participant_id, "userId": user_id }),
            )
            .await?;

        Ok(())
    }
}

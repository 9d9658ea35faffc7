//! Publication versions: create, publish or schedule, unpublish, and edit
//! version metadata.

use serde_json::{json, Value};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::activity::category;
use crate::models::publication::{
    CreateVersionRequest, MetadataPatch, PublicationVersion, PublishRequest, UnpublishRequest,
    VersionStatus,
};
use crate::models::user::Actor;
use crate::services::activity_service::ActivityService;
use crate::services::metrics_service;

const VERSION_COLUMNS: &str =
    "id, submission_id, version, status, notes, metadata, published_at, created_at";

pub struct PublicationService {
    db: PgPool,
}

impl PublicationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Versions of a submission, oldest first.
    pub async fn list(&self, submission_id: Uuid, actor: &Actor) -> Result<Vec<PublicationVersion>> {
        actor.require_editor()?;
        let sql = format!(
            "SELECT {VERSION_COLUMNS} FROM submission_versions WHERE submission_id = $1 ORDER BY version"
        );
        let versions: Vec<PublicationVersion> = sqlx::query_as(&sql)
            .bind(submission_id)
            .fetch_all(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(versions)
    }

    /// Queue the next version number for a submission.
    pub async fn create_version(
        &self,
        submission_id: Uuid,
        req: CreateVersionRequest,
        actor: &Actor,
    ) -> Result<PublicationVersion> {
        actor.require_editor()?;
        self.require_submission(submission_id).await?;
        let description = req
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());

        let mut tx = self.db.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO submission_versions (submission_id, version, status, notes)
            SELECT $1, COALESCE(MAX(version), 0) + 1, $2, $3
            FROM submission_versions
            WHERE submission_id = $1
            RETURNING {VERSION_COLUMNS}
            "#
        );
        let version: PublicationVersion = sqlx::query_as(&sql)
            .bind(submission_id)
            .bind(VersionStatus::Queued)
            .bind(description)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(
                    "Another version was created at the same time; try again".to_string(),
                ),
                other => AppError::Database(other.to_string()),
            })?;

        ActivityService::record_with(
            &mut *tx,
            submission_id,
            actor.user_id,
            category::PUBLICATION,
            &format!("Created new version {}.", version.version),
            json!({
                "versionId": version.id,
                "version": version.version,
                "description": description,
            }),
        )
        .await?;

        tx.commit().await?;
        info!(submission_id = %submission_id, version = version.version, "Publication version created");
        Ok(version)
    }

    /// Publish a version now or schedule it for `publish_date`.
    pub async fn publish(
        &self,
        submission_id: Uuid,
        req: &PublishRequest,
        actor: &Actor,
    ) -> Result<PublicationVersion> {
        actor.require_editor()?;
        let (status, published_at) = req.resolve()?;
        let version_id = match req.version_id {
            Some(id) => id,
            None => self.latest_version(submission_id).await?,
        };

        let mut tx = self.db.begin().await?;

        let sql = format!(
            r#"
            UPDATE submission_versions SET status = $3, published_at = $4
            WHERE id = $1 AND submission_id = $2
            RETURNING {VERSION_COLUMNS}
            "#
        );
        let version: PublicationVersion = sqlx::query_as(&sql)
            .bind(version_id)
            .bind(submission_id)
            .bind(status)
            .bind(published_at)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(version_not_found)?;

        ActivityService::record_with(
            &mut *tx,
            submission_id,
            actor.user_id,
            category::PUBLICATION,
            &req.activity_message(),
            json!({ "versionId": version.id, "publishDate": req.publish_date }),
        )
        .await?;

        tx.commit().await?;
        metrics_service::record_publication(status.as_str());
        info!(submission_id = %submission_id, version = version.version, status = %status, "Publication updated");
        Ok(version)
    }

    /// Return one version, or every published and scheduled version, to the
    /// queue. Returns the number of versions changed.
    pub async fn unpublish(
        &self,
        submission_id: Uuid,
        req: &UnpublishRequest,
        actor: &Actor,
    ) -> Result<u64> {
        actor.require_editor()?;

        let mut tx = self.db.begin().await?;

        let updated = match req.version_id {
            Some(version_id) => {
                let updated = sqlx::query(
                    r#"
                    UPDATE submission_versions SET status = $3, published_at = NULL
                    WHERE id = $1 AND submission_id = $2
                    "#,
                )
                .bind(version_id)
                .bind(submission_id)
                .bind(VersionStatus::Queued)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
                if updated.rows_affected() == 0 {
                    return Err(version_not_found());
                }
                updated
            }
            None => sqlx::query(
                r#"
                UPDATE submission_versions SET status = $2, published_at = NULL
                WHERE submission_id = $1 AND status = ANY($3)
                "#,
            )
            .bind(submission_id)
            .bind(VersionStatus::Queued)
            .bind(vec![
                VersionStatus::Published.as_str(),
                VersionStatus::Scheduled.as_str(),
            ])
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?,
        };

        ActivityService::record_with(
            &mut *tx,
            submission_id,
            actor.user_id,
            category::PUBLICATION,
            "Publication unpublished.",
            json!({ "versionId": req.version_id }),
        )
        .await?;

        tx.commit().await?;
        metrics_service::record_publication(VersionStatus::Queued.as_str());
        Ok(updated.rows_affected())
    }

    /// Merge `patch` into a version's metadata. Editors may edit any version;
    /// the submitting author only versions that are not published.
    pub async fn update_metadata(
        &self,
        submission_id: Uuid,
        version_id: Uuid,
        patch: MetadataPatch,
        actor: &Actor,
    ) -> Result<Value> {
        if patch.is_empty() {
            return Err(AppError::Validation("No changes submitted".to_string()));
        }

        let mut tx = self.db.begin().await?;

        let current: Option<(VersionStatus, sqlx::types::Json<Value>, Option<Uuid>)> =
            sqlx::query_as(
                r#"
                SELECT v.status, v.metadata, s.submitter_id
                FROM submission_versions v
                JOIN submissions s ON s.id = v.submission_id
                WHERE v.id = $1 AND v.submission_id = $2
                FOR UPDATE OF v
                "#,
            )
            .bind(version_id)
            .bind(submission_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let (status, metadata, submitter_id) = current.ok_or_else(version_not_found)?;

        if !actor.is_editor() {
            if submitter_id != Some(actor.user_id) {
                return Err(AppError::Forbidden("Forbidden".to_string()));
            }
            if status == VersionStatus::Published {
                return Err(AppError::Forbidden(
                    "Published versions cannot be edited. Please create a new version."
                        .to_string(),
                ));
            }
        }

        let updated = patch.apply(&metadata.0);
        sqlx::query("UPDATE submission_versions SET metadata = $2 WHERE id = $1")
            .bind(version_id)
            .bind(sqlx::types::Json(&updated))
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some(title) = patch.new_title() {
            sqlx::query("UPDATE submissions SET title = $2, updated_at = NOW() WHERE id = $1")
                .bind(submission_id)
                .bind(title)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        ActivityService::record_with(
            &mut *tx,
            submission_id,
            actor.user_id,
            category::PUBLICATION,
            "Updated publication metadata.",
            json!({ "versionId": version_id, "fields": patch.fields() }),
        )
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn latest_version(&self, submission_id: Uuid) -> Result<Uuid> {
        sqlx::query_scalar(
            "SELECT id FROM submission_versions WHERE submission_id = $1 ORDER BY version DESC LIMIT 1",
        )
        .bind(submission_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("No publication version to publish".to_string()))
    }

    async fn require_submission(&self, submission_id: Uuid) -> Result<()> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM submissions WHERE id = $1)")
                .bind(submission_id)
                .fetch_one(&self.db)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        if exists {
            Ok(())
        } else {
            Err(AppError::NotFound("Submission not found".to_string()))
        }
    }
}

fn version_not_found() -> AppError {
    AppError::NotFound("Publication version not found".to_string())
}

/// `Version N created successfully.`
pub fn created_message(version: i32) -> String {
    format!("Version {} created successfully.", version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_message() {
        assert_eq!(created_message(3), "Version 3 created successfully.");
    }

    #[test]
    fn test_version_not_found_is_404() {
        assert!(matches!(version_not_found(), AppError::NotFound(_)));
    }
}

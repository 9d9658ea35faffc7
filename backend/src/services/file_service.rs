//! Submission files: upload, copy between stages, download.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::activity::category;
use crate::models::submission::Stage;
use crate::models::submission_file::{NewSubmissionFile, SubmissionFile};
use crate::models::user::Actor;
use crate::services::activity_service::ActivityService;
use crate::services::metrics_service;
use crate::storage::StorageBackend;

const FILE_COLUMNS: &str = r#"
    id, submission_id, label, stage, file_kind, storage_path, version_label, round,
    is_visible_to_authors, file_size, uploaded_by, uploaded_at, review_round_id
"#;

/// Stages in which authors may add files to their own submission.
pub const AUTHOR_UPLOAD_STAGES: [Stage; 3] = [Stage::Submission, Stage::Review, Stage::Copyediting];

pub struct FileService {
    db: PgPool,
    storage: Arc<dyn StorageBackend>,
}

impl FileService {
    pub fn new(db: PgPool, storage: Arc<dyn StorageBackend>) -> Self {
        Self { db, storage }
    }

    pub async fn list(
        &self,
        submission_id: Uuid,
        stage: Option<Stage>,
    ) -> Result<Vec<SubmissionFile>> {
        let sql = format!(
            r#"
            SELECT {FILE_COLUMNS}
            FROM submission_files
            WHERE submission_id = $1 AND ($2::text IS NULL OR stage = $2)
            ORDER BY uploaded_at DESC
            "#
        );
        let files: Vec<SubmissionFile> = sqlx::query_as(&sql)
            .bind(submission_id)
            .bind(stage)
            .fetch_all(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(files)
    }

    /// Newest files of a submission, across stages.
    pub async fn list_recent(
        db: &PgPool,
        submission_id: Uuid,
        limit: i64,
    ) -> Result<Vec<SubmissionFile>> {
        let sql = format!(
            r#"
            SELECT {FILE_COLUMNS}
            FROM submission_files
            WHERE submission_id = $1
            ORDER BY uploaded_at DESC
            LIMIT $2
            "#
        );
        let files: Vec<SubmissionFile> = sqlx::query_as(&sql)
            .bind(submission_id)
            .bind(limit)
            .fetch_all(db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(files)
    }

    /// Files attached to a review round, plus the submission's review stage files.
    pub async fn for_review_round(
        db: &PgPool,
        submission_id: Uuid,
        review_round_id: Uuid,
    ) -> Result<Vec<SubmissionFile>> {
        let sql = format!(
            r#"
            SELECT {FILE_COLUMNS}
            FROM submission_files
            WHERE submission_id = $1 AND (review_round_id = $2 OR stage = 'review')
            ORDER BY uploaded_at DESC
            "#
        );
        let files: Vec<SubmissionFile> = sqlx::query_as(&sql)
            .bind(submission_id)
            .bind(review_round_id)
            .fetch_all(db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(files)
    }

    pub async fn get(&self, submission_id: Uuid, file_id: Uuid) -> Result<SubmissionFile> {
        let sql = format!(
            "SELECT {FILE_COLUMNS} FROM submission_files WHERE id = $1 AND submission_id = $2"
        );
        sqlx::query_as(&sql)
            .bind(file_id)
            .bind(submission_id)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))
    }

    /// Store an uploaded file and record it against the submission.
    ///
    /// The stored object is removed again when the row cannot be written.
    pub async fn upload(
        &self,
        submission_id: Uuid,
        file: NewSubmissionFile,
        content: Bytes,
        actor: &Actor,
    ) -> Result<SubmissionFile> {
        actor.require_editor()?;
        self.store(submission_id, file, content, actor).await
    }

    /// Author upload to their own submission. Files are always visible to
    /// authors and limited to the early stages.
    pub async fn upload_as_author(
        &self,
        submission_id: Uuid,
        mut file: NewSubmissionFile,
        content: Bytes,
        actor: &Actor,
    ) -> Result<SubmissionFile> {
        let current_stage = self.require_own_submission(submission_id, actor).await?;
        if !AUTHOR_UPLOAD_STAGES.contains(&current_stage) {
            return Err(AppError::Forbidden(format!(
                "File upload not allowed at {} stage",
                current_stage
            )));
        }
        file.is_visible_to_authors = true;
        file.round = 1;
        file.review_round_id = None;
        self.store(submission_id, file, content, actor).await
    }

    async fn store(
        &self,
        submission_id: Uuid,
        file: NewSubmissionFile,
        content: Bytes,
        actor: &Actor,
    ) -> Result<SubmissionFile> {
        let label = file.label.trim().to_string();
        if label.is_empty() {
            return Err(AppError::Validation("File label is required".to_string()));
        }
        if content.is_empty() {
            return Err(AppError::Validation("File is empty".to_string()));
        }
        self.require_submission(submission_id).await?;

        let key = storage_key(
            submission_id,
            file.stage,
            Utc::now().timestamp_millis(),
            Uuid::new_v4(),
            &label,
            &file.original_name,
        );
        let size = content.len() as i64;
        self.storage.put(&key, content).await?;

        let sql = format!(
            r#"
            INSERT INTO submission_files
                (submission_id, label, stage, file_kind, storage_path, version_label, round,
                 is_visible_to_authors, file_size, uploaded_by, review_round_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {FILE_COLUMNS}
            "#
        );
        let inserted: std::result::Result<SubmissionFile, sqlx::Error> = sqlx::query_as(&sql)
            .bind(submission_id)
            .bind(&label)
            .bind(file.stage)
            .bind(&file.kind)
            .bind(&key)
            .bind(&file.version_label)
            .bind(file.round)
            .bind(file.is_visible_to_authors)
            .bind(size)
            .bind(actor.user_id)
            .bind(file.review_round_id)
            .fetch_one(&self.db)
            .await;

        let record = match inserted {
            Ok(record) => record,
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&key).await {
                    warn!(key = %key, error = %cleanup, "Failed to remove orphaned upload");
                }
                return Err(AppError::Database(e.to_string()));
            }
        };

        ActivityService::new(self.db.clone())
            .record(
                submission_id,
                actor.user_id,
                category::FILES,
                &format!("Uploaded \"{}\" to the {} stage.", label, file.stage),
                json!({ "fileId": record.id, "stage": file.stage, "kind": file.kind }),
            )
            .await?;

        info!(submission_id = %submission_id, file_id = %record.id, size = size, "File uploaded");
        Ok(record)
    }

    /// Copy files into another stage. The copies share the stored object.
    pub async fn copy(
        &self,
        submission_id: Uuid,
        file_ids: &[Uuid],
        target_stage: Stage,
        actor: &Actor,
    ) -> Result<Vec<SubmissionFile>> {
        actor.require_editor()?;
        if file_ids.is_empty() {
            return Err(AppError::Validation("No files selected".to_string()));
        }

        let sql = format!(
            r#"
            SELECT {FILE_COLUMNS}
            FROM submission_files
            WHERE submission_id = $1 AND id = ANY($2)
            ORDER BY uploaded_at
            "#
        );
        let sources: Vec<SubmissionFile> = sqlx::query_as(&sql)
            .bind(submission_id)
            .bind(file_ids)
            .fetch_all(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if sources.is_empty() {
            return Err(AppError::NotFound("Files not found".to_string()));
        }

        let mut tx = self.db.begin().await?;
        let insert_sql = format!(
            r#"
            INSERT INTO submission_files
                (submission_id, label, stage, file_kind, storage_path, version_label, round,
                 is_visible_to_authors, file_size, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {FILE_COLUMNS}
            "#
        );
        let mut copied = Vec::with_capacity(sources.len());
        for source in &sources {
            let copy: SubmissionFile = sqlx::query_as(&insert_sql)
                .bind(submission_id)
                .bind(&source.label)
                .bind(target_stage)
                .bind(&source.kind)
                .bind(&source.storage_path)
                .bind(&source.version_label)
                .bind(source.round)
                .bind(source.is_visible_to_authors)
                .bind(source.size)
                .bind(actor.user_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            copied.push(copy);
        }

        let message = copy_message(copied.len(), target_stage);
        ActivityService::record_with(
            &mut *tx,
            submission_id,
            actor.user_id,
            category::FILES,
            &message,
            json!({
                "fileIds": sources.iter().map(|f| f.id).collect::<Vec<_>>(),
                "targetStage": target_stage,
            }),
        )
        .await?;
        tx.commit().await?;

        metrics_service::record_files_copied(copied.len() as u64);
        info!(submission_id = %submission_id, count = copied.len(), stage = %target_stage, "Files copied");
        Ok(copied)
    }

    /// File record and its stored bytes.
    pub async fn download(
        &self,
        submission_id: Uuid,
        file_id: Uuid,
    ) -> Result<(SubmissionFile, Bytes)> {
        let file = self.get(submission_id, file_id).await?;
        let content = self.storage.get(&file.storage_path).await?;
        Ok((file, content))
    }

    /// Files an author may see on their own submission.
    pub async fn author_files(
        &self,
        submission_id: Uuid,
        actor: &Actor,
    ) -> Result<Vec<SubmissionFile>> {
        self.require_own_submission(submission_id, actor).await?;

        let sql = format!(
            r#"
            SELECT {FILE_COLUMNS}
            FROM submission_files
            WHERE submission_id = $1 AND (is_visible_to_authors OR stage = 'submission')
            ORDER BY uploaded_at DESC
            "#
        );
        let files: Vec<SubmissionFile> = sqlx::query_as(&sql)
            .bind(submission_id)
            .fetch_all(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(files)
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

    /// Current stage of a submission owned by `actor`.
    async fn require_own_submission(&self, submission_id: Uuid, actor: &Actor) -> Result<Stage> {
        let row: Option<(Option<Uuid>, Stage)> =
            sqlx::query_as("SELECT submitter_id, current_stage FROM submissions WHERE id = $1")
                .bind(submission_id)
                .fetch_optional(&self.db)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            None => Err(AppError::NotFound("Submission not found".to_string())),
            Some((submitter, _)) if submitter != Some(actor.user_id) => Err(AppError::Forbidden(
                "You can only access files of your own submissions".to_string(),
            )),
            Some((_, stage)) => Ok(stage),
        }
    }
}

/// Replace everything outside `[A-Za-z0-9.-]` with `_`.
pub fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Extension of the original file name, `bin` when there is none.
pub fn file_extension(original_name: &str) -> String {
    original_name
        .rsplit_once('.')
        .map(|(_, ext)| sanitize_label(ext))
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "bin".to_string())
}

/// `submissions/{submission}/{stage}/{millis}-{nonce}-{label}.{ext}`
pub fn storage_key(
    submission_id: Uuid,
    stage: Stage,
    millis: i64,
    nonce: Uuid,
    label: &str,
    original_name: &str,
) -> String {
    format!(
        "submissions/{}/{}/{}-{}-{}.{}",
        submission_id,
        stage,
        millis,
        nonce.simple(),
        sanitize_label(label),
        file_extension(original_name)
    )
}

pub fn copy_message(count: usize, stage: Stage) -> String {
    format!("Copied {} file(s) to the {} stage.", count, stage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_label() {
        assert_eq!(sanitize_label("Manuscript v2 (final).docx"), "Manuscript_v2__final_.docx");
        assert_eq!(sanitize_label("fig-1.png"), "fig-1.png");
        assert_eq!(sanitize_label("résumé"), "r_sum_");
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("paper.pdf"), "pdf");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
        assert_eq!(file_extension("README"), "bin");
        assert_eq!(file_extension("trailing."), "bin");
    }

    #[test]
    fn test_storage_key_shape() {
        let id = Uuid::nil();
        let nonce = Uuid::from_u128(0xabc);
        assert_eq!(
            storage_key(id, Stage::Review, 1_700_000_000_000, nonce, "Blind copy", "paper.docx"),
            format!(
                "submissions/{}/review/1700000000000-{}-Blind_copy.docx",
                id,
                nonce.simple()
            )
        );
    }

    #[test]
    fn test_storage_keys_in_same_millisecond_differ() {
        let id = Uuid::new_v4();
        let first = storage_key(id, Stage::Submission, 42, Uuid::new_v4(), "Manuscript", "a.docx");
        let second = storage_key(id, Stage::Submission, 42, Uuid::new_v4(), "Manuscript", "a.docx");
        assert_ne!(first, second);
    }

    #[test]
    fn test_copy_message() {
        assert_eq!(
            copy_message(3, Stage::Copyediting),
            "Copied 3 file(s) to the copyediting stage."
        );
    }

    #[test]
    fn test_author_upload_stages() {
        assert!(AUTHOR_UPLOAD_STAGES.contains(&Stage::Review));
        assert!(!AUTHOR_UPLOAD_STAGES.contains(&Stage::Production));
    }
}

//! Review rounds and reviewer assignments.
//!
//! Reviewers move their own assignments through
//! `pending -> accepted -> completed` (or decline); editors open rounds,
//! invite reviewers and cancel invitations. Any other transition is a
//! conflict.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::activity::category;
use crate::models::review::{
    AcceptReviewRequest, AssignReviewerRequest, AssignmentDetails, AssignmentFilter,
    CreateRoundRequest, ReviewAttachment, ReviewDraft, ReviewForm, ReviewFormElement,
    ReviewFormQuestion, ReviewRound, ReviewStatus,
    ReviewerAssignment, SubmissionReview, SubmitReviewRequest, ROUND_STATUS_CLOSED,
    ROUND_STATUS_PENDING_REVIEWERS,
};
use crate::models::submission::Stage;
use crate::models::submission_file::SubmissionFile;
use crate::models::user::Actor;
use crate::services::activity_service::ActivityService;
use crate::services::file_service::{sanitize_label, FileService};
use crate::services::metrics_service;
use crate::storage::StorageBackend;

const ASSIGNMENT_SELECT: &str = r#"
    SELECT r.id, rr.submission_id, s.title AS submission_title, j.title AS journal_title,
           r.review_round_id, rr.round, rr.stage, r.status, r.recommendation,
           r.assignment_date, r.due_date, r.response_due_date, r.submitted_at, r.metadata,
           s.metadata->>'abstract' AS abstract_text, s.metadata AS submission_metadata
    FROM submission_reviews r
    JOIN submission_review_rounds rr ON rr.id = r.review_round_id
    JOIN submissions s ON s.id = rr.submission_id
    LEFT JOIN journals j ON j.id = s.journal_id
"#;

/// A file received with an attachment upload.
#[derive(Debug, Clone)]
pub struct UploadedAttachment {
    pub file_name: String,
    pub content: Bytes,
}

pub struct ReviewService {
    db: PgPool,
    storage: Arc<dyn StorageBackend>,
}

impl ReviewService {
    pub fn new(db: PgPool, storage: Arc<dyn StorageBackend>) -> Self {
        Self { db, storage }
    }

    // -----------------------------------------------------------------------
    // Reviewer side
    // -----------------------------------------------------------------------

    pub async fn list_for_reviewer(
        &self,
        actor: &Actor,
        filter: AssignmentFilter,
    ) -> Result<Vec<ReviewerAssignment>> {
        actor.require_reviewer()?;

        let sql = format!("{ASSIGNMENT_SELECT} WHERE r.reviewer_id = $1 ORDER BY r.assignment_date DESC");
        let assignments: Vec<ReviewerAssignment> = sqlx::query_as(&sql)
            .bind(actor.user_id)
            .fetch_all(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(assignments
            .into_iter()
            .filter(|a| filter.matches(a))
            .map(ReviewerAssignment::with_author_names)
            .collect())
    }

    /// The caller's own assignment.
    pub async fn get_assignment(&self, id: Uuid, actor: &Actor) -> Result<ReviewerAssignment> {
        actor.require_reviewer()?;

        let sql = format!("{ASSIGNMENT_SELECT} WHERE r.id = $1 AND r.reviewer_id = $2");
        let assignment: ReviewerAssignment = sqlx::query_as(&sql)
            .bind(id)
            .bind(actor.user_id)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound("Assignment not found".to_string()))?;

        Ok(assignment.with_author_names())
    }

    pub async fn details(&self, id: Uuid, actor: &Actor) -> Result<AssignmentDetails> {
        let assignment = self.get_assignment(id, actor).await?;
        Ok(AssignmentDetails::from_metadata(&assignment.metadata.0))
    }

    /// The form attached to the caller's assignment, if any.
    pub async fn review_form(&self, id: Uuid, actor: &Actor) -> Result<Option<ReviewForm>> {
        self.get_assignment(id, actor).await?;

        let form: Option<ReviewForm> = sqlx::query_as(
            r#"
            SELECT f.id, f.title, f.description
            FROM submission_reviews r
            JOIN review_forms f ON f.id = r.review_form_id
            WHERE r.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
        let Some(mut form) = form else {
            return Ok(None);
        };

        let elements: Vec<ReviewFormElement> = sqlx::query_as(
            r#"
            SELECT id, element_type, question, possible_responses, required
            FROM review_form_elements
            WHERE review_form_id = $1 AND included
            ORDER BY seq
            "#,
        )
        .bind(form.id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        form.questions = elements.into_iter().map(ReviewFormQuestion::from).collect();
        Ok(Some(form))
    }

    pub async fn accept(&self, id: Uuid, actor: &Actor, req: AcceptReviewRequest) -> Result<()> {
        let assignment = self.get_assignment(id, actor).await?;
        ensure_transition(assignment.status, ReviewStatus::Accepted)?;

        let metadata = json!({
            "date_confirmed": Utc::now(),
            "competing_interests": req.competing_interests.as_deref().map(str::trim).unwrap_or(""),
            "privacy_consent": req.privacy_consent,
        });
        self.set_status(id, ReviewStatus::Accepted, metadata).await?;
        self.log_transition(&assignment, actor, "Reviewer accepted the review request.")
            .await
    }

    pub async fn decline(&self, id: Uuid, actor: &Actor, reason: &str) -> Result<()> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation(
                "A reason is required to decline".to_string(),
            ));
        }
        let assignment = self.get_assignment(id, actor).await?;
        ensure_transition(assignment.status, ReviewStatus::Declined)?;

        let metadata = json!({ "decline_reason": reason, "date_declined": Utc::now() });
        self.set_status(id, ReviewStatus::Declined, metadata).await?;
        self.log_transition(&assignment, actor, "Reviewer declined the review request.")
            .await
    }

    /// Save work in progress. Only while the assignment is accepted.
    pub async fn save_draft(&self, id: Uuid, actor: &Actor, draft: ReviewDraft) -> Result<()> {
        let assignment = self.get_assignment(id, actor).await?;
        if assignment.status != ReviewStatus::Accepted || assignment.submitted_at.is_some() {
            return Err(AppError::Conflict(format!(
                "Cannot save a draft for a {} review",
                assignment.status
            )));
        }

        let updated = sqlx::query(
            r#"
            UPDATE submission_reviews
            SET metadata = metadata || jsonb_build_object('draft', $2::jsonb)
            WHERE id = $1 AND status = $3 AND submitted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(sqlx::types::Json(&draft))
        .bind(ReviewStatus::Accepted)
        .execute(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if updated.rows_affected() == 0 {
            return Err(stale_review());
        }
        Ok(())
    }

    pub async fn submit(&self, id: Uuid, actor: &Actor, req: SubmitReviewRequest) -> Result<()> {
        if req.comments_to_author.trim().is_empty() {
            return Err(AppError::Validation(
                "Comments to the author are required".to_string(),
            ));
        }
        let assignment = self.get_assignment(id, actor).await?;
        ensure_transition(assignment.status, ReviewStatus::Completed)?;

        let metadata = json!({
            "comments_to_author": req.comments_to_author.trim(),
            "comments_to_editor": req.comments_to_editor.trim(),
            "competing_interests": req.competing_interests.as_deref().map(str::trim).unwrap_or(""),
        });
        let updated = sqlx::query(
            r#"
            UPDATE submission_reviews SET
                status = $2,
                recommendation = $3,
                submitted_at = NOW(),
                metadata = (metadata - 'draft') || $4
            WHERE id = $1 AND status = ANY($5) AND submitted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(ReviewStatus::Completed)
        .bind(req.recommendation)
        .bind(sqlx::types::Json(metadata))
        .bind(ReviewStatus::sources_for(ReviewStatus::Completed))
        .execute(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
        if updated.rows_affected() == 0 {
            return Err(stale_review());
        }

        metrics_service::record_review_transition(ReviewStatus::Completed.as_str());
        self.log_transition(
            &assignment,
            actor,
            &format!("Reviewer submitted a review recommending {}.", req.recommendation),
        )
        .await
    }

    /// Submission files the reviewer may read.
    pub async fn review_files(&self, id: Uuid, actor: &Actor) -> Result<Vec<SubmissionFile>> {
        let assignment = self.get_assignment(id, actor).await?;
        FileService::for_review_round(&self.db, assignment.submission_id, assignment.review_round_id)
            .await
    }

    pub async fn list_attachments(&self, id: Uuid, actor: &Actor) -> Result<Vec<ReviewAttachment>> {
        self.get_assignment(id, actor).await?;

        let attachments: Vec<ReviewAttachment> = sqlx::query_as(
            r#"
            SELECT id, review_id, file_name, file_size, storage_path, uploaded_at
            FROM review_attachments
            WHERE review_id = $1
            ORDER BY uploaded_at DESC
            "#,
        )
        .bind(id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(attachments)
    }

    pub async fn upload_attachments(
        &self,
        id: Uuid,
        actor: &Actor,
        files: Vec<UploadedAttachment>,
    ) -> Result<Vec<ReviewAttachment>> {
        if files.is_empty() {
            return Err(AppError::Validation("No files provided".to_string()));
        }
        let assignment = self.get_assignment(id, actor).await?;
        if matches!(
            assignment.status,
            ReviewStatus::Declined | ReviewStatus::Cancelled
        ) {
            return Err(AppError::Conflict(format!(
                "Cannot attach files to a {} review",
                assignment.status
            )));
        }

        let mut keys: Vec<String> = Vec::with_capacity(files.len());
        for file in &files {
            let key = attachment_key(id, Utc::now().timestamp_millis(), Uuid::new_v4(), &file.file_name);
            if let Err(e) = self.storage.put(&key, file.content.clone()).await {
                self.remove_objects(&keys).await;
                return Err(e);
            }
            keys.push(key);
        }

        let stored = match self.insert_attachments(id, &files, &keys).await {
            Ok(stored) => stored,
            Err(e) => {
                self.remove_objects(&keys).await;
                return Err(e);
            }
        };

        info!(review_id = %id, count = stored.len(), "Review attachments uploaded");
        Ok(stored)
    }

    /// Insert one row per stored object, all or nothing.
    async fn insert_attachments(
        &self,
        id: Uuid,
        files: &[UploadedAttachment],
        keys: &[String],
    ) -> Result<Vec<ReviewAttachment>> {
        let mut tx = self.db.begin().await?;
        let mut stored = Vec::with_capacity(files.len());
        for (file, key) in files.iter().zip(keys) {
            let attachment: ReviewAttachment = sqlx::query_as(
                r#"
                INSERT INTO review_attachments (review_id, file_name, file_size, storage_path)
                VALUES ($1, $2, $3, $4)
                RETURNING id, review_id, file_name, file_size, storage_path, uploaded_at
                "#,
            )
            .bind(id)
            .bind(&file.file_name)
            .bind(file.content.len() as i64)
            .bind(key)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
            stored.push(attachment);
        }
        tx.commit().await?;
        Ok(stored)
    }

    async fn remove_objects(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.storage.delete(key).await {
                warn!(key = %key, error = %e, "Failed to remove orphaned attachment");
            }
        }
    }

    pub async fn delete_attachment(
        &self,
        id: Uuid,
        attachment_id: Uuid,
        actor: &Actor,
    ) -> Result<()> {
        self.get_assignment(id, actor).await?;

        let storage_path: String = sqlx::query_scalar(
            "DELETE FROM review_attachments WHERE id = $1 AND review_id = $2 RETURNING storage_path",
        )
        .bind(attachment_id)
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Attachment not found".to_string()))?;

        if let Err(e) = self.storage.delete(&storage_path).await {
            warn!(key = %storage_path, error = %e, "Failed to remove attachment from storage");
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Editor side
    // -----------------------------------------------------------------------

    /// Rounds of a submission ordered by stage and round, with their reviews.
    pub async fn rounds_for_submission(db: &PgPool, submission_id: Uuid) -> Result<Vec<ReviewRound>> {
        let mut rounds: Vec<ReviewRound> = sqlx::query_as(
            r#"
            SELECT id, submission_id, stage, round, status, notes, started_at, closed_at
            FROM submission_review_rounds
            WHERE submission_id = $1
            ORDER BY stage, round
            "#,
        )
        .bind(submission_id)
        .fetch_all(db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let reviews: Vec<SubmissionReview> = sqlx::query_as(
            r#"
            SELECT r.id, r.review_round_id, r.reviewer_id, r.assignment_date, r.due_date,
                   r.response_due_date, r.status, r.recommendation, r.submitted_at
            FROM submission_reviews r
            JOIN submission_review_rounds rr ON rr.id = r.review_round_id
            WHERE rr.submission_id = $1
            ORDER BY r.assignment_date
            "#,
        )
        .bind(submission_id)
        .fetch_all(db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let mut by_round: HashMap<Uuid, Vec<SubmissionReview>> = HashMap::new();
        for review in reviews {
            by_round.entry(review.review_round_id).or_default().push(review);
        }
        for round in &mut rounds {
            round.reviews = by_round.remove(&round.id).unwrap_or_default();
        }

        Ok(rounds)
    }

    /// Open the next round in a stage, closing earlier open rounds there.
    pub async fn create_round(
        &self,
        submission_id: Uuid,
        req: CreateRoundRequest,
        actor: &Actor,
    ) -> Result<ReviewRound> {
        actor.require_editor()?;
        let stage = req.stage.unwrap_or(Stage::Review);

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM submissions WHERE id = $1)")
                .bind(submission_id)
                .fetch_one(&self.db)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        if !exists {
            return Err(AppError::NotFound("Submission not found".to_string()));
        }

        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            UPDATE submission_review_rounds SET status = $3, closed_at = NOW()
            WHERE submission_id = $1 AND stage = $2 AND closed_at IS NULL
            "#,
        )
        .bind(submission_id)
        .bind(stage)
        .bind(ROUND_STATUS_CLOSED)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let round: ReviewRound = sqlx::query_as(
            r#"
            INSERT INTO submission_review_rounds (submission_id, stage, round, status, notes)
            SELECT $1, $2, COALESCE(MAX(round), 0) + 1, $3, $4
            FROM submission_review_rounds
            WHERE submission_id = $1 AND stage = $2
            RETURNING id, submission_id, stage, round, status, notes, started_at, closed_at
            "#,
        )
        .bind(submission_id)
        .bind(stage)
        .bind(ROUND_STATUS_PENDING_REVIEWERS)
        .bind(&req.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        ActivityService::record_with(
            &mut *tx,
            submission_id,
            actor.user_id,
            category::REVIEW,
            &format!("Opened review round {} in the {} stage.", round.round, stage),
            json!({ "reviewRoundId": round.id, "round": round.round }),
        )
        .await?;

        tx.commit().await?;
        info!(submission_id = %submission_id, round = round.round, stage = %stage, "Review round opened");
        Ok(round)
    }

    pub async fn assign_reviewer(
        &self,
        round_id: Uuid,
        req: AssignReviewerRequest,
        actor: &Actor,
    ) -> Result<SubmissionReview> {
        actor.require_editor()?;

        let round: Option<(Uuid, bool)> = sqlx::query_as(
            "SELECT submission_id, closed_at IS NOT NULL FROM submission_review_rounds WHERE id = $1",
        )
        .bind(round_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
        let (submission_id, closed) =
            round.ok_or_else(|| AppError::NotFound("Review round not found".to_string()))?;
        if closed {
            return Err(AppError::Conflict("Review round is closed".to_string()));
        }

        let already_invited: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM submission_reviews
                WHERE review_round_id = $1 AND reviewer_id = $2
                  AND status NOT IN ('declined', 'cancelled')
            )
            "#,
        )
        .bind(round_id)
        .bind(req.reviewer_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
        if already_invited {
            return Err(AppError::Conflict(
                "Reviewer is already assigned to this round".to_string(),
            ));
        }

        let review: SubmissionReview = sqlx::query_as(
            r#"
            INSERT INTO submission_reviews (review_round_id, reviewer_id, due_date, response_due_date, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, review_round_id, reviewer_id, assignment_date, due_date,
                      response_due_date, status, recommendation, submitted_at
            "#,
        )
        .bind(round_id)
        .bind(req.reviewer_id)
        .bind(req.due_date)
        .bind(req.response_due_date)
        .bind(ReviewStatus::Pending)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        ActivityService::new(self.db.clone())
            .record(
                submission_id,
                actor.user_id,
                category::REVIEW,
                &format!("Invited reviewer {}.", req.reviewer_id),
                json!({ "reviewId": review.id, "reviewRoundId": round_id }),
            )
            .await?;

        metrics_service::record_review_transition(ReviewStatus::Pending.as_str());
        Ok(review)
    }

    pub async fn cancel(&self, review_id: Uuid, actor: &Actor) -> Result<()> {
        actor.require_editor()?;

        let current: Option<(ReviewStatus, Uuid)> = sqlx::query_as(
            r#"
            SELECT r.status, rr.submission_id
            FROM submission_reviews r
            JOIN submission_review_rounds rr ON rr.id = r.review_round_id
            WHERE r.id = $1
            "#,
        )
        .bind(review_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
        let (status, submission_id) =
            current.ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;
        ensure_transition(status, ReviewStatus::Cancelled)?;

        self.set_status(review_id, ReviewStatus::Cancelled, json!({ "date_cancelled": Utc::now() }))
            .await?;

        ActivityService::new(self.db.clone())
            .record(
                submission_id,
                actor.user_id,
                category::REVIEW,
                "Cancelled a review request.",
                json!({ "reviewId": review_id }),
            )
            .await
    }

    /// Move a review to `status` only if it is still in a state that allows it.
    async fn set_status(&self, id: Uuid, status: ReviewStatus, metadata: serde_json::Value) -> Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE submission_reviews SET status = $2, metadata = metadata || $3
            WHERE id = $1 AND status = ANY($4)
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(sqlx::types::Json(metadata))
        .bind(ReviewStatus::sources_for(status))
        .execute(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if updated.rows_affected() == 0 {
            return Err(stale_review());
        }

        metrics_service::record_review_transition(status.as_str());
        Ok(())
    }

    async fn log_transition(
        &self,
        assignment: &ReviewerAssignment,
        actor: &Actor,
        message: &str,
    ) -> Result<()> {
        info!(review_id = %assignment.id, reviewer = %actor.user_id, "{}", message);
        ActivityService::new(self.db.clone())
            .record(
                assignment.submission_id,
                actor.user_id,
                category::REVIEW,
                message,
                json!({ "reviewId": assignment.id, "round": assignment.round }),
            )
            .await
    }
}

/// Conflict unless `current -> next` is an allowed review transition.
pub fn ensure_transition(current: ReviewStatus, next: ReviewStatus) -> Result<()> {
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(AppError::Conflict(format!(
            "Cannot move a {} review to {}",
            current, next
        )))
    }
}

/// A conditional write found the review in a different state than it was read in.
fn stale_review() -> AppError {
    AppError::Conflict("The review was changed by another request; reload and try again".to_string())
}

/// `reviews/{review}/{millis}-{nonce}-{name}`
pub fn attachment_key(review_id: Uuid, millis: i64, nonce: Uuid, file_name: &str) -> String {
    format!(
        "reviews/{}/{}-{}-{}",
        review_id,
        millis,
        nonce.simple(),
        sanitize_label(file_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_transition_allows_accept() {
        assert!(ensure_transition(ReviewStatus::Pending, ReviewStatus::Accepted).is_ok());
    }

    #[test]
    fn test_ensure_transition_rejects_resubmit() {
        let err = ensure_transition(ReviewStatus::Completed, ReviewStatus::Completed).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(
            err.to_string(),
            "Conflict: Cannot move a completed review to completed"
        );
    }

    #[test]
    fn test_submit_requires_acceptance() {
        assert!(ensure_transition(ReviewStatus::Pending, ReviewStatus::Completed).is_err());
    }

    #[test]
    fn test_stale_review_is_conflict() {
        let err = stale_review();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(err.to_string().contains("changed by another request"));
    }

    #[test]
    fn test_attachment_key() {
        let id = Uuid::nil();
        let nonce = Uuid::from_u128(7);
        assert_eq!(
            attachment_key(id, 42, nonce, "my notes.pdf"),
            format!("reviews/{}/42-{}-my_notes.pdf", id, nonce.simple())
        );
    }

    #[test]
    fn test_same_name_in_same_millisecond_gets_distinct_keys() {
        let id = Uuid::new_v4();
        let first = attachment_key(id, 42, Uuid::new_v4(), "notes.pdf");
        let second = attachment_key(id, 42, Uuid::new_v4(), "notes.pdf");
        assert_ne!(first, second);
    }
}

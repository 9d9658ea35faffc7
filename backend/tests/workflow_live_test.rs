//! Live PostgreSQL tests for the task board, file copy and review workflows.
//!
//! Requires env vars:
//!   JOURNAL_DESK_TEST_DATABASE_URL (a scratch database; migrations are applied)
//!
//! Run with:
//!   cargo test --test workflow_live_test -- --ignored --nocapture

use std::sync::Arc;

use bytes::Bytes;
use sqlx::PgPool;
use serde_json::json;
use uuid::Uuid;

use journal_desk_backend::error::AppError;
use journal_desk_backend::models::publication::{
    CreateVersionRequest, MetadataPatch, PublishRequest, UnpublishRequest, VersionStatus,
};
use journal_desk_backend::models::review::{AcceptReviewRequest, ReviewStatus};
use journal_desk_backend::models::submission::Stage;
use journal_desk_backend::models::submission_file::NewSubmissionFile;
use journal_desk_backend::models::task::{TaskChanges, TaskFilter, TaskStatus};
use journal_desk_backend::models::user::Actor;
use journal_desk_backend::services::file_service::FileService;
use journal_desk_backend::services::publication_service::PublicationService;
use journal_desk_backend::services::review_service::{ReviewService, UploadedAttachment};
use journal_desk_backend::services::task_service::TaskService;
use journal_desk_backend::storage::ObjectStoreBackend;

async fn pool() -> PgPool {
    let url = std::env::var("JOURNAL_DESK_TEST_DATABASE_URL")
        .expect("JOURNAL_DESK_TEST_DATABASE_URL not set");
    let pool = PgPool::connect(&url).await.expect("connect failed");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations failed");
    pool
}

/// Insert a journal, an editor and a submission; returns (editor, submission).
async fn seed(pool: &PgPool) -> (Uuid, Uuid) {
    let suffix = Uuid::new_v4();
    let journal_id: Uuid = sqlx::query_scalar(
        "INSERT INTO journals (title, path) VALUES ('Live Test Journal', $1) RETURNING id",
    )
    .bind(format!("live-{}", suffix))
    .fetch_one(pool)
    .await
    .unwrap();
    let editor_id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (email, display_name) VALUES ($1, 'Live Editor') RETURNING id",
    )
    .bind(format!("editor-{}@example.org", suffix))
    .fetch_one(pool)
    .await
    .unwrap();
    let submission_id: Uuid = sqlx::query_scalar(
        "INSERT INTO submissions (journal_id, submitter_id, title) VALUES ($1, $2, 'Soil carbon in alpine meadows') RETURNING id",
    )
    .bind(journal_id)
    .bind(editor_id)
    .fetch_one(pool)
    .await
    .unwrap();
    (editor_id, submission_id)
}

/// Open a review round on `submission_id` and invite a fresh reviewer;
/// returns (reviewer, review).
async fn seed_review(pool: &PgPool, submission_id: Uuid) -> (Uuid, Uuid) {
    let reviewer_id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (email, display_name) VALUES ($1, 'Live Reviewer') RETURNING id",
    )
    .bind(format!("reviewer-{}@example.org", Uuid::new_v4()))
    .fetch_one(pool)
    .await
    .unwrap();
    let round_id: Uuid = sqlx::query_scalar(
        "INSERT INTO submission_review_rounds (submission_id, stage, round) VALUES ($1, 'review', 1) RETURNING id",
    )
    .bind(submission_id)
    .fetch_one(pool)
    .await
    .unwrap();
    let review_id: Uuid = sqlx::query_scalar(
        "INSERT INTO submission_reviews (review_round_id, reviewer_id) VALUES ($1, $2) RETURNING id",
    )
    .bind(round_id)
    .bind(reviewer_id)
    .fetch_one(pool)
    .await
    .unwrap();
    (reviewer_id, review_id)
}

#[tokio::test]
#[ignore]
async fn test_task_claim_complete_reopen() {
    let pool = pool().await;
    let (editor_id, submission_id) = seed(&pool).await;
    let editor = Actor::new(editor_id, vec!["editor".to_string()]);

    let task_id: Uuid = sqlx::query_scalar(
        "INSERT INTO submission_tasks (submission_id, stage, title) VALUES ($1, 'submission', 'Check references') RETURNING id",
    )
    .bind(submission_id)
    .fetch_one(&pool)
    .await
    .unwrap();

    let service = TaskService::new(pool.clone());

    // Nothing assigned yet, so the open list falls back to unassigned tasks.
    let open = service
        .list(Some(editor_id), TaskFilter::Open, 50)
        .await
        .unwrap();
    assert!(open.iter().any(|t| t.id == task_id));

    let claimed = service
        .update(
            task_id,
            TaskChanges {
                status: None,
                assignee_id: Some(Some(editor_id)),
                due_date: None,
            },
            &editor,
        )
        .await
        .unwrap();
    assert_eq!(claimed.assignee_id, Some(editor_id));

    let completed = service
        .update(
            task_id,
            TaskChanges {
                status: Some(TaskStatus::Completed),
                assignee_id: None,
                due_date: None,
            },
            &editor,
        )
        .await
        .unwrap();
    assert_eq!(completed.status, TaskStatus::Completed);
    assert_eq!(completed.assignee_id, Some(editor_id));

    let reopened = service
        .update(
            task_id,
            TaskChanges {
                status: Some(TaskStatus::Open),
                assignee_id: None,
                due_date: None,
            },
            &editor,
        )
        .await
        .unwrap();
    assert_eq!(reopened.status, TaskStatus::Open);

    let activity: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM submission_activity_logs WHERE submission_id = $1 AND category = 'tasks'",
    )
    .bind(submission_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(activity, 3);
}

#[tokio::test]
#[ignore]
async fn test_copy_file_to_review_stage() {
    let pool = pool().await;
    let (editor_id, submission_id) = seed(&pool).await;
    let editor = Actor::new(editor_id, vec!["editor".to_string()]);
    let files = FileService::new(pool.clone(), Arc::new(ObjectStoreBackend::in_memory()));

    let original = files
        .upload(
            submission_id,
            NewSubmissionFile {
                label: "Manuscript".to_string(),
                stage: Stage::Submission,
                kind: "manuscript".to_string(),
                version_label: None,
                round: 1,
                is_visible_to_authors: false,
                review_round_id: None,
                original_name: "manuscript.docx".to_string(),
                content_type: None,
            },
            Bytes::from_static(b"draft"),
            &editor,
        )
        .await
        .unwrap();

    let copied = files
        .copy(submission_id, &[original.id], Stage::Review, &editor)
        .await
        .unwrap();
    assert_eq!(copied.len(), 1);
    assert_eq!(copied[0].stage, Stage::Review);
    assert_eq!(copied[0].storage_path, original.storage_path);

    let (_, content) = files.download(submission_id, copied[0].id).await.unwrap();
    assert_eq!(content, Bytes::from_static(b"draft"));
}

#[tokio::test]
#[ignore]
async fn test_concurrent_accept_and_decline_apply_once() {
    let pool = pool().await;
    let (_, submission_id) = seed(&pool).await;
    let (reviewer_id, review_id) = seed_review(&pool, submission_id).await;
    let reviewer = Actor::new(reviewer_id, vec!["reviewer".to_string()]);
    let storage = Arc::new(ObjectStoreBackend::in_memory());
    let first = ReviewService::new(pool.clone(), storage.clone());
    let second = ReviewService::new(pool.clone(), storage);

    let (accepted, declined) = tokio::join!(
        first.accept(review_id, &reviewer, AcceptReviewRequest::default()),
        second.decline(review_id, &reviewer, "Travelling until December"),
    );

    // Accept then decline is legal, so both succeed if they serialize.
    let status: ReviewStatus =
        sqlx::query_scalar("SELECT status FROM submission_reviews WHERE id = $1")
            .bind(review_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    match (&accepted, &declined) {
        (Ok(()), Ok(())) => assert_eq!(status, ReviewStatus::Declined),
        (Ok(()), Err(AppError::Conflict(_))) => assert_eq!(status, ReviewStatus::Accepted),
        (Err(AppError::Conflict(_)), Ok(())) => assert_eq!(status, ReviewStatus::Declined),
        other => panic!("unexpected outcome: {:?}", other),
    }

    let again = first
        .accept(review_id, &reviewer, AcceptReviewRequest::default())
        .await;
    assert!(matches!(again, Err(AppError::Conflict(_))));
}

#[tokio::test]
#[ignore]
async fn test_same_named_attachments_are_stored_separately() {
    let pool = pool().await;
    let (_, submission_id) = seed(&pool).await;
    let (reviewer_id, review_id) = seed_review(&pool, submission_id).await;
    let reviewer = Actor::new(reviewer_id, vec!["reviewer".to_string()]);
    let service = ReviewService::new(pool.clone(), Arc::new(ObjectStoreBackend::in_memory()));

    let uploaded = service
        .upload_attachments(
            review_id,
            &reviewer,
            vec![
                UploadedAttachment {
                    file_name: "notes.pdf".to_string(),
                    content: Bytes::from_static(b"first"),
                },
                UploadedAttachment {
                    file_name: "notes.pdf".to_string(),
                    content: Bytes::from_static(b"second"),
                },
            ],
        )
        .await
        .unwrap();

    assert_eq!(uploaded.len(), 2);
    assert_ne!(uploaded[0].storage_path, uploaded[1].storage_path);

    let listed = service.list_attachments(review_id, &reviewer).await.unwrap();
    assert_eq!(listed.len(), 2);
}

#[tokio::test]
#[ignore]
async fn test_publication_version_lifecycle() {
    let pool = pool().await;
    let (editor_id, submission_id) = seed(&pool).await;
    let editor = Actor::new(editor_id, vec!["editor".to_string()]);
    let service = PublicationService::new(pool.clone());

    let first = service
        .create_version(submission_id, CreateVersionRequest::default(), &editor)
        .await
        .unwrap();
    let second = service
        .create_version(
            submission_id,
            CreateVersionRequest {
                description: Some("Corrected affiliations".to_string()),
            },
            &editor,
        )
        .await
        .unwrap();
    assert_eq!((first.version, second.version), (1, 2));
    assert_eq!(second.status, VersionStatus::Queued);

    let scheduled = service
        .publish(
            submission_id,
            &PublishRequest {
                version_id: None,
                publish_date: chrono::NaiveDate::from_ymd_opt(2026, 12, 1),
                publish_now: false,
            },
            &editor,
        )
        .await
        .unwrap();
    assert_eq!(scheduled.id, second.id);
    assert_eq!(scheduled.status, VersionStatus::Scheduled);

    let changed = service
        .unpublish(submission_id, &UnpublishRequest::default(), &editor)
        .await
        .unwrap();
    assert_eq!(changed, 1);

    // The submitting author may edit a queued version.
    let patch: MetadataPatch =
        serde_json::from_value(json!({ "title": "Alpine soil carbon", "keywords": ["soil"] }))
            .unwrap();
    let metadata = service
        .update_metadata(submission_id, first.id, patch, &Actor::new(editor_id, vec![]))
        .await
        .unwrap();
    assert_eq!(metadata["keywords"], json!(["soil"]));

    let title: String = sqlx::query_scalar("SELECT title FROM submissions WHERE id = $1")
        .bind(submission_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(title, "Alpine soil carbon");

    let entries: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM submission_activity_logs WHERE submission_id = $1 AND category = 'publication'",
    )
    .bind(submission_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(entries, 5);
}

#[tokio::test]
#[ignore]
async fn test_review_form_questions_in_order() {
    let pool = pool().await;
    let (_, submission_id) = seed(&pool).await;
    let (reviewer_id, review_id) = seed_review(&pool, submission_id).await;
    let reviewer = Actor::new(reviewer_id, vec!["reviewer".to_string()]);
    let service = ReviewService::new(pool.clone(), Arc::new(ObjectStoreBackend::in_memory()));

    assert!(service.review_form(review_id, &reviewer).await.unwrap().is_none());

    let form_id: Uuid = sqlx::query_scalar(
        "INSERT INTO review_forms (title) VALUES ('Standard review') RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    sqlx::query(
        r#"
        INSERT INTO review_form_elements (review_form_id, seq, element_type, question, possible_responses, required, included)
        VALUES ($1, 2, 'radio', 'Is the method sound?', E'Yes\nNo', TRUE, TRUE),
               ($1, 1, 'textarea', 'Summary', NULL, FALSE, TRUE),
               ($1, 3, 'text', 'Hidden', NULL, FALSE, FALSE)
        "#,
    )
    .bind(form_id)
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("UPDATE submission_reviews SET review_form_id = $2 WHERE id = $1")
        .bind(review_id)
        .bind(form_id)
        .execute(&pool)
        .await
        .unwrap();

    let form = service.review_form(review_id, &reviewer).await.unwrap().unwrap();
    assert_eq!(form.title, "Standard review");
    let questions: Vec<&str> = form.questions.iter().map(|q| q.question.as_str()).collect();
    assert_eq!(questions, vec!["Summary", "Is the method sound?"]);
    assert_eq!(
        form.questions[1].options,
        Some(vec!["Yes".to_string(), "No".to_string()])
    );
}

//! Submission file records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::submission::Stage;

pub const DEFAULT_FILE_KIND: &str = "manuscript";

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionFile {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub label: String,
    pub stage: Stage,
    #[sqlx(rename = "file_kind")]
    pub kind: String,
    pub storage_path: String,
    pub version_label: Option<String>,
    pub round: i32,
    pub is_visible_to_authors: bool,
    #[sqlx(rename = "file_size")]
    pub size: i64,
    pub uploaded_by: Option<Uuid>,
    pub uploaded_at: DateTime<Utc>,
    pub review_round_id: Option<Uuid>,
}

/// Metadata accompanying an uploaded file.
#[derive(Debug, Clone)]
pub struct NewSubmissionFile {
    pub label: String,
    pub stage: Stage,
    pub kind: String,
    pub version_label: Option<String>,
    pub round: i32,
    pub is_visible_to_authors: bool,
    pub review_round_id: Option<Uuid>,
    pub original_name: String,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CopyFilesRequest {
    #[serde(default)]
    pub file_ids: Vec<Uuid>,
    pub target_stage: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_request_defaults_to_empty_ids() {
        let req: CopyFilesRequest = serde_json::from_str(r#"{"targetStage": "review"}"#).unwrap();
        assert!(req.file_ids.is_empty());
        assert_eq!(req.target_stage.as_deref(), Some("review"));
    }

    #[test]
    fn test_submission_file_json_uses_kind_and_size() {
        let file = SubmissionFile {
            id: Uuid::nil(),
            submission_id: Uuid::nil(),
            label: "Manuscript v2".into(),
            stage: Stage::Copyediting,
            kind: DEFAULT_FILE_KIND.into(),
            storage_path: "submissions/x/copyediting/1-Manuscript_v2.docx".into(),
            version_label: None,
            round: 1,
            is_visible_to_authors: true,
            size: 2048,
            uploaded_by: None,
            uploaded_at: Utc::now(),
            review_round_id: None,
        };
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["kind"], "manuscript");
        assert_eq!(json["size"], 2048);
        assert_eq!(json["storagePath"], "submissions/x/copyediting/1-Manuscript_v2.docx");
        assert_eq!(json["isVisibleToAuthors"], true);
    }
}

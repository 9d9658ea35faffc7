//! Editorial discussion threads ("queries") and their notes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::submission::Stage;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionQuery {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub stage: Stage,
    pub seq: i32,
    pub date_posted: DateTime<Utc>,
    pub date_modified: Option<DateTime<Utc>>,
    pub closed: bool,
    pub participant_ids: Vec<Uuid>,
    #[sqlx(skip)]
    pub notes: Vec<QueryNote>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryNote {
    pub id: Uuid,
    pub query_id: Uuid,
    pub user_id: Uuid,
    pub author_name: Option<String>,
    pub title: Option<String>,
    pub contents: String,
    pub date_created: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateQueryRequest {
    pub stage: Stage,
    #[serde(default)]
    pub participant_ids: Vec<Uuid>,
    pub title: Option<String>,
    #[serde(default)]
    pub contents: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddNoteRequest {
    pub title: Option<String>,
    #[serde(default)]
    pub contents: String,
}

/// Trim note contents, rejecting empty notes.
pub fn note_contents(raw: &str) -> crate::error::Result<String> {
    let contents = raw.trim();
    if contents.is_empty() {
        return Err(crate::error::AppError::Validation(
            "Note contents are required".to_string(),
        ));
    }
    Ok(contents.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_contents_trimmed() {
        assert_eq!(note_contents("  Please check fig. 2 \n").unwrap(), "Please check fig. 2");
    }

    #[test]
    fn test_note_contents_required() {
        assert!(note_contents("   ").is_err());
    }

    #[test]
    fn test_create_query_defaults() {
        let req: CreateQueryRequest = serde_json::from_str(r#"{"stage": "copyediting"}"#).unwrap();
        assert_eq!(req.stage, Stage::Copyediting);
        assert!(req.participant_ids.is_empty());
        assert!(req.contents.is_empty());
    }
}

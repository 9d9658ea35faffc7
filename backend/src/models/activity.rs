//! Submission activity log entries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Activity log categories written by the services.
pub mod category {
    pub const TASKS: &str = "tasks";
    pub const FILES: &str = "files";
    pub const WORKFLOW: &str = "workflow";
    pub const PARTICIPANTS: &str = "participants";
    pub const REVIEW: &str = "review";
    pub const DISCUSSION: &str = "discussion";
    pub const PUBLICATION: &str = "publication";
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub category: String,
    pub message: String,
    #[schema(value_type = Object)]
    pub metadata: sqlx::types::Json<serde_json::Value>,
    pub actor_id: Option<Uuid>,
    pub actor_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

//! Submission task model.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::submission::Stage;
use super::{text_enum, UnknownVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Open,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::Completed => "completed",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TaskStatus::Open),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(UnknownVariant::new("task status", other)),
        }
    }
}

text_enum!(TaskStatus);

/// Status filter for task listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskFilter {
    #[default]
    Open,
    Completed,
    All,
}

impl TaskFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskFilter::Open => "open",
            TaskFilter::Completed => "completed",
            TaskFilter::All => "all",
        }
    }

    /// Status predicate to apply, `None` for `all`.
    pub fn status(&self) -> Option<TaskStatus> {
        match self {
            TaskFilter::Open => Some(TaskStatus::Open),
            TaskFilter::Completed => Some(TaskStatus::Completed),
            TaskFilter::All => None,
        }
    }
}

impl FromStr for TaskFilter {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TaskFilter::Open),
            "completed" => Ok(TaskFilter::Completed),
            "all" => Ok(TaskFilter::All),
            other => Err(UnknownVariant::new("task filter", other)),
        }
    }
}

/// An actionable to-do item tied to a submission.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionTask {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub submission_title: Option<String>,
    pub stage: Stage,
    pub title: String,
    pub status: TaskStatus,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a task.
///
/// `assignee_id` and `due_date` are tri-state: absent leaves the column
/// alone, `null` clears it, a value sets it.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<Uuid>)]
    pub assignee_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<NaiveDate>)]
    pub due_date: Option<Option<NaiveDate>>,
}

/// A validated task patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskChanges {
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<Option<Uuid>>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.assignee_id.is_none() && self.due_date.is_none()
    }

    /// Reject empty patches and unknown status values.
    pub fn validate(self) -> crate::error::Result<TaskChanges> {
        if self.is_empty() {
            return Err(crate::error::AppError::Validation(
                "No changes submitted".to_string(),
            ));
        }
        let status = match self.status.as_deref() {
            Some(raw) => Some(raw.parse::<TaskStatus>().map_err(|_| {
                crate::error::AppError::Validation("Invalid task status".to_string())
            })?),
            None => None,
        };
        Ok(TaskChanges {
            status,
            assignee_id: self.assignee_id,
            due_date: self.due_date,
        })
    }
}

impl TaskChanges {
    /// Human-readable summary of the change, recorded in the activity log.
    pub fn describe(&self, task_title: &str) -> String {
        let mut actions = Vec::new();
        if let Some(status) = self.status {
            actions.push(format!("status set to {}", status));
        }
        match self.assignee_id {
            Some(Some(user)) => actions.push(format!("assigned to {}", user)),
            Some(None) => actions.push("unassigned".to_string()),
            None => {}
        }
        match self.due_date {
            Some(Some(date)) => actions.push(format!("due {}", date)),
            Some(None) => actions.push("due date cleared".to_string()),
            None => {}
        }
        format!("Task \"{}\" {}.", task_title, actions.join(", "))
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub submission_id: Uuid,
    pub stage: Stage,
    pub title: String,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
}

/// Deserialize a present field as `Some(..)`. Explicit `null` and an empty
/// string both clear the value.
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(Some(None)),
        Some(raw) if raw.trim().is_empty() => Ok(Some(None)),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(|value| Some(Some(value)))
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_absent_fields_are_none() {
        let patch: TaskPatch = serde_json::from_str(r#"{"status": "completed"}"#).unwrap();
        assert_eq!(patch.status.as_deref(), Some("completed"));
        assert!(patch.assignee_id.is_none());
        assert!(patch.due_date.is_none());
    }

    #[test]
    fn test_patch_empty_string_clears_assignee_and_due_date() {
        let patch: TaskPatch =
            serde_json::from_str(r#"{"assigneeId": "", "dueDate": ""}"#).unwrap();
        assert_eq!(patch.assignee_id, Some(None));
        assert_eq!(patch.due_date, Some(None));
    }

    #[test]
    fn test_patch_parses_assignee_and_due_date() {
        let id = Uuid::new_v4();
        let raw = format!(r#"{{"assigneeId": "{}", "dueDate": "2026-11-02"}}"#, id);
        let patch: TaskPatch = serde_json::from_str(&raw).unwrap();
        assert_eq!(patch.assignee_id, Some(Some(id)));
        assert_eq!(
            patch.due_date,
            Some(NaiveDate::from_ymd_opt(2026, 11, 2))
        );
    }

    #[test]
    fn test_patch_rejects_malformed_due_date() {
        let result = serde_json::from_str::<TaskPatch>(r#"{"dueDate": "next week"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_patch_explicit_null_unassigns() {
        let patch: TaskPatch = serde_json::from_str(r#"{"assigneeId": null}"#).unwrap();
        assert_eq!(patch.assignee_id, Some(None));
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_patch_claim_sets_assignee() {
        let user = Uuid::new_v4();
        let json = format!(r#"{{"assigneeId": "{}"}}"#, user);
        let patch: TaskPatch = serde_json::from_str(&json).unwrap();
        assert_eq!(patch.assignee_id, Some(Some(user)));
    }

    #[test]
    fn test_patch_due_date_parses_iso_date() {
        let patch: TaskPatch = serde_json::from_str(r#"{"dueDate": "2026-11-02"}"#).unwrap();
        assert_eq!(
            patch.due_date,
            Some(Some(NaiveDate::from_ymd_opt(2026, 11, 2).unwrap()))
        );
    }

    #[test]
    fn test_empty_patch_is_rejected() {
        let patch: TaskPatch = serde_json::from_str("{}").unwrap();
        let err = patch.validate().unwrap_err();
        assert_eq!(err.to_string(), "Validation error: No changes submitted");
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let patch: TaskPatch = serde_json::from_str(r#"{"status": "archived"}"#).unwrap();
        let err = patch.validate().unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Invalid task status");
    }

    #[test]
    fn test_describe_lists_every_change() {
        let user = Uuid::nil();
        let changes = TaskChanges {
            status: Some(TaskStatus::Completed),
            assignee_id: Some(Some(user)),
            due_date: Some(None),
        };
        assert_eq!(
            changes.describe("Check references"),
            format!(
                "Task \"Check references\" status set to completed, assigned to {}, due date cleared.",
                user
            )
        );
    }

    #[test]
    fn test_describe_unassign() {
        let changes = TaskChanges {
            status: None,
            assignee_id: Some(None),
            due_date: None,
        };
        assert_eq!(changes.describe("Copyedit"), "Task \"Copyedit\" unassigned.");
    }

    #[test]
    fn test_filter_status_predicate() {
        assert_eq!(TaskFilter::Open.status(), Some(TaskStatus::Open));
        assert_eq!(TaskFilter::Completed.status(), Some(TaskStatus::Completed));
        assert_eq!(TaskFilter::All.status(), None);
        assert_eq!(TaskFilter::default(), TaskFilter::Open);
    }

    #[test]
    fn test_task_json_field_names() {
        let task = SubmissionTask {
            id: Uuid::nil(),
            submission_id: Uuid::nil(),
            submission_title: Some("On Rust".into()),
            stage: Stage::Review,
            title: "Invite reviewers".into(),
            status: TaskStatus::Open,
            assignee_id: None,
            due_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["submissionTitle"], "On Rust");
        assert_eq!(json["stage"], "review");
        assert_eq!(json["status"], "open");
        assert!(json["assigneeId"].is_null());
        assert!(json.get("dueDate").is_some());
    }
}

//! Wire types of the editor task API.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
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

/// Status filter of the task panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
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
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub submission_id: Uuid,
    #[serde(default)]
    pub submission_title: Option<String>,
    pub stage: String,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub assignee_id: Option<Uuid>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `PATCH /api/editor/tasks/:id`. Unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<Uuid>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn assign(user_id: Uuid) -> Self {
        Self {
            assignee_id: Some(user_id),
            ..Default::default()
        }
    }
}

/// Dashboard counters. Only `tasks` is adjusted locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub my_queue: i64,
    pub unassigned: i64,
    pub submission: i64,
    pub in_review: i64,
    pub copyediting: i64,
    pub production: i64,
    pub all_active: i64,
    pub archived: i64,
    pub tasks: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TaskListPayload {
    pub tasks: Vec<Task>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TaskPayload {
    pub task: Task,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DashboardPayload {
    pub stats: DashboardStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_patch_serializes_only_set_fields() {
        let body = serde_json::to_value(TaskPatch::status(TaskStatus::Completed)).unwrap();
        assert_eq!(body, json!({ "status": "completed" }));

        let user = Uuid::new_v4();
        let body = serde_json::to_value(TaskPatch::assign(user)).unwrap();
        assert_eq!(body, json!({ "assigneeId": user }));
    }

    #[test]
    fn test_task_decodes_server_shape() {
        let task: Task = serde_json::from_value(json!({
            "id": "6f1c2f0e-98a1-4c55-9f0c-0f4b7f5c4b11",
            "submissionId": "0b5e1b9a-2a55-4f38-8a2b-3b8f0f1f4b22",
            "submissionTitle": "Soil carbon",
            "stage": "review",
            "title": "Find reviewers",
            "status": "open",
            "assigneeId": null,
            "dueDate": "2026-11-02",
            "createdAt": "2026-10-01T09:00:00Z",
            "updatedAt": "2026-10-01T09:00:00Z"
        }))
        .unwrap();
        assert_eq!(task.status, TaskStatus::Open);
        assert!(task.assignee_id.is_none());
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2026, 11, 2));
    }

    #[test]
    fn test_stats_tolerate_missing_counters() {
        let stats: DashboardStats = serde_json::from_value(json!({ "tasks": 4 })).unwrap();
        assert_eq!(stats.tasks, 4);
        assert_eq!(stats.archived, 0);
    }
}

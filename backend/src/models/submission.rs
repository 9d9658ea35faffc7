//! Submission model and workflow enumerations.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::activity::ActivityEntry;
use super::participant::Participant;
use super::query::SubmissionQuery;
use super::review::ReviewRound;
use super::submission_file::SubmissionFile;
use super::{text_enum, UnknownVariant};

/// Editorial phase of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Submission,
    Review,
    Copyediting,
    Production,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Submission,
        Stage::Review,
        Stage::Copyediting,
        Stage::Production,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Submission => "submission",
            Stage::Review => "review",
            Stage::Copyediting => "copyediting",
            Stage::Production => "production",
        }
    }
}

impl FromStr for Stage {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("stage", s))
    }
}

text_enum!(Stage);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Queued,
    InReview,
    Accepted,
    Scheduled,
    Published,
    Declined,
    Archived,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Queued => "queued",
            SubmissionStatus::InReview => "in_review",
            SubmissionStatus::Accepted => "accepted",
            SubmissionStatus::Scheduled => "scheduled",
            SubmissionStatus::Published => "published",
            SubmissionStatus::Declined => "declined",
            SubmissionStatus::Archived => "archived",
        }
    }
}

impl FromStr for SubmissionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(SubmissionStatus::Queued),
            "in_review" => Ok(SubmissionStatus::InReview),
            "accepted" => Ok(SubmissionStatus::Accepted),
            "scheduled" => Ok(SubmissionStatus::Scheduled),
            "published" => Ok(SubmissionStatus::Published),
            "declined" => Ok(SubmissionStatus::Declined),
            "archived" => Ok(SubmissionStatus::Archived),
            other => Err(UnknownVariant::new("submission status", other)),
        }
    }
}

text_enum!(SubmissionStatus);

/// Named filter view over submissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Queue {
    /// Submissions where the caller is an assigned editor.
    My,
    /// Active submissions with no editor assigned.
    Unassigned,
    /// Every active submission.
    #[default]
    All,
    Archived,
}

impl Queue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Queue::My => "my",
            Queue::Unassigned => "unassigned",
            Queue::All => "all",
            Queue::Archived => "archived",
        }
    }
}

impl FromStr for Queue {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "my" => Ok(Queue::My),
            "unassigned" => Ok(Queue::Unassigned),
            "all" => Ok(Queue::All),
            "archived" => Ok(Queue::Archived),
            other => Err(UnknownVariant::new("queue", other)),
        }
    }
}

/// Row shape shared by submission listings and the detail view.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummary {
    pub id: Uuid,
    pub title: String,
    pub journal_id: Uuid,
    pub journal_title: Option<String>,
    #[sqlx(rename = "current_stage")]
    pub stage: Stage,
    pub status: SubmissionStatus,
    pub is_archived: bool,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_name: Option<String>,
    /// Users holding an editor or section editor role on the submission.
    pub assignees: Vec<Uuid>,
}

/// Counters shown on the editor dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub my_queue: i64,
    pub unassigned: i64,
    pub submission: i64,
    pub in_review: i64,
    pub copyediting: i64,
    pub production: i64,
    pub all_active: i64,
    pub archived: i64,
    /// Open tasks assigned to the caller.
    pub tasks: i64,
}

/// Everything the editor workspace shows for one submission.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionDetail {
    #[serde(flatten)]
    pub summary: SubmissionSummary,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub participants: Vec<Participant>,
    pub files: Vec<SubmissionFile>,
    pub activity: Vec<ActivityEntry>,
    pub review_rounds: Vec<ReviewRound>,
    pub queries: Vec<SubmissionQuery>,
}

/// Stage move, status change or editorial note.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowUpdateRequest {
    pub target_stage: Option<String>,
    pub status: Option<String>,
    pub note: Option<String>,
}

/// A validated workflow update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowChange {
    pub target_stage: Option<Stage>,
    pub status: Option<SubmissionStatus>,
    pub note: Option<String>,
}

impl WorkflowUpdateRequest {
    pub fn validate(self) -> crate::error::Result<WorkflowChange> {
        let note = self
            .note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if self.target_stage.is_none() && self.status.is_none() && note.is_none() {
            return Err(crate::error::AppError::Validation(
                "Nothing to update".to_string(),
            ));
        }
        let target_stage = self
            .target_stage
            .as_deref()
            .map(|s| {
                s.parse::<Stage>().map_err(|_| {
                    crate::error::AppError::Validation("Invalid workflow stage".to_string())
                })
            })
            .transpose()?;
        let status = self
            .status
            .as_deref()
            .map(str::parse::<SubmissionStatus>)
            .transpose()?;
        Ok(WorkflowChange {
            target_stage,
            status,
            note,
        })
    }
}

impl WorkflowChange {
    /// Activity message: the note when given, otherwise a summary.
    pub fn message(&self) -> String {
        if let Some(note) = &self.note {
            return note.clone();
        }
        let mut parts = Vec::new();
        if let Some(stage) = self.target_stage {
            parts.push(format!("Moved to the {} stage.", stage));
        }
        if let Some(status) = self.status {
            parts.push(format!("Status set to {}.", status));
        }
        parts.join(" ")
    }
}

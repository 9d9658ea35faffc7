//! Review rounds, reviewer assignments and review attachments.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::submission::Stage;
use super::{text_enum, UnknownVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Accepted,
    Declined,
    Completed,
    Cancelled,
}

impl ReviewStatus {
    pub const ALL: [ReviewStatus; 5] = [
        ReviewStatus::Pending,
        ReviewStatus::Accepted,
        ReviewStatus::Declined,
        ReviewStatus::Completed,
        ReviewStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Accepted => "accepted",
            ReviewStatus::Declined => "declined",
            ReviewStatus::Completed => "completed",
            ReviewStatus::Cancelled => "cancelled",
        }
    }

    /// Whether an assignment in this status may move to `next`.
    pub fn can_transition_to(&self, next: ReviewStatus) -> bool {
        use ReviewStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted)
                | (Pending, Declined)
                | (Accepted, Declined)
                | (Accepted, Completed)
                | (Pending, Cancelled)
                | (Accepted, Cancelled)
        )
    }

    /// Statuses an assignment may be in when it moves to `next`, as stored.
    pub fn sources_for(next: ReviewStatus) -> Vec<&'static str> {
        Self::ALL
            .iter()
            .filter(|status| status.can_transition_to(next))
            .map(|status| status.as_str())
            .collect()
    }
}

impl FromStr for ReviewStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReviewStatus::Pending),
            "accepted" => Ok(ReviewStatus::Accepted),
            "declined" => Ok(ReviewStatus::Declined),
            "completed" => Ok(ReviewStatus::Completed),
            "cancelled" => Ok(ReviewStatus::Cancelled),
            other => Err(UnknownVariant::new("review status", other)),
        }
    }
}

text_enum!(ReviewStatus);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Accept,
    MinorRevision,
    MajorRevision,
    Reject,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Accept => "accept",
            Recommendation::MinorRevision => "minor_revision",
            Recommendation::MajorRevision => "major_revision",
            Recommendation::Reject => "reject",
        }
    }
}

impl FromStr for Recommendation {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accept" => Ok(Recommendation::Accept),
            "minor_revision" => Ok(Recommendation::MinorRevision),
            "major_revision" => Ok(Recommendation::MajorRevision),
            "reject" => Ok(Recommendation::Reject),
            other => Err(UnknownVariant::new("recommendation", other)),
        }
    }
}

text_enum!(Recommendation);

/// Reviewer-side view filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentFilter {
    #[default]
    All,
    /// Not yet accepted or declined.
    Pending,
    /// Accepted but not submitted.
    Active,
    Completed,
}

impl AssignmentFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentFilter::All => "all",
            AssignmentFilter::Pending => "pending",
            AssignmentFilter::Active => "active",
            AssignmentFilter::Completed => "completed",
        }
    }

    pub fn matches(&self, assignment: &ReviewerAssignment) -> bool {
        match self {
            AssignmentFilter::All => true,
            AssignmentFilter::Pending => assignment.status == ReviewStatus::Pending,
            AssignmentFilter::Active => {
                assignment.status == ReviewStatus::Accepted && assignment.submitted_at.is_none()
            }
            AssignmentFilter::Completed => {
                assignment.status == ReviewStatus::Completed || assignment.submitted_at.is_some()
            }
        }
    }
}

impl FromStr for AssignmentFilter {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(AssignmentFilter::All),
            "pending" => Ok(AssignmentFilter::Pending),
            "active" => Ok(AssignmentFilter::Active),
            "completed" => Ok(AssignmentFilter::Completed),
            other => Err(UnknownVariant::new("assignment filter", other)),
        }
    }
}

/// A review inside a round, as seen by editors.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReview {
    pub id: Uuid,
    pub review_round_id: Uuid,
    pub reviewer_id: Uuid,
    pub assignment_date: DateTime<Utc>,
    pub due_date: Option<NaiveDate>,
    pub response_due_date: Option<NaiveDate>,
    pub status: ReviewStatus,
    pub recommendation: Option<Recommendation>,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRound {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub stage: Stage,
    pub round: i32,
    pub status: String,
    pub notes: Option<String>,
    pub started_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    #[sqlx(skip)]
    pub reviews: Vec<SubmissionReview>,
}

/// Status given to a freshly opened round.
pub const ROUND_STATUS_PENDING_REVIEWERS: &str = "pending_reviewers";
pub const ROUND_STATUS_CLOSED: &str = "closed";

/// A reviewer's own view of an assignment.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerAssignment {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub submission_title: String,
    pub journal_title: Option<String>,
    pub review_round_id: Uuid,
    pub round: i32,
    pub stage: Stage,
    pub status: ReviewStatus,
    pub recommendation: Option<Recommendation>,
    pub assignment_date: DateTime<Utc>,
    pub due_date: Option<NaiveDate>,
    pub response_due_date: Option<NaiveDate>,
    pub submitted_at: Option<DateTime<Utc>>,
    #[schema(value_type = Object)]
    pub metadata: sqlx::types::Json<serde_json::Value>,
    pub abstract_text: Option<String>,
    #[serde(skip)]
    #[schema(ignore)]
    pub submission_metadata: sqlx::types::Json<serde_json::Value>,
    #[sqlx(skip)]
    pub author_names: Option<String>,
}

impl ReviewerAssignment {
    /// Fill `author_names` from the submission's `authors` metadata.
    pub fn with_author_names(mut self) -> Self {
        self.author_names = author_names(&self.submission_metadata.0);
        self
    }
}

/// Join `authors[].givenName familyName` into a comma separated list.
pub fn author_names(metadata: &serde_json::Value) -> Option<String> {
    let names: Vec<String> = metadata
        .get("authors")
        .and_then(|a| a.as_array())
        .map(|authors| {
            authors
                .iter()
                .map(|a| {
                    let given = a.get("givenName").and_then(|v| v.as_str()).unwrap_or("");
                    let family = a.get("familyName").and_then(|v| v.as_str()).unwrap_or("");
                    format!("{} {}", given, family).trim().to_string()
                })
                .filter(|name| !name.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if names.is_empty() {
        None
    } else {
        Some(names.join(", "))
    }
}

pub const DEFAULT_REVIEW_REQUEST_MESSAGE: &str = "You have been invited to review the following \
    submission. Please review the details below and decide whether you can accept or must \
    decline this review request.";
pub const DEFAULT_REVIEW_METHOD: &str = "Double-blind";

/// Invitation details shown before a reviewer responds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentDetails {
    pub review_request_message: String,
    pub review_method: String,
    pub competing_interests: Option<String>,
}

impl AssignmentDetails {
    pub fn from_metadata(metadata: &serde_json::Value) -> Self {
        let text = |key: &str| {
            metadata
                .get(key)
                .and_then(|v| v.as_str())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            review_request_message: text("review_request_message")
                .unwrap_or_else(|| DEFAULT_REVIEW_REQUEST_MESSAGE.to_string()),
            review_method: text("review_method").unwrap_or_else(|| DEFAULT_REVIEW_METHOD.to_string()),
            competing_interests: text("competing_interests"),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAttachment {
    pub id: Uuid,
    pub review_id: Uuid,
    pub file_name: String,
    pub file_size: i64,
    #[serde(skip)]
    pub storage_path: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptReviewRequest {
    pub competing_interests: Option<String>,
    #[serde(default)]
    pub privacy_consent: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeclineReviewRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDraft {
    pub recommendation: Option<Recommendation>,
    #[serde(default)]
    pub comments_to_author: String,
    #[serde(default)]
    pub comments_to_editor: String,
    #[serde(default)]
    pub competing_interests: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewRequest {
    pub recommendation: Recommendation,
    pub comments_to_author: String,
    pub comments_to_editor: String,
    pub competing_interests: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoundRequest {
    pub stage: Option<Stage>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignReviewerRequest {
    pub reviewer_id: Uuid,
    pub due_date: Option<NaiveDate>,
    pub response_due_date: Option<NaiveDate>,
}

/// Reviewer form attached to an assignment.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewForm {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[sqlx(skip)]
    pub questions: Vec<ReviewFormQuestion>,
}

/// A stored form element.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewFormElement {
    pub id: Uuid,
    pub element_type: String,
    pub question: String,
    pub possible_responses: Option<String>,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFormQuestion {
    pub id: Uuid,
    pub question: String,
    /// text, textarea, radio or checkbox
    #[serde(rename = "type")]
    pub kind: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

impl From<ReviewFormElement> for ReviewFormQuestion {
    fn from(element: ReviewFormElement) -> Self {
        let options = match element.element_type.as_str() {
            "radio" | "checkbox" => Some(
                element
                    .possible_responses
                    .as_deref()
                    .unwrap_or("")
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            _ => None,
        };
        Self {
            id: element.id,
            question: element.question,
            kind: element.element_type,
            required: element.required,
            options,
        }
    }
}

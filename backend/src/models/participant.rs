//! Users holding a role on a submission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::submission::Stage;

/// Participant roles that count as an assigned editor for queues.
pub const EDITOR_PARTICIPANT_ROLES: [&str; 2] = ["editor", "section_editor"];

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub stage: Stage,
    pub assigned_at: DateTime<Utc>,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignParticipantRequest {
    pub user_id: Uuid,
    pub role: String,
    pub stage: Stage,
}

impl AssignParticipantRequest {
    /// Normalised role, rejecting blanks.
    pub fn role(&self) -> crate::error::Result<String> {
        let role = self.role.trim().to_lowercase();
        if role.is_empty() {
            return Err(crate::error::AppError::Validation(
                "Participant role is required".to_string(),
            ));
        }
        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_is_normalised() {
        let req: AssignParticipantRequest = serde_json::from_str(&format!(
            r#"{{"userId": "{}", "role": " Section_Editor ", "stage": "review"}}"#,
            Uuid::nil()
        ))
        .unwrap();
        assert_eq!(req.role().unwrap(), "section_editor");
        assert_eq!(req.stage, Stage::Review);
    }

    #[test]
    fn test_blank_role_rejected() {
        let req = AssignParticipantRequest {
            user_id: Uuid::nil(),
            role: "  ".into(),
            stage: Stage::Submission,
        };
        assert!(req.role().is_err());
    }
}

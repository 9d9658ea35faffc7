//! Authenticated caller identity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Roles allowed to act on the editor surface.
pub const EDITOR_ROLES: [&str; 4] = ["admin", "manager", "editor", "section_editor"];
pub const REVIEWER_ROLE: &str = "reviewer";

/// Bearer token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    /// Role paths, e.g. `editor` or `reviewer`.
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: usize,
}

/// The caller of a service operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub roles: Vec<String>,
}

impl Actor {
    pub fn new(user_id: Uuid, roles: Vec<String>) -> Self {
        Self { user_id, roles }
    }

    pub fn is_editor(&self) -> bool {
        has_editor_role(&self.roles)
    }

    pub fn is_reviewer(&self) -> bool {
        self.roles.iter().any(|r| r == REVIEWER_ROLE)
    }

    pub fn require_editor(&self) -> crate::error::Result<()> {
        if self.is_editor() {
            Ok(())
        } else {
            Err(crate::error::AppError::Forbidden(
                "Editor role required".to_string(),
            ))
        }
    }

    pub fn require_reviewer(&self) -> crate::error::Result<()> {
        if self.is_reviewer() {
            Ok(())
        } else {
            Err(crate::error::AppError::Forbidden(
                "Reviewer role required".to_string(),
            ))
        }
    }
}

pub fn has_editor_role<S: AsRef<str>>(roles: &[S]) -> bool {
    roles
        .iter()
        .any(|role| EDITOR_ROLES.contains(&role.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editor_roles() {
        assert!(has_editor_role(&["section_editor"]));
        assert!(has_editor_role(&["reviewer", "manager"]));
        assert!(!has_editor_role(&["reviewer", "author"]));
        assert!(!has_editor_role::<&str>(&[]));
    }

    #[test]
    fn test_actor_role_checks() {
        let editor = Actor::new(Uuid::nil(), vec!["editor".into()]);
        assert!(editor.is_editor());
        assert!(editor.require_editor().is_ok());
        assert!(editor.require_reviewer().is_err());

        let reviewer = Actor::new(Uuid::nil(), vec!["reviewer".into()]);
        assert!(!reviewer.is_editor());
        assert!(reviewer.is_reviewer());
        assert!(matches!(
            reviewer.require_editor(),
            Err(crate::error::AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_claims_roles_default_empty() {
        let claims: Claims = serde_json::from_str(&format!(
            r#"{{"sub": "{}", "exp": 1}}"#,
            Uuid::nil()
        ))
        .unwrap();
        assert!(claims.roles.is_empty());
    }

    #[test]
    fn test_claims_ignore_profile_fields() {
        let claims: Claims = serde_json::from_str(&format!(
            r#"{{"sub": "{}", "email": "editor@example.org", "roles": ["editor"], "exp": 1}}"#,
            Uuid::nil()
        ))
        .unwrap();
        assert_eq!(claims.roles, vec!["editor".to_string()]);
    }
}

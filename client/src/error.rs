//! Client error type.
//!
//! `Display` is the inline message shown next to the task board.

use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport failure before a response arrived
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with `{ "ok": false, "error": ... }` or a non-2xx status
    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("You must be signed in to claim tasks.")]
    NotSignedIn,

    #[error("An action for task {0} is already in progress.")]
    ActionPending(Uuid),
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl ClientError {
    /// Status code reported by the server, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            ClientError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_displays_message_only() {
        let err = ClientError::Server {
            status: 403,
            message: "You do not have permission to update this task".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "You do not have permission to update this task"
        );
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn test_not_signed_in_message() {
        assert_eq!(
            ClientError::NotSignedIn.to_string(),
            "You must be signed in to claim tasks."
        );
    }
}

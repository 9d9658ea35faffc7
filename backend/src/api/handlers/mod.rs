//! Request handlers grouped by surface.

pub mod author;
pub mod dashboard;
pub mod files;
pub mod health;
pub mod participants;
pub mod publications;
pub mod queries;
pub mod review_rounds;
pub mod reviewer;
pub mod submissions;
pub mod tasks;

use axum::Router;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::SharedState;

/// Routes mounted under `/api/editor`.
pub fn editor_router() -> Router<SharedState> {
    Router::new()
        .merge(dashboard::router())
        .merge(submissions::router())
        .merge(tasks::router())
        .merge(files::router())
        .merge(participants::router())
        .merge(review_rounds::router())
        .merge(queries::router())
        .merge(publications::router())
}

/// `{"ok": true}` with no payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub fn new() -> Self {
        Self { ok: true }
    }
}

impl Default for Ack {
    fn default() -> Self {
        Self::new()
    }
}

/// `{"ok": true, "message": ...}`
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub ok: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }
}

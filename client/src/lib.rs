//! HTTP client for the Journal Desk editor API and the editor task board.

pub mod client;
pub mod error;
pub mod models;
pub mod task_board;

pub use client::{ApiClient, ApiClientBuilder};
pub use error::ClientError;
pub use models::{DashboardStats, Task, TaskFilter, TaskPatch, TaskStatus};
pub use task_board::{TaskAction, TaskBoard};

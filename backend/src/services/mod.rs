//! Business logic services.

pub mod activity_service;
pub mod file_service;
pub mod metrics_service;
pub mod participant_service;
pub mod publication_service;
pub mod query_service;
pub mod review_service;
pub mod submission_service;
pub mod task_service;

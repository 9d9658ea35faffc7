//! Prometheus counters for editorial actions.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::{AppError, Result};

pub const TASK_UPDATES: &str = "journal_task_updates_total";
pub const FILES_COPIED: &str = "journal_files_copied_total";
pub const REVIEW_TRANSITIONS: &str = "journal_review_transitions_total";
pub const PUBLICATION_CHANGES: &str = "journal_publication_changes_total";

/// Install the global recorder and return the handle used by `/metrics`.
pub fn install_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| AppError::Internal(format!("Failed to install metrics recorder: {}", e)))
}

/// Build a handle without installing it globally. Used by tests.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

pub fn record_task_update(status: &str) {
    metrics::counter!(TASK_UPDATES, "status" => status.to_string()).increment(1);
}

pub fn record_files_copied(count: u64) {
    metrics::counter!(FILES_COPIED).increment(count);
}

pub fn record_review_transition(to: &str) {
    metrics::counter!(REVIEW_TRANSITIONS, "to" => to.to_string()).increment(1);
}

pub fn record_publication(status: &str) {
    metrics::counter!(PUBLICATION_CHANGES, "status" => status.to_string()).increment(1);
}

//! Editor dashboard task panel.
//!
//! Holds the panel's view state and drives the task endpoints. Every
//! successful mutation adjusts the task counter locally, bumps `refresh_key`
//! and re-fetches the list for the current filter.
//!
//! The board is cheap to clone and every handle shares one state, so a view
//! can keep rendering (and see which tasks are pending) while an action is in
//! flight. The state lock is never held across a request.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::client::ApiClient;
use crate::error::{ClientError, Result};
use crate::models::{DashboardStats, Task, TaskFilter, TaskPatch, TaskStatus};

/// The three mutually exclusive task actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Complete,
    Reopen,
    Claim,
}

impl TaskAction {
    /// Change applied to the caller's open task count.
    pub fn stats_delta(&self) -> i64 {
        match self {
            TaskAction::Complete => -1,
            TaskAction::Reopen | TaskAction::Claim => 1,
        }
    }
}

#[derive(Debug, Default)]
struct BoardState {
    filter: TaskFilter,
    tasks: Vec<Task>,
    stats: DashboardStats,
    refresh_key: u64,
    pending: HashSet<Uuid>,
    error: Option<String>,
    current_user: Option<Uuid>,
}

impl BoardState {
    fn patch_for(&self, action: TaskAction) -> Result<TaskPatch> {
        match action {
            TaskAction::Complete => Ok(TaskPatch::status(TaskStatus::Completed)),
            TaskAction::Reopen => Ok(TaskPatch::status(TaskStatus::Open)),
            TaskAction::Claim => self
                .current_user
                .map(TaskPatch::assign)
                .ok_or(ClientError::NotSignedIn),
        }
    }

    /// Mark `task_id` pending and return the patch to send.
    fn begin(&mut self, task_id: Uuid, action: TaskAction) -> Result<TaskPatch> {
        self.error = None;
        let patch = match self.patch_for(action) {
            Ok(patch) => patch,
            Err(e) => return Err(self.fail(e)),
        };
        if !self.pending.insert(task_id) {
            return Err(self.fail(ClientError::ActionPending(task_id)));
        }
        Ok(patch)
    }

    /// Release `task_id` and fold the server's answer into the view.
    fn finish(&mut self, task_id: Uuid, action: TaskAction, result: Result<Task>) -> Result<Task> {
        self.pending.remove(&task_id);
        let task = match result {
            Ok(task) => task,
            Err(e) => return Err(self.fail(e)),
        };
        if let Some(existing) = self.tasks.iter_mut().find(|t| t.id == task.id) {
            *existing = task.clone();
        }
        self.stats.tasks = (self.stats.tasks + action.stats_delta()).max(0);
        self.refresh_key += 1;
        Ok(task)
    }

    fn fail(&mut self, err: ClientError) -> ClientError {
        tracing::warn!(error = %err, "Task board request failed");
        self.error = Some(err.to_string());
        err
    }
}

#[derive(Clone)]
pub struct TaskBoard {
    client: ApiClient,
    state: Arc<RwLock<BoardState>>,
}

impl TaskBoard {
    pub fn new(client: ApiClient, current_user: Option<Uuid>) -> Self {
        Self {
            client,
            state: Arc::new(RwLock::new(BoardState {
                current_user,
                ..BoardState::default()
            })),
        }
    }

    pub async fn filter(&self) -> TaskFilter {
        self.state.read().await.filter
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.state.read().await.tasks.clone()
    }

    pub async fn stats(&self) -> DashboardStats {
        self.state.read().await.stats.clone()
    }

    pub async fn refresh_key(&self) -> u64 {
        self.state.read().await.refresh_key
    }

    /// Inline error from the last failed load or action.
    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    /// Whether the buttons of `task_id` are disabled.
    pub async fn is_pending(&self, task_id: Uuid) -> bool {
        self.state.read().await.pending.contains(&task_id)
    }

    pub async fn set_current_user(&self, user: Option<Uuid>) {
        self.state.write().await.current_user = user;
    }

    /// Load the dashboard counters and the task list.
    pub async fn load(&self) -> Result<()> {
        match self.client.dashboard().await {
            Ok(stats) => self.state.write().await.stats = stats,
            Err(e) => return Err(self.state.write().await.fail(e)),
        }
        self.refresh().await
    }

    pub async fn set_filter(&self, filter: TaskFilter) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.filter = filter;
            state.refresh_key += 1;
        }
        self.refresh().await
    }

    /// Re-fetch the task list for the current filter.
    pub async fn refresh(&self) -> Result<()> {
        let filter = self.state.read().await.filter;
        let result = self.client.list_tasks(filter).await;

        let mut state = self.state.write().await;
        match result {
            Ok(tasks) => {
                state.tasks = tasks;
                Ok(())
            }
            Err(e) => Err(state.fail(e)),
        }
    }

    pub async fn complete(&self, task_id: Uuid) -> Result<Task> {
        self.run(task_id, TaskAction::Complete).await
    }

    pub async fn reopen(&self, task_id: Uuid) -> Result<Task> {
        self.run(task_id, TaskAction::Reopen).await
    }

    pub async fn claim(&self, task_id: Uuid) -> Result<Task> {
        self.run(task_id, TaskAction::Claim).await
    }

    async fn run(&self, task_id: Uuid, action: TaskAction) -> Result<Task> {
        let patch = self.state.write().await.begin(task_id, action)?;
        let result = self.client.update_task(task_id, &patch).await;
        let task = self.state.write().await.finish(task_id, action, result)?;
        tracing::debug!(task_id = %task_id, action = ?action, status = task.status.as_str(), "Task updated");

        // The update is committed; a failed re-fetch only shows up inline.
        if let Err(e) = self.refresh().await {
            tracing::debug!(task_id = %task_id, error = %e, "Task list refresh after update failed");
        }
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(user: Option<Uuid>) -> TaskBoard {
        let client = ApiClient::builder("http://127.0.0.1:9").build().unwrap();
        TaskBoard::new(client, user)
    }

    #[test]
    fn test_stats_delta() {
        assert_eq!(TaskAction::Complete.stats_delta(), -1);
        assert_eq!(TaskAction::Reopen.stats_delta(), 1);
        assert_eq!(TaskAction::Claim.stats_delta(), 1);
    }

    #[test]
    fn test_claim_patch_requires_user() {
        let state = BoardState::default();
        assert!(matches!(
            state.patch_for(TaskAction::Claim),
            Err(ClientError::NotSignedIn)
        ));

        let user = Uuid::new_v4();
        let state = BoardState {
            current_user: Some(user),
            ..BoardState::default()
        };
        let patch = state.patch_for(TaskAction::Claim).unwrap();
        assert_eq!(patch.assignee_id, Some(user));
        assert!(patch.status.is_none());
    }

    #[test]
    fn test_begin_twice_reports_pending() {
        let mut state = BoardState::default();
        let task_id = Uuid::new_v4();
        state.begin(task_id, TaskAction::Complete).unwrap();

        let err = state.begin(task_id, TaskAction::Reopen).unwrap_err();
        assert!(matches!(err, ClientError::ActionPending(id) if id == task_id));
        assert!(state.pending.contains(&task_id));
        assert!(state.error.is_some());
    }

    #[test]
    fn test_finish_with_error_releases_task() {
        let mut state = BoardState::default();
        let task_id = Uuid::new_v4();
        state.begin(task_id, TaskAction::Complete).unwrap();

        let failure = ClientError::Server {
            status: 500,
            message: "Database operation failed".to_string(),
        };
        let result = state.finish(task_id, TaskAction::Complete, Err(failure));
        assert!(result.is_err());
        assert!(!state.pending.contains(&task_id));
        assert_eq!(state.refresh_key, 0);
        assert_eq!(state.stats.tasks, 0);
    }

    #[tokio::test]
    async fn test_defaults() {
        let board = board(None);
        assert_eq!(board.filter().await, TaskFilter::Open);
        assert!(board.tasks().await.is_empty());
        assert_eq!(board.refresh_key().await, 0);
        assert!(board.error().await.is_none());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let board = board(None);
        let other = board.clone();
        other.set_current_user(Some(Uuid::new_v4())).await;
        assert!(board.state.read().await.current_user.is_some());
    }
}

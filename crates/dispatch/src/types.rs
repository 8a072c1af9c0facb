//! Manager-facing types: statuses, callbacks, and snapshots.

use std::sync::Arc;

use serde::Serialize;

use fahrplan_core::TaskToken;

/// Lifecycle state of one registry entry.
///
/// NOT_STARTED → RUNNING → {COMPLETED, CANCELED}. `Canceled` is transient: it
/// is only observable between a cancel request and the runner's completion,
/// at which point the entry disappears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TaskStatus {
    /// Submitted, not yet picked up by a worker.
    NotStarted,
    /// A runner has been launched and has not completed.
    Running,
    /// The runner delivered a response that nobody has collected yet.
    Completed,
    /// Canceled while running; gone once the runner confirms.
    Canceled,
}

/// Completion callback registered at submission.
///
/// Invoked off the registry lock when the task completes, never for canceled
/// tasks. Returning `true` consumes the entry in place of
/// [`TaskManager::take_completed`](crate::TaskManager::take_completed).
pub type TaskCallback<Q, S> = Box<dyn FnOnce(TaskToken, &Q, &S) -> bool + Send>;

/// A collected task: the original request and the runner's response.
#[derive(Debug)]
pub struct CompletedTask<Q, S> {
    pub token: TaskToken,
    pub request: Arc<Q>,
    pub response: S,
}

/// Point-in-time registry counts. Costs one pass over the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStatusInfo {
    pub total: usize,
    pub not_started: usize,
    pub running: usize,
    pub completed: usize,
    pub canceled: usize,
}

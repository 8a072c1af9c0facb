//! Task runner, factory, and completion contracts.

use std::sync::Arc;

use tracing::warn;

use crate::cancel::CancelFlag;
use crate::token::TaskToken;

/// Receives task completions.
///
/// Implemented by the task manager's shared state; a lower-level sink can
/// stand in for it in tests and adapters.
pub trait CompletionSink<S>: Send + Sync {
    /// Deliver the response for `token`. Called exactly once per started task.
    fn task_done(&self, token: TaskToken, response: S);
}

/// Handle given to a runner for the duration of one task.
///
/// Carries the task's token, its cancellation flag, and the way back to the
/// owner. [`TaskContext::complete`] consumes the context, which is what makes
/// the exactly-once completion contract hold.
pub struct TaskContext<S> {
    token: TaskToken,
    cancel: CancelFlag,
    sink: Arc<dyn CompletionSink<S>>,
    completed: bool,
}

impl<S> TaskContext<S> {
    pub fn new(token: TaskToken, cancel: CancelFlag, sink: Arc<dyn CompletionSink<S>>) -> Self {
        Self {
            token,
            cancel,
            sink,
            completed: false,
        }
    }

    pub fn token(&self) -> TaskToken {
        self.token
    }

    /// Whether cancellation has been requested for this task.
    ///
    /// Long `run` bodies should poll this and cut their remaining work short
    /// once it turns true.
    pub fn is_canceled(&self) -> bool {
        self.cancel.is_canceled()
    }

    /// Deliver the response to the owner and consume the context.
    pub fn complete(mut self, response: S) {
        self.completed = true;
        self.sink.task_done(self.token, response);
    }
}

impl<S> Drop for TaskContext<S> {
    fn drop(&mut self) {
        if !self.completed {
            warn!(
                token = %self.token,
                "task context dropped without completing; its registry entry will never resolve"
            );
        }
    }
}

/// One unit of executable work.
///
/// `run` is invoked exactly once, off the registry lock. It may block its
/// calling thread for as long as the work takes, or move `ctx` to another
/// thread and return early. Either way `ctx.complete` must eventually be
/// called, or the task's entry (and any manager waiting to drain) hangs
/// forever. Domain failures have no channel of their own and are encoded in
/// the response payload.
pub trait TaskRunner<S>: Send {
    fn run(self: Box<Self>, ctx: TaskContext<S>);
}

/// Builds runners for started tasks.
///
/// Called with the registry locked; implementations must not call back into
/// the task manager. There is no error channel; a factory that can fail has
/// to encode that in the runner it returns.
pub trait RunnerFactory<Q, S>: Send + Sync {
    fn new_runner(&self, token: TaskToken, request: Arc<Q>) -> Box<dyn TaskRunner<S>>;
}

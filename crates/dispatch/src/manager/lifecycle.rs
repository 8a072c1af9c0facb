use std::sync::{Arc, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use fahrplan_core::{CancelFlag, CompletionSink, TaskContext, TaskToken};

use crate::error::DispatchError;
use crate::types::{CompletedTask, TaskCallback, TaskStatus};

use super::core::{Registry, TaskEntry, TaskManager};

impl<Q, S> TaskManager<Q, S>
where
    Q: Send + Sync + 'static,
    S: Send + 'static,
{
    /// Register a new task. Never fails; returns its fresh token.
    pub fn add_task(&self, request: Q) -> TaskToken {
        self.add_task_inner(request, None)
    }

    /// Register a new task with a completion callback.
    ///
    /// The callback runs off the registry lock when the task completes; it is
    /// skipped for canceled tasks. Returning `true` consumes the entry, so no
    /// `take_completed` call is needed (nor will one find it).
    pub fn add_task_with_callback(&self, request: Q, callback: TaskCallback<Q, S>) -> TaskToken {
        self.add_task_inner(request, Some(callback))
    }

    fn add_task_inner(&self, request: Q, callback: Option<TaskCallback<Q, S>>) -> TaskToken {
        let token = self.shared.tokens.new_token();
        let mut registry = self.shared.registry.lock().unwrap();
        registry.entries.insert(
            token,
            TaskEntry {
                status: TaskStatus::NotStarted,
                request: Arc::new(request),
                response: None,
                callback,
                cancel: None,
                started_at: None,
            },
        );
        registry.new_task_seq += 1;

        let pending = registry
            .entries
            .values()
            .filter(|e| e.status == TaskStatus::NotStarted)
            .count();
        if pending > self.shared.config.pending_warn_threshold {
            warn!(
                pending,
                threshold = self.shared.config.pending_warn_threshold,
                "task backlog exceeds configured threshold"
            );
        }
        drop(registry);

        self.shared.new_task.notify_all();
        self.shared.metrics.write().unwrap().tasks_added += 1;
        debug!(%token, "task added");
        token
    }

    /// Start the given task on the calling thread.
    ///
    /// Blocks for as long as the runner's `run` body does; a runner that
    /// offloads its work returns sooner.
    pub fn start_task(&self, token: TaskToken) -> Result<(), DispatchError> {
        let registry = self.shared.registry.lock().unwrap();
        let status = registry.entries.get(&token).map(|e| e.status);
        match status {
            None => Err(DispatchError::UnknownToken(token)),
            Some(status) if status != TaskStatus::NotStarted => {
                Err(DispatchError::WrongState { token, status })
            }
            Some(_) => {
                self.launch(registry, token);
                Ok(())
            }
        }
    }

    /// Start the earliest-submitted pending task, if any.
    ///
    /// Returns `None` without scanning when the manager is shutting down,
    /// after re-waking other waiters so they observe shutdown too; otherwise
    /// `None` means nothing is pending.
    pub fn start_oldest_task(&self) -> Option<TaskToken> {
        let registry = self.shared.registry.lock().unwrap();
        if registry.shutting_down {
            drop(registry);
            self.shared.new_task.notify_all();
            return None;
        }
        let token = registry
            .entries
            .iter()
            .find(|(_, entry)| entry.status == TaskStatus::NotStarted)
            .map(|(token, _)| *token)?;
        self.launch(registry, token);
        Some(token)
    }

    /// Transition a validated NOT_STARTED entry to RUNNING and run it.
    ///
    /// The factory is consulted while the registry is still locked; the
    /// runner's `run` body executes after the guard is released, so a runner
    /// that completes synchronously re-enters the manager without deadlock.
    fn launch(&self, mut registry: MutexGuard<'_, Registry<Q, S>>, token: TaskToken) {
        let entry = registry
            .entries
            .get_mut(&token)
            .expect("caller validated the entry");
        let cancel = CancelFlag::new();
        let runner = self.shared.factory.new_runner(token, Arc::clone(&entry.request));
        entry.status = TaskStatus::Running;
        entry.cancel = Some(cancel.clone());
        entry.started_at = Some(Instant::now());
        drop(registry);

        debug!(%token, "task starting");
        let sink = Arc::clone(&self.shared) as Arc<dyn CompletionSink<S>>;
        runner.run(TaskContext::new(token, cancel, sink));
    }

    /// Cancel a task.
    ///
    /// A NOT_STARTED entry is removed on the spot. A RUNNING entry has its
    /// callback cleared and its cancellation flag set; the entry itself stays
    /// until the runner confirms completion. Never blocks.
    pub fn cancel_task(&self, token: TaskToken) -> Result<(), DispatchError> {
        let mut registry = self.shared.registry.lock().unwrap();
        let status = registry
            .entries
            .get(&token)
            .map(|e| e.status)
            .ok_or(DispatchError::UnknownToken(token))?;
        match status {
            TaskStatus::NotStarted => {
                registry.entries.remove(&token);
                drop(registry);
                debug!(%token, "canceled before start");
            }
            TaskStatus::Running => {
                let entry = registry
                    .entries
                    .get_mut(&token)
                    .expect("entry checked above");
                entry.callback = None;
                entry.status = TaskStatus::Canceled;
                if let Some(cancel) = &entry.cancel {
                    cancel.cancel();
                }
                drop(registry);
                debug!(%token, "cancellation requested");
            }
            status => {
                return Err(DispatchError::WrongState { token, status });
            }
        }
        self.shared.metrics.write().unwrap().tasks_canceled += 1;
        Ok(())
    }

    /// Drop the callback registered for a task without touching its status.
    pub fn unregister_callback(&self, token: TaskToken) -> Result<(), DispatchError> {
        let mut registry = self.shared.registry.lock().unwrap();
        let entry = registry
            .entries
            .get_mut(&token)
            .ok_or(DispatchError::UnknownToken(token))?;
        entry.callback = None;
        Ok(())
    }

    /// Block until a task is submitted or shutdown is requested.
    ///
    /// `None` waits indefinitely. Returns `false` only when the timeout
    /// elapses first.
    pub fn wait_for_new_task(&self, timeout: Option<Duration>) -> bool {
        let mut registry = self.shared.registry.lock().unwrap();
        let seq = registry.new_task_seq;
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if registry.new_task_seq != seq || registry.shutting_down {
                return true;
            }
            registry = match deadline {
                None => self.shared.new_task.wait(registry).unwrap(),
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return false;
                    }
                    let (guard, _timeout) = self
                        .shared
                        .new_task
                        .wait_timeout(registry, remaining)
                        .unwrap();
                    guard
                }
            };
        }
    }

    /// Collect a completed task, removing its entry from the registry.
    ///
    /// The only caller-driven consumption path besides a `true`-returning
    /// completion callback.
    pub fn take_completed(&self, token: TaskToken) -> Result<CompletedTask<Q, S>, DispatchError> {
        let mut registry = self.shared.registry.lock().unwrap();
        let status = registry.entries.get(&token).map(|e| e.status);
        match status {
            None => Err(DispatchError::UnknownToken(token)),
            Some(status) if status != TaskStatus::Completed => {
                Err(DispatchError::WrongState { token, status })
            }
            Some(_) => {
                let entry = registry.entries.remove(&token).expect("entry checked above");
                drop(registry);
                let response = entry.response.expect("completed entry holds a response");
                self.shared.metrics.write().unwrap().tasks_collected += 1;
                debug!(%token, "task collected");
                Ok(CompletedTask {
                    token,
                    request: entry.request,
                    response,
                })
            }
        }
    }
}

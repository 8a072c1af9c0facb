use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use fahrplan_core::{CompletionSink, TaskToken};

use crate::types::TaskStatus;

use super::core::{Shared, TaskManager};

impl<Q, S> CompletionSink<S> for Shared<Q, S>
where
    Q: Send + Sync + 'static,
    S: Send + 'static,
{
    /// The runner-facing completion path, reachable only through a
    /// [`fahrplan_core::TaskContext`].
    fn task_done(&self, token: TaskToken, response: S) {
        let mut registry = self.registry.lock().unwrap();
        let Some(status) = registry.entries.get(&token).map(|e| e.status) else {
            drop(registry);
            debug!(%token, "completion for unknown task, response discarded");
            self.metrics.write().unwrap().responses_discarded += 1;
            return;
        };

        match status {
            // Canceled earlier: the runner's confirmation is what finally
            // removes the entry. The callback was cleared at cancel time.
            TaskStatus::Canceled => {
                registry.entries.remove(&token);
                drop(registry);
                self.metrics.write().unwrap().responses_discarded += 1;
                self.task_done.notify_all();
                debug!(%token, "canceled task confirmed done, response discarded");
            }
            TaskStatus::Running => {
                let entry = registry
                    .entries
                    .get_mut(&token)
                    .expect("entry checked above");
                let callback = entry.callback.take();
                let request = Arc::clone(&entry.request);
                let duration = entry.started_at.take().map(|t| t.elapsed()).unwrap_or_default();
                drop(registry);

                // User code runs with the registry unlocked.
                let consume = match callback {
                    Some(callback) => callback(token, &request, &response),
                    None => false,
                };

                let mut registry = self.registry.lock().unwrap();
                let status = registry.entries.get(&token).map(|e| e.status);
                match status {
                    // Canceled while the callback ran: same as the canceled arm.
                    Some(TaskStatus::Canceled) => {
                        registry.entries.remove(&token);
                        drop(registry);
                        self.metrics.write().unwrap().responses_discarded += 1;
                        self.task_done.notify_all();
                        debug!(%token, "task canceled during completion, response discarded");
                    }
                    Some(_) => {
                        if consume {
                            registry.entries.remove(&token);
                        } else {
                            let entry = registry
                                .entries
                                .get_mut(&token)
                                .expect("entry checked above");
                            entry.status = TaskStatus::Completed;
                            entry.response = Some(response);
                        }
                        drop(registry);

                        let mut metrics = self.metrics.write().unwrap();
                        metrics.record_completion(duration);
                        if consume {
                            metrics.tasks_collected += 1;
                        }
                        drop(metrics);

                        self.task_done.notify_all();
                        debug!(%token, consumed = consume, "task completed");
                    }
                    None => {
                        drop(registry);
                        self.metrics.write().unwrap().responses_discarded += 1;
                        self.task_done.notify_all();
                        debug!(%token, "task entry gone after callback, response discarded");
                    }
                }
            }
            // A second completion for one token cannot come through a task
            // context; tolerate it without touching the entry.
            status => {
                drop(registry);
                warn!(%token, ?status, "unexpected completion, response discarded");
                self.metrics.write().unwrap().responses_discarded += 1;
            }
        }
    }
}

impl<Q, S> TaskManager<Q, S> {
    /// Block until every in-flight runner has confirmed completion, then
    /// clear the registry.
    ///
    /// Invoked from `Drop`: in-flight tasks are canceled cooperatively, the
    /// "task done" condvar is awaited until none remain, and whatever entries
    /// are left (unclaimed completions, never-started tasks) are dropped.
    pub(super) fn drain(&self) {
        let mut registry = self.shared.registry.lock().unwrap();
        registry.shutting_down = true;
        registry.new_task_seq += 1;

        let mut outstanding = 0usize;
        for (token, entry) in registry.entries.iter_mut() {
            match entry.status {
                TaskStatus::Running => {
                    entry.callback = None;
                    entry.status = TaskStatus::Canceled;
                    if let Some(cancel) = &entry.cancel {
                        cancel.cancel();
                    }
                    debug!(%token, "canceling in-flight task for teardown");
                    outstanding += 1;
                }
                TaskStatus::Canceled => outstanding += 1,
                _ => {}
            }
        }
        self.shared.new_task.notify_all();

        if outstanding > 0 {
            info!(outstanding, "draining in-flight tasks before teardown");
        }

        let started = Instant::now();
        loop {
            let in_flight = registry
                .entries
                .values()
                .filter(|e| matches!(e.status, TaskStatus::Running | TaskStatus::Canceled))
                .count();
            if in_flight == 0 {
                break;
            }
            let (guard, timed_out) = self
                .shared
                .task_done
                .wait_timeout(registry, self.shared.config.drain_warn_interval())
                .unwrap();
            registry = guard;
            if timed_out.timed_out() {
                warn!(
                    in_flight,
                    elapsed_secs = started.elapsed().as_secs(),
                    "teardown still waiting on in-flight tasks"
                );
            }
        }

        let dropped = registry.entries.len();
        registry.entries.clear();
        if dropped > 0 {
            debug!(dropped, "dropped unclaimed task entries at teardown");
        }
    }
}

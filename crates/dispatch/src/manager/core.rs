use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::time::Instant;

use tracing::info;

use fahrplan_core::{CancelFlag, RunnerFactory, TaskToken, TokenGenerator};

use crate::config::ManagerConfig;
use crate::metrics::ManagerMetrics;
use crate::types::{TaskCallback, TaskStatus, TaskStatusInfo};

/// One registry entry, tracked from submission to consumption.
pub(super) struct TaskEntry<Q, S> {
    pub(super) status: TaskStatus,
    pub(super) request: Arc<Q>,
    pub(super) response: Option<S>,
    pub(super) callback: Option<TaskCallback<Q, S>>,
    /// Present while a runner is in flight; the manager's only handle to it.
    pub(super) cancel: Option<CancelFlag>,
    pub(super) started_at: Option<Instant>,
}

/// Registry state guarded by the manager's single mutex.
///
/// The map is keyed by token, so ascending iteration is submission order.
pub(super) struct Registry<Q, S> {
    pub(super) entries: BTreeMap<TaskToken, TaskEntry<Q, S>>,
    pub(super) shutting_down: bool,
    /// Bumped on every submission and on shutdown; lets waiters tell real
    /// signals from spurious condvar wakeups.
    pub(super) new_task_seq: u64,
}

/// Shared internals, behind an `Arc` so task contexts can still reach the
/// completion path while the manager itself is draining.
pub(super) struct Shared<Q, S> {
    pub(super) config: ManagerConfig,
    pub(super) factory: Box<dyn RunnerFactory<Q, S>>,
    pub(super) tokens: TokenGenerator,
    pub(super) registry: Mutex<Registry<Q, S>>,
    pub(super) new_task: Condvar,
    pub(super) task_done: Condvar,
    pub(super) metrics: Arc<RwLock<ManagerMetrics>>,
}

/// The task registry and orchestrator.
///
/// Owns the runner factory, the token generator, and the registry of live
/// tasks. All methods take `&self` and are safe to call from any thread; the
/// registry mutex is never held while user-supplied code (a runner's `run`
/// body or a completion callback) executes.
///
/// Dropping the manager blocks until every in-flight runner has confirmed
/// completion.
pub struct TaskManager<Q, S> {
    pub(super) shared: Arc<Shared<Q, S>>,
}

impl<Q, S> TaskManager<Q, S>
where
    Q: Send + Sync + 'static,
    S: Send + 'static,
{
    /// Create a manager around the given factory, with default config.
    pub fn new(factory: Box<dyn RunnerFactory<Q, S>>) -> Self {
        Self::with_config(factory, ManagerConfig::default())
    }

    pub fn with_config(factory: Box<dyn RunnerFactory<Q, S>>, config: ManagerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                factory,
                tokens: TokenGenerator::new(),
                registry: Mutex::new(Registry {
                    entries: BTreeMap::new(),
                    shutting_down: false,
                    new_task_seq: 0,
                }),
                new_task: Condvar::new(),
                task_done: Condvar::new(),
                metrics: Arc::new(RwLock::new(ManagerMetrics::default())),
            }),
        }
    }

    /// Point-in-time snapshot of registry counts.
    pub fn status_info(&self) -> TaskStatusInfo {
        let registry = self.shared.registry.lock().unwrap();
        let mut info = TaskStatusInfo {
            total: registry.entries.len(),
            ..TaskStatusInfo::default()
        };
        for entry in registry.entries.values() {
            match entry.status {
                TaskStatus::NotStarted => info.not_started += 1,
                TaskStatus::Running => info.running += 1,
                TaskStatus::Completed => info.completed += 1,
                TaskStatus::Canceled => info.canceled += 1,
            }
        }
        info
    }

    /// Snapshot of the manager metrics.
    pub fn metrics(&self) -> ManagerMetrics {
        self.shared.metrics.read().unwrap().clone()
    }

    /// Shared handle to the metrics, for external reads without cloning.
    pub fn metrics_handle(&self) -> Arc<RwLock<ManagerMetrics>> {
        Arc::clone(&self.shared.metrics)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shared.registry.lock().unwrap().shutting_down
    }

    /// Flip the one-way shutdown latch and wake every waiting worker.
    pub fn shut_down(&self) {
        let mut registry = self.shared.registry.lock().unwrap();
        if !registry.shutting_down {
            info!("task manager shutdown requested");
            registry.shutting_down = true;
            registry.new_task_seq += 1;
        }
        drop(registry);
        self.shared.new_task.notify_all();
    }
}

impl<Q, S> Drop for TaskManager<Q, S> {
    fn drop(&mut self) {
        self.drain();
    }
}

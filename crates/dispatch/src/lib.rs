//! fahrplan-dispatch — the task registry and lifecycle manager.
//!
//! Decouples submitting a unit of work from executing it and from collecting
//! its result. Worker threads pull pending tasks in submission order via
//! [`TaskManager::start_oldest_task`], any thread can cancel cooperatively,
//! and a separate consumer collects results through [`TaskManager::take_completed`]
//! or a per-task completion callback.
//!
//! The manager brings no thread pool of its own: callers run worker loops on
//! as many threads as they want, parked on [`TaskManager::wait_for_new_task`]
//! between submissions. Concrete work plugs in through the runner and factory
//! contracts in `fahrplan-core`.

pub mod config;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod types;

pub use config::ManagerConfig;
pub use error::DispatchError;
pub use manager::TaskManager;
pub use metrics::ManagerMetrics;
pub use types::{CompletedTask, TaskCallback, TaskStatus, TaskStatusInfo};

//! Manager operational metrics.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters and timings for one task manager.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ManagerMetrics {
    /// Tasks registered via submission.
    pub tasks_added: u64,
    /// Runs whose response was kept (stored or consumed by a callback).
    pub tasks_completed: u64,
    /// Cancellation requests accepted, before or during execution.
    pub tasks_canceled: u64,
    /// Entries consumed by `take_completed` or a consuming callback.
    pub tasks_collected: u64,
    /// Responses dropped: cancel/complete races and completions for unknown tokens.
    pub responses_discarded: u64,
    /// Rolling mean wall-clock duration of completed runs.
    pub avg_run_duration: Duration,
    /// When the most recent completion arrived.
    pub last_completed_at: Option<DateTime<Utc>>,
}

impl ManagerMetrics {
    /// Record one completed run and fold its duration into the rolling mean.
    pub fn record_completion(&mut self, duration: Duration) {
        self.tasks_completed += 1;
        self.last_completed_at = Some(Utc::now());

        // Incremental mean: new_avg = prev_avg + (duration - prev_avg) / count
        let count = self.tasks_completed;
        self.avg_run_duration = if count == 1 {
            duration
        } else {
            let prev = self.avg_run_duration.as_nanos() as f64;
            let cur = duration.as_nanos() as f64;
            Duration::from_nanos((prev + (cur - prev) / count as f64) as u64)
        };
    }
}

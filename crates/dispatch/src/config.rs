//! Manager configuration, typically parsed from TOML.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Task manager tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Pending-task backlog size above which submissions log a warning.
    #[serde(default = "default_pending_warn")]
    pub pending_warn_threshold: usize,
    /// Seconds between progress warnings while teardown drains in-flight tasks.
    #[serde(default = "default_drain_warn")]
    pub drain_warn_seconds: u64,
}

fn default_pending_warn() -> usize {
    10_000
}
fn default_drain_warn() -> u64 {
    30
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            pending_warn_threshold: default_pending_warn(),
            drain_warn_seconds: default_drain_warn(),
        }
    }
}

impl ManagerConfig {
    /// Interval between drain progress warnings. Floored at one second so a
    /// zeroed config cannot spin the drain loop.
    pub fn drain_warn_interval(&self) -> Duration {
        Duration::from_secs(self.drain_warn_seconds.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.pending_warn_threshold, 10_000);
        assert_eq!(config.drain_warn_seconds, 30);
        assert_eq!(config.drain_warn_interval(), Duration::from_secs(30));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: ManagerConfig = toml::from_str("pending_warn_threshold = 50").unwrap();
        assert_eq!(config.pending_warn_threshold, 50);
        assert_eq!(config.drain_warn_seconds, 30);
    }

    #[test]
    fn full_toml_overrides_everything() {
        let config: ManagerConfig = toml::from_str(
            "pending_warn_threshold = 5\ndrain_warn_seconds = 2\n",
        )
        .unwrap();
        assert_eq!(config.pending_warn_threshold, 5);
        assert_eq!(config.drain_warn_interval(), Duration::from_secs(2));
    }

    #[test]
    fn drain_interval_floors_at_one_second() {
        let config = ManagerConfig {
            drain_warn_seconds: 0,
            ..ManagerConfig::default()
        };
        assert_eq!(config.drain_warn_interval(), Duration::from_secs(1));
    }
}

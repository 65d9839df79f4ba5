//! Engine timing configuration.

use std::time::Duration;

/// Timing constants of a collaboration session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaborationConfig {
    /// Edits of the same field by different users closer than this conflict
    pub conflict_window_ms: i64,
    /// Pending changes older than this are pruned
    pub pending_retention_ms: i64,
    /// Lifetime of a remote edit's active-edit marker
    pub marker_ttl: Duration,
    /// Users not seen for longer than this are not active
    pub staleness_ms: i64,
    /// Interval of the presence re-track; `None` disables it
    pub heartbeat_interval: Option<Duration>,
}

impl Default for CollaborationConfig {
    fn default() -> Self {
        Self {
            conflict_window_ms: 2_000,
            pending_retention_ms: 5_000,
            marker_ttl: Duration::from_millis(3_000),
            staleness_ms: 30_000,
            heartbeat_interval: Some(Duration::from_secs(15)),
        }
    }
}

impl CollaborationConfig {
    pub fn with_heartbeat_interval(mut self, interval: Option<Duration>) -> Self {
        self.heartbeat_interval = interval;
        self
    }
}

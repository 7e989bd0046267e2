//! Configuration for the sync layer.
//!
//! This crate is a library; process-level configuration (env, files)
//! belongs to the host. Hosts construct a [`SyncConfig`] and hand it to
//! the components they build.

use std::time::Duration;

/// Knobs shared by the sync components.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Interval between job status polls
    pub poll_interval: Duration,
    /// Poll attempt budget per job; with the default interval this is a
    /// five-minute wall-clock budget
    pub max_poll_attempts: u32,
    /// Cap on distinct keys tracked by the usage ranking
    pub usage_cap: usize,
    /// How many top-ranked items a preload warms
    pub preload_top_n: usize,
    /// Expiry for preloaded cache entries; `None` keeps entries until
    /// explicitly invalidated
    pub cache_ttl: Option<Duration>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_poll_attempts: 60,
            usage_cap: stockline_engine::DEFAULT_USAGE_CAP,
            preload_top_n: 6,
            cache_ttl: None,
        }
    }
}

impl SyncConfig {
    /// Override the job poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Override the poll attempt budget.
    pub fn with_max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = attempts.max(1);
        self
    }

    /// Override the usage ranking cap.
    pub fn with_usage_cap(mut self, cap: usize) -> Self {
        self.usage_cap = cap.max(1);
        self
    }

    /// Override how many items a preload warms.
    pub fn with_preload_top_n(mut self, n: usize) -> Self {
        self.preload_top_n = n.max(1);
        self
    }

    /// Give preloaded cache entries an expiry.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }
}

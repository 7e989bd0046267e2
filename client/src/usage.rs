//! Usage tracking with best-effort durability.
//!
//! Wraps the engine's [`UsageRanking`] and persists it through the
//! host's keyed storage after every change. Storage failures degrade
//! preload quality only, never correctness, so they are logged and
//! swallowed.

use crate::transport::KeyValueStorage;
use std::sync::Mutex;
use stockline_engine::{Sku, UsageRanking};

/// Storage key the ranking is persisted under.
const USAGE_STORAGE_KEY: &str = "stockline.usage.v1";

/// Per-item interaction tracker backing the preloader.
pub struct UsageTracker {
    ranking: Mutex<UsageRanking>,
    storage: Box<dyn KeyValueStorage>,
}

impl UsageTracker {
    /// Create a tracker, restoring prior counters from storage. A
    /// missing or corrupt snapshot starts fresh.
    pub fn new(storage: Box<dyn KeyValueStorage>, cap: usize) -> Self {
        let ranking = match storage.get(USAGE_STORAGE_KEY) {
            Ok(Some(json)) => match UsageRanking::from_json(&json) {
                Ok(ranking) => ranking,
                Err(e) => {
                    tracing::warn!(error = %e, "corrupt usage snapshot, starting fresh");
                    UsageRanking::new(cap)
                }
            },
            Ok(None) => UsageRanking::new(cap),
            Err(e) => {
                tracing::warn!(error = %e, "usage storage unreadable, starting fresh");
                UsageRanking::new(cap)
            }
        };
        Self {
            ranking: Mutex::new(ranking),
            storage,
        }
    }

    fn lock_ranking(&self) -> std::sync::MutexGuard<'_, UsageRanking> {
        self.ranking
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, ranking: &UsageRanking) {
        let json = match ranking.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize usage ranking");
                return;
            }
        };
        if let Err(e) = self.storage.set(USAGE_STORAGE_KEY, &json) {
            tracing::warn!(error = %e, "failed to persist usage ranking");
        }
    }

    /// Count one interaction with an item. Synchronous and infallible.
    pub fn record_use(&self, sku: &str) {
        let mut ranking = self.lock_ranking();
        ranking.record_use(sku);
        self.persist(&ranking);
    }

    /// The `n` highest-count items, descending, ties by recency.
    pub fn top_n(&self, n: usize) -> Vec<Sku> {
        self.lock_ranking().top_n(n)
    }

    /// Number of distinct tracked items.
    pub fn len(&self) -> usize {
        self.lock_ranking().len()
    }

    /// Whether nothing has been tracked.
    pub fn is_empty(&self) -> bool {
        self.lock_ranking().is_empty()
    }

    /// Drop all counters, persisting the empty state.
    pub fn clear(&self) {
        let mut ranking = self.lock_ranking();
        ranking.clear();
        self.persist(&ranking);
    }
}

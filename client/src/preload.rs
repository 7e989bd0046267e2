//! Speculative preloading.
//!
//! Warms item-detail caches for the most-used SKUs before the user asks
//! for them. Preloading never blocks or fails the interactive path: all
//! errors are caught and logged here.

use crate::batch::{BatchFetchCoordinator, BatchOutcome};
use crate::config::SyncConfig;
use crate::dedup::RequestDeduplicator;
use crate::usage::UsageTracker;
use dashmap::DashMap;
use futures::FutureExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use stockline_engine::{ItemDetail, ItemRequest};

/// Request context a preload scope is built against.
#[derive(Debug, Clone, Default)]
pub struct PreloadContext {
    pub customer_id: Option<String>,
    pub region: Option<String>,
}

/// Observability counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreloadStats {
    /// Preload batches currently in flight
    pub active_preloads: usize,
    /// Distinct scopes ever preloaded (survives `clear_preloads`)
    pub total_scopes: usize,
}

/// A resolved cache slot.
#[derive(Debug, Clone)]
struct CacheEntry {
    detail: ItemDetail,
    inserted_at: Instant,
}

/// Warms and serves the item-detail read cache.
pub struct Preloader {
    usage: Arc<UsageTracker>,
    dedup: RequestDeduplicator<BatchOutcome>,
    coordinator: Arc<BatchFetchCoordinator>,
    /// Scopes preloaded since the last `clear_preloads`
    history: DashMap<String, ()>,
    /// Resolved details keyed by request signature
    cache: DashMap<String, CacheEntry>,
    total_scopes: AtomicUsize,
    top_n: usize,
    cache_ttl: Option<Duration>,
}

impl Preloader {
    pub fn new(
        usage: Arc<UsageTracker>,
        dedup: RequestDeduplicator<BatchOutcome>,
        coordinator: Arc<BatchFetchCoordinator>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            usage,
            dedup,
            coordinator,
            history: DashMap::new(),
            cache: DashMap::new(),
            total_scopes: AtomicUsize::new(0),
            top_n: config.preload_top_n,
            cache_ttl: config.cache_ttl,
        }
    }

    /// Warm the cache for one scope. Re-triggering a scope already
    /// preloaded (or in flight) is a no-op until [`clear_preloads`].
    /// Never fails: preloading is speculative and all errors end here.
    ///
    /// [`clear_preloads`]: Preloader::clear_preloads
    pub async fn preload(&self, scope_key: &str, context: &PreloadContext) {
        if self.history.contains_key(scope_key) {
            tracing::debug!(scope = scope_key, "scope already preloaded, skipping");
            return;
        }
        self.history.insert(scope_key.to_string(), ());
        self.total_scopes.fetch_add(1, Ordering::Relaxed);

        let skus = self.usage.top_n(self.top_n);
        if skus.is_empty() {
            tracing::debug!(scope = scope_key, "no usage history, nothing to preload");
            return;
        }

        let requests: Vec<ItemRequest> = skus
            .into_iter()
            .map(|sku| ItemRequest {
                sku,
                customer_id: context.customer_id.clone(),
                region: context.region.clone(),
            })
            .collect();

        let coordinator = Arc::clone(&self.coordinator);
        let batch = requests.clone();
        let handle = match self.dedup.acquire(scope_key, move || {
            Ok(async move { Ok(coordinator.fetch_many(batch).await) }.boxed())
        }) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(scope = scope_key, error = %e, "preload could not start");
                return;
            }
        };

        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(scope = scope_key, error = %e, "preload batch failed");
                return;
            }
        };
        if let Some(e) = &outcome.failure {
            tracing::warn!(scope = scope_key, error = %e, "preload degraded to placeholders");
        }

        let now = Instant::now();
        for (request, detail) in requests.iter().zip(outcome.details) {
            // Placeholders are not worth caching; the real value may
            // succeed on the next explicit fetch.
            if detail.placeholder {
                continue;
            }
            self.cache.insert(
                request.signature(),
                CacheEntry {
                    detail,
                    inserted_at: now,
                },
            );
        }
        tracing::debug!(scope = scope_key, cached = self.cache.len(), "preload complete");
    }

    /// A preloaded detail for this request, if present and not expired.
    pub fn cached(&self, request: &ItemRequest) -> Option<ItemDetail> {
        let signature = request.signature();
        let expired = match self.cache.get(&signature) {
            Some(entry) => match self.cache_ttl {
                Some(ttl) => entry.inserted_at.elapsed() > ttl,
                None => return Some(entry.detail.clone()),
            },
            None => return None,
        };
        if expired {
            self.cache.remove(&signature);
            return None;
        }
        self.cache.get(&signature).map(|e| e.detail.clone())
    }

    /// Drop one cached detail.
    pub fn invalidate(&self, request: &ItemRequest) {
        self.cache.remove(&request.signature());
    }

    /// Forget preload history and cached details, e.g. on a context
    /// switch to a different customer or region.
    pub fn clear_preloads(&self) {
        self.history.clear();
        self.cache.clear();
    }

    /// Count one interaction with an item.
    pub fn track_usage(&self, sku: &str) {
        self.usage.record_use(sku);
    }

    /// Observability counters.
    pub fn stats(&self) -> PreloadStats {
        PreloadStats {
            active_preloads: self.dedup.in_flight(),
            total_scopes: self.total_scopes.load(Ordering::Relaxed),
        }
    }
}

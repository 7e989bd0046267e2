//! Request de-duplication.
//!
//! Guarantees at most one outstanding operation per key process-wide:
//! while a handle for a key is in flight, every caller gets the same
//! shared future instead of issuing a new network call. Registrations
//! are removed when the handle settles, success or failure.

use crate::error::Result;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;

/// The shared handle returned to every caller of the same key.
pub type SharedHandle<T> = Shared<BoxFuture<'static, Result<T>>>;

/// De-duplicates in-flight operations by key.
#[derive(Debug)]
pub struct RequestDeduplicator<T: Clone> {
    in_flight: Arc<DashMap<String, SharedHandle<T>>>,
}

impl<T: Clone + Send + Sync + 'static> Default for RequestDeduplicator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for RequestDeduplicator<T> {
    fn clone(&self) -> Self {
        Self {
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> RequestDeduplicator<T> {
    /// Create an empty deduplicator.
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Return the in-flight handle for `key` if one exists, otherwise
    /// start a new one via `start` and register it until it settles.
    ///
    /// If `start` fails synchronously the key is never registered and
    /// the error is returned directly. No map lock is held while
    /// `start` runs, so it may call back into this deduplicator. No
    /// await happens between the existence check and registration, so
    /// at most one registered handle exists per key; if two threads
    /// race, the loser's future is dropped unpolled and never runs.
    pub fn acquire<F>(&self, key: &str, start: F) -> Result<SharedHandle<T>>
    where
        F: FnOnce() -> Result<BoxFuture<'static, Result<T>>>,
    {
        if let Some(existing) = self.in_flight.get(key) {
            tracing::debug!(key, "joining in-flight request");
            return Ok(existing.value().clone());
        }

        let fut = start()?;
        let in_flight = Arc::clone(&self.in_flight);
        let owned_key = key.to_string();
        let wrapped: BoxFuture<'static, Result<T>> = async move {
            let outcome = fut.await;
            in_flight.remove(&owned_key);
            outcome
        }
        .boxed();
        let shared = wrapped.shared();

        match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(existing) => {
                tracing::debug!(key, "joining in-flight request");
                Ok(existing.get().clone())
            }
            Entry::Vacant(slot) => {
                slot.insert(shared.clone());
                Ok(shared)
            }
        }
    }

    /// Number of operations currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

//! Usage ranking for speculative preloading.
//!
//! Counts per-SKU interactions and answers top-N queries. The table is
//! capped: when the number of distinct keys would exceed the cap, the
//! lowest-count entries are evicted first (least recently used breaks
//! count ties). Recency is a monotonic sequence number, not wall-clock
//! time, so ranking is deterministic.

use crate::{error::Result, Error, Sku};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default cap on distinct tracked keys.
pub const DEFAULT_USAGE_CAP: usize = 20;

/// Per-key interaction counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageCounter {
    /// Monotonically increasing use count
    count: u64,
    /// Sequence number of the most recent increment
    last_used_seq: u64,
}

/// Capped counter table with deterministic top-N ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRanking {
    cap: usize,
    seq: u64,
    counters: HashMap<Sku, UsageCounter>,
}

impl Default for UsageRanking {
    fn default() -> Self {
        Self::new(DEFAULT_USAGE_CAP)
    }
}

impl UsageRanking {
    /// Create an empty ranking with the given key cap.
    pub fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            seq: 0,
            counters: HashMap::new(),
        }
    }

    /// Count one interaction with a key, creating it if absent. Evicts
    /// the lowest-count entries when the cap is exceeded.
    pub fn record_use(&mut self, key: &str) {
        self.seq += 1;
        let seq = self.seq;
        self.counters
            .entry(key.to_string())
            .and_modify(|c| {
                c.count += 1;
                c.last_used_seq = seq;
            })
            .or_insert(UsageCounter {
                count: 1,
                last_used_seq: seq,
            });

        while self.counters.len() > self.cap {
            // Lowest count goes first; among equals the stalest entry.
            if let Some(victim) = self
                .counters
                .iter()
                .min_by_key(|(_, c)| (c.count, c.last_used_seq))
                .map(|(k, _)| k.clone())
            {
                self.counters.remove(&victim);
            } else {
                break;
            }
        }
    }

    /// The `n` highest-count keys, descending; ties broken by most
    /// recent use first.
    pub fn top_n(&self, n: usize) -> Vec<Sku> {
        let mut entries: Vec<_> = self.counters.iter().collect();
        entries.sort_by(|(_, a), (_, b)| {
            b.count
                .cmp(&a.count)
                .then(b.last_used_seq.cmp(&a.last_used_seq))
        });
        entries.into_iter().take(n).map(|(k, _)| k.clone()).collect()
    }

    /// Number of distinct tracked keys.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Whether no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Drop all counters. The sequence keeps advancing so recency stays
    /// monotonic across clears.
    pub fn clear(&mut self) {
        self.counters.clear();
    }

    /// Serialize for durable keyed storage.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Restore from durable keyed storage.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_n(ranking: &mut UsageRanking, key: &str, n: usize) {
        for _ in 0..n {
            ranking.record_use(key);
        }
    }

    #[test]
    fn top_n_ranks_by_count() {
        let mut ranking = UsageRanking::default();
        record_n(&mut ranking, "SP-1", 5);
        record_n(&mut ranking, "SP-2", 3);

        assert_eq!(ranking.top_n(1), vec!["SP-1"]);
        assert_eq!(ranking.top_n(5), vec!["SP-1", "SP-2"]);
    }

    #[test]
    fn ties_broken_by_recency() {
        let mut ranking = UsageRanking::default();
        record_n(&mut ranking, "SP-1", 2);
        record_n(&mut ranking, "SP-2", 2); // same count, used later

        assert_eq!(ranking.top_n(2), vec!["SP-2", "SP-1"]);
    }

    #[test]
    fn cap_evicts_lowest_count_first() {
        let mut ranking = UsageRanking::new(2);
        record_n(&mut ranking, "SP-1", 5);
        record_n(&mut ranking, "SP-2", 1);
        record_n(&mut ranking, "SP-3", 3); // exceeds cap, SP-2 evicted

        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking.top_n(3), vec!["SP-1", "SP-3"]);
    }

    #[test]
    fn eviction_ties_drop_stalest() {
        let mut ranking = UsageRanking::new(2);
        ranking.record_use("SP-1");
        ranking.record_use("SP-2");
        ranking.record_use("SP-3"); // SP-1 and SP-2 both count 1; SP-1 stalest

        assert_eq!(ranking.top_n(3), vec!["SP-3", "SP-2"]);
    }

    #[test]
    fn recounting_survivor_is_not_reset() {
        let mut ranking = UsageRanking::new(20);
        record_n(&mut ranking, "SP-1", 4);
        ranking.record_use("SP-1");

        let mut entries = ranking.top_n(1);
        assert_eq!(entries.pop().as_deref(), Some("SP-1"));
        assert_eq!(ranking.counters["SP-1"].count, 5);
    }

    #[test]
    fn clear_resets_counters() {
        let mut ranking = UsageRanking::default();
        record_n(&mut ranking, "SP-1", 3);
        ranking.clear();

        assert!(ranking.is_empty());
        assert!(ranking.top_n(5).is_empty());
    }

    #[test]
    fn json_roundtrip() {
        let mut ranking = UsageRanking::new(10);
        record_n(&mut ranking, "SP-1", 2);
        record_n(&mut ranking, "SP-2", 7);

        let json = ranking.to_json().unwrap();
        let restored = UsageRanking::from_json(&json).unwrap();
        assert_eq!(restored, ranking);
        assert_eq!(restored.top_n(1), vec!["SP-2"]);
    }

    #[test]
    fn corrupt_json_rejected() {
        let result = UsageRanking::from_json("{not json");
        assert!(matches!(result, Err(Error::InvalidSnapshot(_))));
    }
}

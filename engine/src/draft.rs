//! Draft - the visible-list state container.
//!
//! The Draft holds the ordered list of line records the UI renders. It
//! applies tentative edits immediately and later reconciles them against
//! the server's outcome, or rolls them back. Every method completes
//! before returning, so a reader only ever observes fully Pending, fully
//! Confirmed, or removed records.
//!
//! Outcomes are matched against the generation recorded when the
//! operation was dispatched. A mismatch (or a record that is gone) means
//! the operation was superseded or cancelled; the outcome is reported as
//! [`Reconciled::Stale`] and nothing is applied.

use crate::{error::Result, Cents, Error, Generation, LineItem, LineRecord, LineStatus, RecordId};
use serde::{Deserialize, Serialize};

/// Result of delivering a confirming outcome to the draft.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled<T> {
    /// The outcome matched the record's current generation and was applied.
    Applied(T),
    /// The operation was superseded or cancelled; nothing was applied.
    Stale,
}

impl<T> Reconciled<T> {
    /// Whether the outcome was applied.
    pub fn is_applied(&self) -> bool {
        matches!(self, Reconciled::Applied(_))
    }
}

/// How a rejected operation was rolled back.
#[derive(Debug, Clone, PartialEq)]
pub enum Rollback {
    /// The record was a creation; it was removed from the visible list.
    /// The removed copy carries [`LineStatus::Failed`].
    Removed(LineRecord),
    /// The record was a staged update; its baseline value was restored.
    Restored,
}

/// A record removed from the visible list, with enough context to put it
/// back in place if the removal fails server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedLine {
    /// Position the record occupied
    pub index: usize,
    /// The record itself
    pub record: LineRecord,
}

/// A generation-insensitive view of the draft, used to compare states
/// across a mutation/rollback cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSnapshot {
    /// Visible records in order, generations normalized to zero
    pub lines: Vec<LineRecord>,
}

/// The ordered visible list of line records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    records: Vec<LineRecord>,
}

impl Draft {
    /// Create an empty draft.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    fn position(&self, id: &RecordId) -> Option<usize> {
        self.records.iter().position(|r| &r.id == id)
    }

    /// Get a record by id.
    pub fn get(&self, id: &RecordId) -> Option<&LineRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    /// All visible records, in insertion order.
    pub fn lines(&self) -> &[LineRecord] {
        &self.records
    }

    /// Count of visible records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the draft has no visible records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Count of records awaiting acknowledgement.
    pub fn pending_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_pending()).count()
    }

    /// Running total over server-acknowledged records only. Pending
    /// records are excluded until their value is confirmed.
    pub fn confirmed_total_cents(&self) -> Cents {
        self.records
            .iter()
            .filter(|r| r.is_confirmed())
            .map(|r| r.item.line_total_cents())
            .sum()
    }

    /// Running total over everything currently rendered, pending included.
    pub fn visible_total_cents(&self) -> Cents {
        self.records
            .iter()
            .map(|r| r.item.line_total_cents())
            .sum()
    }

    /// Stage an optimistic creation. The record becomes visible
    /// immediately with status Pending and generation 0.
    pub fn insert_pending(&mut self, id: RecordId, item: LineItem) -> Result<()> {
        if self.position(&id).is_some() {
            return Err(Error::RecordAlreadyExists(id.to_string()));
        }
        self.records.push(LineRecord::pending(id, item));
        Ok(())
    }

    /// Insert a record already acknowledged by the server, e.g. when
    /// loading an existing order.
    pub fn seed_confirmed(&mut self, id: RecordId, item: LineItem) -> Result<()> {
        if self.position(&id).is_some() {
            return Err(Error::RecordAlreadyExists(id.to_string()));
        }
        self.records.push(LineRecord::confirmed(id, item));
        Ok(())
    }

    /// Stage an optimistic update. The new value is applied visibly, the
    /// replaced confirmed value is captured as the rollback baseline, and
    /// the generation is bumped so any outcome still outstanding for this
    /// record becomes stale. Returns the new generation, which the caller
    /// must carry alongside the confirming operation it dispatches.
    pub fn stage_update(&mut self, id: &RecordId, item: LineItem) -> Result<Generation> {
        let pos = self
            .position(id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
        let record = &mut self.records[pos];

        // A confirmed value becomes the baseline; a pending record keeps
        // whatever baseline it already has (None for a creation).
        if record.status == LineStatus::Confirmed {
            record.baseline = Some(record.item.clone());
        }
        record.item = item;
        record.status = LineStatus::Pending;
        record.generation += 1;
        Ok(record.generation)
    }

    /// Deliver a successful confirming outcome. The record transitions
    /// Pending -> Confirmed, takes the server-assigned id and value, and
    /// drops its rollback baseline.
    pub fn confirm(
        &mut self,
        id: &RecordId,
        generation: Generation,
        server_id: impl Into<String>,
        item: LineItem,
    ) -> Result<Reconciled<()>> {
        let pos = match self.position(id) {
            Some(pos) if self.records[pos].generation == generation => pos,
            _ => return Ok(Reconciled::Stale),
        };
        let record = &mut self.records[pos];
        if record.status != LineStatus::Pending {
            return Err(Error::InvalidTransition {
                id: id.to_string(),
                from: record.status,
                to: LineStatus::Confirmed,
            });
        }
        record.id = RecordId::Confirmed(server_id.into());
        record.item = item;
        record.status = LineStatus::Confirmed;
        record.baseline = None;
        record.generation += 1;
        Ok(Reconciled::Applied(()))
    }

    /// Deliver a failed confirming outcome. A creation is removed from
    /// the visible list; a staged update is restored to its baseline.
    pub fn reject(&mut self, id: &RecordId, generation: Generation) -> Result<Reconciled<Rollback>> {
        let pos = match self.position(id) {
            Some(pos) if self.records[pos].generation == generation => pos,
            _ => return Ok(Reconciled::Stale),
        };
        if self.records[pos].status != LineStatus::Pending {
            return Err(Error::InvalidTransition {
                id: id.to_string(),
                from: self.records[pos].status,
                to: LineStatus::Failed,
            });
        }
        match self.records[pos].baseline.take() {
            Some(baseline) => {
                let record = &mut self.records[pos];
                record.item = baseline;
                record.status = LineStatus::Confirmed;
                record.generation += 1;
                Ok(Reconciled::Applied(Rollback::Restored))
            }
            None => {
                let mut record = self.records.remove(pos);
                record.status = LineStatus::Failed;
                Ok(Reconciled::Applied(Rollback::Removed(record)))
            }
        }
    }

    /// Remove a record from the visible list, keeping its position for a
    /// possible reinsert.
    pub fn remove(&mut self, id: &RecordId) -> Result<RemovedLine> {
        let pos = self
            .position(id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
        Ok(RemovedLine {
            index: pos,
            record: self.records.remove(pos),
        })
    }

    /// Put a removed record back, e.g. when a deletion failed server-side.
    pub fn reinsert(&mut self, removed: RemovedLine) {
        let index = removed.index.min(self.records.len());
        self.records.insert(index, removed.record);
    }

    /// Invalidate any outstanding outcome for this record without
    /// touching its visible value. Returns the new generation.
    pub fn bump_generation(&mut self, id: &RecordId) -> Result<Generation> {
        let pos = self
            .position(id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
        self.records[pos].generation += 1;
        Ok(self.records[pos].generation)
    }

    /// A generation-insensitive copy of the visible state.
    pub fn snapshot(&self) -> DraftSnapshot {
        let lines = self
            .records
            .iter()
            .cloned()
            .map(|mut r| {
                r.generation = 0;
                r
            })
            .collect();
        DraftSnapshot { lines }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tentative(id: &str) -> RecordId {
        RecordId::Tentative(id.into())
    }

    fn confirmed(id: &str) -> RecordId {
        RecordId::Confirmed(id.into())
    }

    #[test]
    fn insert_pending_is_visible_but_not_counted() {
        let mut draft = Draft::new();
        draft
            .insert_pending(tentative("t-1"), LineItem::new("SP-1", 10_000, 2))
            .unwrap();

        assert_eq!(draft.len(), 1);
        assert_eq!(draft.pending_count(), 1);
        assert_eq!(draft.confirmed_total_cents(), 0);
        assert_eq!(draft.visible_total_cents(), 20_000);
    }

    #[test]
    fn insert_duplicate_rejected() {
        let mut draft = Draft::new();
        draft
            .insert_pending(tentative("t-1"), LineItem::new("SP-1", 100, 1))
            .unwrap();
        let result = draft.insert_pending(tentative("t-1"), LineItem::new("SP-2", 100, 1));
        assert!(matches!(result, Err(Error::RecordAlreadyExists(_))));
    }

    #[test]
    fn confirm_reassigns_id_and_counts_total() {
        let mut draft = Draft::new();
        draft
            .insert_pending(tentative("t-1"), LineItem::new("SP-1", 10_000, 2))
            .unwrap();

        let outcome = draft
            .confirm(&tentative("t-1"), 0, "srv-1", LineItem::new("SP-1", 10_000, 2))
            .unwrap();
        assert!(outcome.is_applied());

        assert!(draft.get(&tentative("t-1")).is_none());
        let record = draft.get(&confirmed("srv-1")).unwrap();
        assert!(record.is_confirmed());
        assert!(record.baseline.is_none());
        assert_eq!(draft.confirmed_total_cents(), 20_000);
    }

    #[test]
    fn confirm_with_old_generation_is_stale() {
        let mut draft = Draft::new();
        draft
            .insert_pending(tentative("t-1"), LineItem::new("SP-1", 100, 1))
            .unwrap();
        draft
            .stage_update(&tentative("t-1"), LineItem::new("SP-1", 100, 5))
            .unwrap();

        // The creation's outcome carried generation 0; superseded.
        let outcome = draft
            .confirm(&tentative("t-1"), 0, "srv-1", LineItem::new("SP-1", 100, 1))
            .unwrap();
        assert_eq!(outcome, Reconciled::Stale);
        assert_eq!(draft.get(&tentative("t-1")).unwrap().item.quantity, 5);
    }

    #[test]
    fn confirm_missing_record_is_stale() {
        let mut draft = Draft::new();
        let outcome = draft
            .confirm(&tentative("gone"), 0, "srv-1", LineItem::new("SP-1", 100, 1))
            .unwrap();
        assert_eq!(outcome, Reconciled::Stale);
    }

    #[test]
    fn confirm_twice_is_invalid() {
        let mut draft = Draft::new();
        draft
            .insert_pending(tentative("t-1"), LineItem::new("SP-1", 100, 1))
            .unwrap();
        draft
            .confirm(&tentative("t-1"), 0, "srv-1", LineItem::new("SP-1", 100, 1))
            .unwrap();

        // Generation moved on confirm, so a replay is stale, not invalid.
        let replay = draft
            .confirm(&confirmed("srv-1"), 0, "srv-1", LineItem::new("SP-1", 100, 1))
            .unwrap();
        assert_eq!(replay, Reconciled::Stale);

        // A confirm aimed at the now-Confirmed record with the current
        // generation violates the once-only transition.
        let current = draft.get(&confirmed("srv-1")).unwrap().generation;
        let result = draft.confirm(&confirmed("srv-1"), current, "srv-1", LineItem::new("SP-1", 100, 1));
        assert!(matches!(result, Err(Error::InvalidTransition { .. })));
    }

    #[test]
    fn reject_creation_removes_record() {
        let mut draft = Draft::new();
        draft
            .insert_pending(tentative("t-1"), LineItem::new("SP-1", 10_000, 2))
            .unwrap();

        let outcome = draft.reject(&tentative("t-1"), 0).unwrap();
        match outcome {
            Reconciled::Applied(Rollback::Removed(record)) => {
                assert_eq!(record.status, LineStatus::Failed);
            }
            other => panic!("expected removal, got {other:?}"),
        }
        assert!(draft.is_empty());
        assert_eq!(draft.confirmed_total_cents(), 0);
    }

    #[test]
    fn reject_update_restores_baseline() {
        let mut draft = Draft::new();
        draft
            .seed_confirmed(confirmed("srv-1"), LineItem::new("SP-1", 10_000, 2))
            .unwrap();

        let generation = draft
            .stage_update(&confirmed("srv-1"), LineItem::new("SP-1", 10_000, 9))
            .unwrap();
        assert_eq!(draft.confirmed_total_cents(), 0); // pending while staged
        assert_eq!(draft.visible_total_cents(), 90_000);

        let outcome = draft.reject(&confirmed("srv-1"), generation).unwrap();
        assert_eq!(outcome, Reconciled::Applied(Rollback::Restored));

        let record = draft.get(&confirmed("srv-1")).unwrap();
        assert!(record.is_confirmed());
        assert_eq!(record.item.quantity, 2);
        assert_eq!(draft.confirmed_total_cents(), 20_000);
    }

    #[test]
    fn stage_update_keeps_first_baseline_when_superseding() {
        let mut draft = Draft::new();
        draft
            .seed_confirmed(confirmed("srv-1"), LineItem::new("SP-1", 100, 2))
            .unwrap();

        let first = draft
            .stage_update(&confirmed("srv-1"), LineItem::new("SP-1", 100, 5))
            .unwrap();
        let second = draft
            .stage_update(&confirmed("srv-1"), LineItem::new("SP-1", 100, 7))
            .unwrap();
        assert!(second > first);

        // Rolling back the superseding update restores the original
        // confirmed value, not the intermediate one.
        draft.reject(&confirmed("srv-1"), second).unwrap();
        assert_eq!(draft.get(&confirmed("srv-1")).unwrap().item.quantity, 2);
    }

    #[test]
    fn stage_update_missing_record() {
        let mut draft = Draft::new();
        let result = draft.stage_update(&confirmed("ghost"), LineItem::new("SP-1", 100, 1));
        assert!(matches!(result, Err(Error::RecordNotFound(_))));
    }

    #[test]
    fn remove_and_reinsert_preserve_position() {
        let mut draft = Draft::new();
        draft
            .seed_confirmed(confirmed("srv-1"), LineItem::new("SP-1", 100, 1))
            .unwrap();
        draft
            .seed_confirmed(confirmed("srv-2"), LineItem::new("SP-2", 200, 1))
            .unwrap();
        draft
            .seed_confirmed(confirmed("srv-3"), LineItem::new("SP-3", 300, 1))
            .unwrap();

        let removed = draft.remove(&confirmed("srv-2")).unwrap();
        assert_eq!(removed.index, 1);
        assert_eq!(draft.len(), 2);

        draft.reinsert(removed);
        let skus: Vec<_> = draft.lines().iter().map(|r| r.item.sku.as_str()).collect();
        assert_eq!(skus, vec!["SP-1", "SP-2", "SP-3"]);
    }

    #[test]
    fn bump_generation_makes_outcomes_stale() {
        let mut draft = Draft::new();
        draft
            .insert_pending(tentative("t-1"), LineItem::new("SP-1", 100, 1))
            .unwrap();
        draft.bump_generation(&tentative("t-1")).unwrap();

        let outcome = draft.reject(&tentative("t-1"), 0).unwrap();
        assert_eq!(outcome, Reconciled::Stale);
        assert_eq!(draft.len(), 1);
    }

    #[test]
    fn snapshot_ignores_generations() {
        let mut draft = Draft::new();
        draft
            .seed_confirmed(confirmed("srv-1"), LineItem::new("SP-1", 100, 1))
            .unwrap();
        let before = draft.snapshot();

        draft.bump_generation(&confirmed("srv-1")).unwrap();
        assert_eq!(draft.snapshot(), before);
    }

    #[test]
    fn mixed_totals() {
        let mut draft = Draft::new();
        draft
            .seed_confirmed(confirmed("srv-1"), LineItem::new("SP-1", 1000, 3))
            .unwrap();
        draft
            .insert_pending(tentative("t-1"), LineItem::new("SP-2", 500, 4))
            .unwrap();

        assert_eq!(draft.confirmed_total_cents(), 3000);
        assert_eq!(draft.visible_total_cents(), 5000);
    }
}

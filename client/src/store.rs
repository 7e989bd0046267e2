//! Optimistic mutation store.
//!
//! The top-level coordinator of the sync layer. A mutation intent is
//! applied to the visible draft immediately, then a confirming call is
//! dispatched in the background. The outcome either reconciles the
//! tentative state (server id and value take over) or rolls it back.
//! Confirming calls that report a job id are delegated to the
//! [`JobPoller`].
//!
//! Every outcome carries the (id, generation) snapshot taken at
//! dispatch. If the record was superseded, deleted, or cancelled in the
//! meantime, the outcome is stale and silently discarded; the UI never
//! sees a value the server rejected, and never sees a notification for
//! an action the user abandoned.

use crate::config::SyncConfig;
use crate::error::Result;
use crate::poller::{JobCallbacks, JobPoller};
use crate::transport::{
    transport_error, Confirmation, ConfirmTransport, ConfirmedLine, JobStatusClient,
    MutationIntent,
};
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use stockline_engine::{Cents, Draft, Generation, LineItem, LineRecord, RecordId, RemovedLine};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Severity of a user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// One user-visible notification. Exactly one fires per logical user
/// action, never one per retry or poll tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

/// Which reconciliation rules apply to an outcome.
#[derive(Debug, Clone, Copy)]
enum ReconcileAction {
    /// Creation or update: confirm into the draft, or reject/roll back.
    Upsert,
    /// Deletion: success keeps the record gone, failure reinstates it.
    Delete,
}

struct StoreInner {
    draft: Mutex<Draft>,
    confirm: Arc<dyn ConfirmTransport>,
    poller: JobPoller,
    /// Records removed optimistically whose deletion is still being
    /// confirmed; absent means the deletion was cancelled or settled.
    pending_deletes: DashMap<RecordId, RemovedLine>,
    /// Job id currently polled per record, so superseding or cancelling
    /// the record stops the loop.
    jobs: DashMap<RecordId, String>,
    notifications: mpsc::UnboundedSender<Notification>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Notification>>>,
}

impl StoreInner {
    fn lock_draft(&self) -> MutexGuard<'_, Draft> {
        // The draft stays consistent even if a panicking thread poisoned
        // the lock; every transition is applied atomically.
        self.draft.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self, kind: NotificationKind, message: impl Into<String>) {
        let _ = self.notifications.send(Notification {
            kind,
            message: message.into(),
        });
    }

    fn apply_success(
        inner: &Arc<StoreInner>,
        id: &RecordId,
        generation: Generation,
        line: Option<ConfirmedLine>,
        action: ReconcileAction,
    ) {
        match action {
            ReconcileAction::Upsert => {
                let Some(line) = line else {
                    Self::apply_failure(
                        inner,
                        id,
                        generation,
                        transport_error("confirmation carried no line"),
                        action,
                    );
                    return;
                };
                let applied = {
                    let mut draft = inner.lock_draft();
                    match draft.confirm(id, generation, line.id.clone(), line.item.clone()) {
                        Ok(outcome) => outcome.is_applied(),
                        Err(e) => {
                            tracing::error!(id = %id, error = %e, "confirmation not applicable");
                            false
                        }
                    }
                };
                if applied {
                    inner.notify(NotificationKind::Success, "Line saved");
                } else {
                    tracing::debug!(id = %id, "stale confirmation discarded");
                }
            }
            ReconcileAction::Delete => {
                if inner.pending_deletes.remove(id).is_some() {
                    inner.notify(NotificationKind::Success, "Line removed");
                } else {
                    tracing::debug!(id = %id, "stale deletion outcome discarded");
                }
            }
        }
    }

    fn apply_failure(
        inner: &Arc<StoreInner>,
        id: &RecordId,
        generation: Generation,
        error: crate::error::SyncError,
        action: ReconcileAction,
    ) {
        match action {
            ReconcileAction::Upsert => {
                let applied = {
                    let mut draft = inner.lock_draft();
                    match draft.reject(id, generation) {
                        Ok(outcome) => outcome.is_applied(),
                        Err(e) => {
                            tracing::error!(id = %id, error = %e, "rollback not applicable");
                            false
                        }
                    }
                };
                if applied {
                    inner.notify(NotificationKind::Error, error.to_string());
                } else {
                    tracing::debug!(id = %id, error = %error, "stale failure discarded");
                }
            }
            ReconcileAction::Delete => match inner.pending_deletes.remove(id) {
                Some((_, removed)) => {
                    inner.lock_draft().reinsert(removed);
                    inner.notify(
                        NotificationKind::Error,
                        format!("could not remove line: {error}"),
                    );
                }
                None => {
                    tracing::debug!(id = %id, "stale deletion failure discarded");
                }
            },
        }
    }

    fn delegate_to_poller(
        inner: &Arc<StoreInner>,
        id: RecordId,
        generation: Generation,
        job_id: String,
        action: ReconcileAction,
    ) {
        inner.jobs.insert(id.clone(), job_id.clone());

        let success_inner = Arc::clone(inner);
        let success_id = id.clone();
        let error_inner = Arc::clone(inner);
        let error_id = id.clone();
        let complete_inner = Arc::clone(inner);
        let complete_id = id.clone();

        let callbacks = JobCallbacks {
            on_success: Box::new(move |value| {
                let line = if value.is_null() {
                    None
                } else {
                    match serde_json::from_value::<ConfirmedLine>(value) {
                        Ok(line) => Some(line),
                        Err(e) => {
                            StoreInner::apply_failure(
                                &success_inner,
                                &success_id,
                                generation,
                                transport_error(format!("malformed job result: {e}")),
                                action,
                            );
                            return;
                        }
                    }
                };
                StoreInner::apply_success(&success_inner, &success_id, generation, line, action);
            }),
            on_error: Box::new(move |e| {
                StoreInner::apply_failure(&error_inner, &error_id, generation, e, action);
            }),
            on_complete: Box::new(move || {
                complete_inner.jobs.remove(&complete_id);
            }),
        };

        if let Err(e) = inner.poller.track(&job_id, callbacks) {
            inner.jobs.remove(&id);
            Self::apply_failure(inner, &id, generation, e, action);
        }
    }
}

/// Applies tentative edits immediately and reconciles them against the
/// server's confirming outcome.
///
/// Construct inside a tokio runtime: confirming calls run on spawned
/// tasks.
pub struct OptimisticStore {
    inner: Arc<StoreInner>,
}

impl OptimisticStore {
    pub fn new(
        confirm: Arc<dyn ConfirmTransport>,
        status: Arc<dyn JobStatusClient>,
        config: &SyncConfig,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(StoreInner {
                draft: Mutex::new(Draft::new()),
                confirm,
                poller: JobPoller::new(status, config),
                pending_deletes: DashMap::new(),
                jobs: DashMap::new(),
                notifications: tx,
                receiver: Mutex::new(Some(rx)),
            }),
        }
    }

    /// Take the notification stream. Yields `None` after the first call.
    pub fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<Notification>> {
        self.inner
            .receiver
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    /// Load lines the server already acknowledged, e.g. an existing
    /// order opened for editing.
    pub fn seed_confirmed(&self, lines: Vec<ConfirmedLine>) -> Result<()> {
        let mut draft = self.inner.lock_draft();
        for line in lines {
            draft.seed_confirmed(RecordId::Confirmed(line.id), line.item)?;
        }
        Ok(())
    }

    /// Stage an optimistic creation. The line renders immediately under
    /// a collision-proof tentative id while the confirming call runs.
    pub fn add_optimistic(&self, item: LineItem) -> RecordId {
        let id = RecordId::Tentative(Uuid::new_v4().to_string());
        {
            let mut draft = self.inner.lock_draft();
            if let Err(e) = draft.insert_pending(id.clone(), item.clone()) {
                // A fresh uuid cannot collide.
                tracing::error!(id = %id, error = %e, "failed to stage optimistic creation");
                return id;
            }
        }
        tracing::debug!(id = %id, sku = %item.sku, "optimistic creation staged");
        self.spawn_confirm(
            id.clone(),
            0,
            MutationIntent::Create { item },
            ReconcileAction::Upsert,
        );
        id
    }

    /// Stage an optimistic update. The new value renders immediately;
    /// the replaced confirmed value is kept for rollback. Any
    /// outstanding confirming operation for this record is superseded:
    /// its eventual outcome is discarded, it is never run twice.
    pub fn update_optimistic(&self, id: &RecordId, item: LineItem) -> Result<()> {
        let generation = {
            let mut draft = self.inner.lock_draft();
            draft.stage_update(id, item.clone())?
        };
        if let Some((_, job_id)) = self.inner.jobs.remove(id) {
            self.inner.poller.cancel(&job_id);
        }
        let intent = match id {
            // Never confirmed server-side, so the superseding value is
            // still a creation.
            RecordId::Tentative(_) => MutationIntent::Create { item },
            RecordId::Confirmed(server_id) => MutationIntent::Update {
                id: server_id.clone(),
                item,
            },
        };
        tracing::debug!(id = %id, generation, "optimistic update staged");
        self.spawn_confirm(id.clone(), generation, intent, ReconcileAction::Upsert);
        Ok(())
    }

    /// Remove a line immediately. A record the server never confirmed
    /// needs no network call: the pending confirming operation is
    /// abandoned and its eventual outcome discarded. A confirmed record
    /// gets a deletion confirming call; failure reinstates it.
    pub fn delete_optimistic(&self, id: &RecordId) -> Result<()> {
        let removed = {
            let mut draft = self.inner.lock_draft();
            draft.remove(id)?
        };
        if let Some((_, job_id)) = self.inner.jobs.remove(id) {
            self.inner.poller.cancel(&job_id);
        }
        match id {
            RecordId::Tentative(_) => {
                tracing::debug!(id = %id, "pending creation abandoned");
                self.inner.notify(NotificationKind::Success, "Line removed");
            }
            RecordId::Confirmed(server_id) => {
                let generation = removed.record.generation;
                let intent = MutationIntent::Delete {
                    id: server_id.clone(),
                };
                self.inner.pending_deletes.insert(id.clone(), removed);
                self.spawn_confirm(id.clone(), generation, intent, ReconcileAction::Delete);
            }
        }
        Ok(())
    }

    /// Abandon any outstanding confirming operation for this record.
    /// The line disappears from the visible list and no further
    /// reconciliation or notification happens for it. An in-flight
    /// network call cannot be aborted; its late response is discarded.
    pub fn cancel(&self, id: &RecordId) {
        let removed = {
            let mut draft = self.inner.lock_draft();
            draft.remove(id)
        };
        if removed.is_err() {
            tracing::debug!(id = %id, "cancel on unknown record");
        }
        self.inner.pending_deletes.remove(id);
        if let Some((_, job_id)) = self.inner.jobs.remove(id) {
            self.inner.poller.cancel(&job_id);
        }
    }

    /// Visible records, in order.
    pub fn lines(&self) -> Vec<LineRecord> {
        self.inner.lock_draft().lines().to_vec()
    }

    /// Running total over server-acknowledged records only.
    pub fn confirmed_total_cents(&self) -> Cents {
        self.inner.lock_draft().confirmed_total_cents()
    }

    /// Running total over everything rendered, pending included.
    pub fn visible_total_cents(&self) -> Cents {
        self.inner.lock_draft().visible_total_cents()
    }

    /// Count of visible records.
    pub fn len(&self) -> usize {
        self.inner.lock_draft().len()
    }

    /// Whether nothing is rendered.
    pub fn is_empty(&self) -> bool {
        self.inner.lock_draft().is_empty()
    }

    /// Count of records awaiting acknowledgement.
    pub fn pending_count(&self) -> usize {
        self.inner.lock_draft().pending_count()
    }

    fn spawn_confirm(
        &self,
        id: RecordId,
        generation: Generation,
        intent: MutationIntent,
        action: ReconcileAction,
    ) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            match inner.confirm.confirm(intent).await {
                Ok(Confirmation::Immediate { line }) => {
                    StoreInner::apply_success(&inner, &id, generation, line, action);
                }
                Ok(Confirmation::Job { job_id }) => {
                    StoreInner::delegate_to_poller(&inner, id, generation, job_id, action);
                }
                Err(e) => {
                    StoreInner::apply_failure(&inner, &id, generation, e, action);
                }
            }
        });
    }
}

//! Background job polling.
//!
//! Long-running server operations hand back a job id instead of an
//! immediate result. The poller tracks each job with its own loop:
//! status lookups at a fixed interval, a hard attempt budget, and a
//! cancellation channel that deterministically stops future ticks.
//! Exactly one terminal callback sequence fires per tracked job.

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::transport::{JobState, JobStatusClient};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

/// Terminal callbacks for one tracked job. Each fires at most once;
/// `on_complete` always follows the terminal `on_success`/`on_error`.
pub struct JobCallbacks {
    pub on_success: Box<dyn FnOnce(serde_json::Value) + Send>,
    pub on_error: Box<dyn FnOnce(SyncError) + Send>,
    pub on_complete: Box<dyn FnOnce() + Send>,
}

impl JobCallbacks {
    /// Callbacks that ignore every outcome.
    pub fn noop() -> Self {
        Self {
            on_success: Box::new(|_| {}),
            on_error: Box::new(|_| {}),
            on_complete: Box::new(|| {}),
        }
    }
}

/// How one poll loop ended.
enum PollOutcome {
    Success(serde_json::Value),
    Error(SyncError),
    Cancelled,
}

/// Tracks server-side jobs to completion.
pub struct JobPoller {
    status: Arc<dyn JobStatusClient>,
    poll_interval: Duration,
    max_attempts: u32,
    active: Arc<DashMap<String, watch::Sender<bool>>>,
}

impl JobPoller {
    pub fn new(status: Arc<dyn JobStatusClient>, config: &SyncConfig) -> Self {
        Self {
            status,
            poll_interval: config.poll_interval,
            max_attempts: config.max_poll_attempts,
            active: Arc::new(DashMap::new()),
        }
    }

    /// Start polling `job_id`. Exactly one loop may exist per job id;
    /// tracking an already-active job is an error and leaves the
    /// existing loop untouched.
    pub fn track(&self, job_id: &str, callbacks: JobCallbacks) -> Result<()> {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        match self.active.entry(job_id.to_string()) {
            Entry::Occupied(_) => {
                return Err(SyncError::AlreadyTracked {
                    job_id: job_id.to_string(),
                })
            }
            Entry::Vacant(slot) => {
                slot.insert(cancel_tx);
            }
        }

        let status = Arc::clone(&self.status);
        let active = Arc::clone(&self.active);
        let interval = self.poll_interval;
        let max_attempts = self.max_attempts;
        let job_id = job_id.to_string();

        tokio::spawn(async move {
            tracing::debug!(job_id = %job_id, "tracking job");
            let outcome =
                poll_loop(status.as_ref(), &job_id, interval, max_attempts, cancel_rx).await;
            active.remove(&job_id);
            match outcome {
                PollOutcome::Success(result) => {
                    tracing::debug!(job_id = %job_id, "job completed");
                    (callbacks.on_success)(result);
                    (callbacks.on_complete)();
                }
                PollOutcome::Error(e) => {
                    tracing::debug!(job_id = %job_id, error = %e, "job failed");
                    (callbacks.on_error)(e);
                    (callbacks.on_complete)();
                }
                PollOutcome::Cancelled => {
                    tracing::debug!(job_id = %job_id, "job tracking cancelled");
                }
            }
        });
        Ok(())
    }

    /// Stop tracking a job. No callbacks fire afterwards. Returns
    /// whether a loop was actually cancelled.
    pub fn cancel(&self, job_id: &str) -> bool {
        match self.active.remove(job_id) {
            Some((_, cancel_tx)) => {
                let _ = cancel_tx.send(true);
                true
            }
            None => false,
        }
    }

    /// Number of jobs currently being tracked.
    pub fn active_jobs(&self) -> usize {
        self.active.len()
    }
}

async fn poll_loop(
    client: &dyn JobStatusClient,
    job_id: &str,
    interval: Duration,
    max_attempts: u32,
    mut cancel: watch::Receiver<bool>,
) -> PollOutcome {
    let mut attempt: u32 = 0;
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    return PollOutcome::Cancelled;
                }
                continue;
            }
        }

        attempt += 1;
        match client.job_status(job_id).await {
            Ok(status) => {
                // Cancellation may have raced the in-flight lookup.
                if *cancel.borrow() {
                    return PollOutcome::Cancelled;
                }
                match status.state() {
                    JobState::Completed => {
                        return PollOutcome::Success(
                            status.result.unwrap_or(serde_json::Value::Null),
                        );
                    }
                    JobState::Failed => {
                        return PollOutcome::Error(SyncError::Business {
                            message: status
                                .error
                                .unwrap_or_else(|| "job failed".to_string()),
                        });
                    }
                    JobState::Pending | JobState::Running => {}
                    JobState::Unknown => {
                        return PollOutcome::Error(SyncError::UnknownStatus {
                            job_id: job_id.to_string(),
                            status: status.status,
                        });
                    }
                }
            }
            Err(e) => {
                // A failed poll is retried like a running status, and it
                // consumes one attempt.
                tracing::debug!(job_id = %job_id, error = %e, "poll attempt failed, retrying");
                if *cancel.borrow() {
                    return PollOutcome::Cancelled;
                }
            }
        }

        if attempt >= max_attempts {
            return PollOutcome::Error(SyncError::Timeout {
                job_id: job_id.to_string(),
                attempts: attempt,
            });
        }
    }
}

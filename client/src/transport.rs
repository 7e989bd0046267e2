//! Backend contracts.
//!
//! The sync layer never talks to the network itself; hosts inject
//! implementations of these traits. Futures are boxed so the traits stay
//! object-safe and implementations can be swapped in tests.

use crate::error::{Result, SyncError};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use stockline_engine::{BatchRequest, BatchResponse, LineItem};
use thiserror::Error;

/// A confirming operation dispatched for one optimistic mutation.
///
/// Ids here are confirmed server ids; a creation has no id yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum MutationIntent {
    /// Create a new line.
    Create { item: LineItem },
    /// Replace an existing line's value.
    Update { id: String, item: LineItem },
    /// Remove an existing line.
    Delete { id: String },
}

/// A server-acknowledged line: the confirmed id plus the authoritative
/// value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedLine {
    pub id: String,
    pub item: LineItem,
}

/// Outcome of a confirming call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum Confirmation {
    /// The server settled the mutation in-band. Deletions carry no line.
    Immediate { line: Option<ConfirmedLine> },
    /// The server queued a long-running job; poll it to completion.
    Job { job_id: String },
}

/// Dispatches confirming operations. Expected business failures are
/// modeled as `SyncError::Business`, not as transport errors.
pub trait ConfirmTransport: Send + Sync {
    fn confirm(&self, intent: MutationIntent) -> BoxFuture<'_, Result<Confirmation>>;
}

/// Response of the job status lookup (`GET /jobs/{jobId}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    /// Raw status string; the server's set may grow, so unknown values
    /// are preserved for diagnostics
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Recognized job states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Unknown,
}

impl JobStatus {
    /// Map the raw status onto a recognized state.
    pub fn state(&self) -> JobState {
        match self.status.as_str() {
            "pending" => JobState::Pending,
            "running" => JobState::Running,
            "completed" => JobState::Completed,
            "failed" => JobState::Failed,
            _ => JobState::Unknown,
        }
    }
}

/// Looks up job status by id.
pub trait JobStatusClient: Send + Sync {
    fn job_status(&self, job_id: &str) -> BoxFuture<'_, Result<JobStatus>>;
}

/// Issues the single batched item-detail call.
pub trait BatchTransport: Send + Sync {
    fn fetch_batch(&self, request: BatchRequest) -> BoxFuture<'_, Result<BatchResponse>>;
}

/// Storage failure. Callers treat these as non-fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("storage failure: {0}")]
pub struct StorageError(pub String);

/// Durable keyed storage over string values, used for the usage ranking.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> std::result::Result<(), StorageError>;
}

/// In-memory [`KeyValueStorage`], for tests and hosts without a durable
/// backend.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> std::result::Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Convenience constructor for transport failures.
pub(crate) fn transport_error(message: impl Into<String>) -> SyncError {
    SyncError::Transport(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_state_mapping() {
        let status = |s: &str| JobStatus {
            status: s.into(),
            result: None,
            error: None,
        };
        assert_eq!(status("pending").state(), JobState::Pending);
        assert_eq!(status("running").state(), JobState::Running);
        assert_eq!(status("completed").state(), JobState::Completed);
        assert_eq!(status("failed").state(), JobState::Failed);
        assert_eq!(status("archived").state(), JobState::Unknown);
    }

    #[test]
    fn job_status_wire_shape() {
        let parsed: JobStatus =
            serde_json::from_str(r#"{"status":"completed","result":{"id":"srv-1"}}"#).unwrap();
        assert_eq!(parsed.state(), JobState::Completed);
        assert!(parsed.result.is_some());
        assert!(parsed.error.is_none());
    }

    #[test]
    fn intent_wire_shape() {
        let intent = MutationIntent::Create {
            item: LineItem::new("SP-1", 100, 2),
        };
        let json = serde_json::to_string(&intent).unwrap();
        assert!(json.contains(r#""op":"create""#));
    }

    #[test]
    fn memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("k").unwrap(), None);
        storage.set("k", "v").unwrap();
        assert_eq!(storage.get("k").unwrap(), Some("v".to_string()));
    }
}

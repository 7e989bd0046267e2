//! Client-side state synchronization for storefront and back-office UIs.
//!
//! Coordinates the pure [`stockline_engine`] draft with a backend: edits
//! apply optimistically and reconcile against confirming calls, queued
//! jobs are polled to completion, identical reads are de-duplicated, and
//! frequently used items are preloaded ahead of need.
//!
//! The backend is reached through the traits in [`transport`]; nothing
//! in this crate performs IO of its own beyond what those traits hand it.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use stockline_client::{OptimisticStore, SyncConfig};
//! use stockline_client::transport::{ConfirmTransport, JobStatusClient};
//! use stockline_engine::LineItem;
//!
//! # fn demo(confirm: Arc<dyn ConfirmTransport>, status: Arc<dyn JobStatusClient>) {
//! let store = OptimisticStore::new(confirm, status, &SyncConfig::default());
//! let mut notifications = store.subscribe().expect("first subscriber");
//!
//! // Renders immediately under a tentative id; the confirming call
//! // runs in the background and reconciles or rolls back.
//! let id = store.add_optimistic(LineItem::new("SP-100", 12_500, 2));
//! assert!(id.is_tentative());
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod dedup;
pub mod error;
pub mod poller;
pub mod preload;
pub mod store;
pub mod transport;
pub mod usage;

pub use batch::{BatchFetchCoordinator, BatchOutcome};
pub use config::SyncConfig;
pub use dedup::RequestDeduplicator;
pub use error::{Result, SyncError};
pub use poller::{JobCallbacks, JobPoller};
pub use preload::{PreloadContext, PreloadStats, Preloader};
pub use store::{Notification, NotificationKind, OptimisticStore};
pub use usage::UsageTracker;

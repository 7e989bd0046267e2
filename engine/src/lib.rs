//! # Stockline Engine
//!
//! The deterministic core of Stockline's client-side state
//! synchronization layer.
//!
//! This crate holds the pure logic that the async client builds on:
//! optimistic mutation records, the draft state machine that applies
//! tentative edits and reconciles or rolls them back, usage ranking for
//! speculative preloading, and batch-response demultiplexing.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine has no knowledge of network, timers, or storage
//! - **Deterministic**: the same inputs always produce the same outputs
//! - **Testable**: pure logic, no mocks needed
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A visible order line under optimistic edit is a [`LineRecord`]:
//! - A [`RecordId`] — either `Tentative` (assigned locally at creation)
//!   or `Confirmed` (assigned by the server). The two id spaces are
//!   distinct enum variants and can never collide.
//! - A [`LineItem`] payload (SKU, unit price, quantity)
//! - A [`LineStatus`] — `Pending` until the server acknowledges it
//! - A rollback baseline, captured before a staged update
//! - A generation counter used to discard superseded outcomes
//!
//! ### Draft
//!
//! The [`Draft`] is the ordered visible list. Every transition is
//! synchronous and atomic from the caller's perspective: a reader never
//! observes a record mid-reconciliation. Outcomes that arrive for a
//! superseded or cancelled operation are reported as
//! [`Reconciled::Stale`] and applied nowhere.
//!
//! ### Usage Ranking
//!
//! [`UsageRanking`] counts per-SKU interactions, evicts the least-used
//! entries past a cap, and answers top-N queries with a deterministic
//! recency tie-break. It round-trips through JSON so a host can persist
//! it in keyed storage.
//!
//! ### Batch Demultiplexing
//!
//! [`demux`] maps one batched response back onto N per-item results,
//! substituting a safe placeholder for any slot the server marked as an
//! error so one bad item never fails its siblings.
//!
//! ## Quick Start
//!
//! ```rust
//! use stockline_engine::{Draft, LineItem, Reconciled, RecordId};
//!
//! let mut draft = Draft::new();
//! let id = RecordId::Tentative("t-1".into());
//!
//! // Stage an optimistic creation
//! draft
//!     .insert_pending(id.clone(), LineItem::new("SP-1", 10_000, 2))
//!     .unwrap();
//! assert_eq!(draft.confirmed_total_cents(), 0); // pending lines excluded
//!
//! // The server acknowledges it with its own id
//! let outcome = draft
//!     .confirm(&id, 0, "srv-1", LineItem::new("SP-1", 10_000, 2))
//!     .unwrap();
//! assert!(matches!(outcome, Reconciled::Applied(())));
//! assert_eq!(draft.confirmed_total_cents(), 20_000);
//! ```

pub mod batch;
pub mod draft;
pub mod error;
pub mod id;
pub mod line;
pub mod usage;

// Re-export main types at crate root
pub use batch::{demux, BatchRequest, BatchResponse, BatchSlot, ItemDetail, ItemRequest};
pub use draft::{Draft, DraftSnapshot, Reconciled, RemovedLine, Rollback};
pub use error::Error;
pub use id::RecordId;
pub use line::{LineItem, LineRecord, LineStatus};
pub use usage::{UsageRanking, DEFAULT_USAGE_CAP};

/// Type aliases for clarity
pub type Sku = String;
pub type Cents = i64;
pub type Generation = u64;

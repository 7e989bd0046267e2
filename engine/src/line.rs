//! Line items and mutation records.

use crate::{Cents, Generation, RecordId, Sku};
use serde::{Deserialize, Serialize};

/// Acknowledgement status of a line record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStatus {
    /// The server has not yet acknowledged this record.
    Pending,
    /// Acknowledged by the server.
    Confirmed,
    /// Rejected by the server; the record is removed or rolled back.
    Failed,
}

/// The domain payload of a line: a priced quantity of one SKU.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Product code
    pub sku: Sku,
    /// Unit price in cents
    pub unit_price_cents: Cents,
    /// Ordered quantity
    pub quantity: u32,
    /// Fields the store does not interpret (notes, discounts, ...)
    #[serde(default)]
    pub attributes: serde_json::Value,
}

impl LineItem {
    /// Create a line item with no extra attributes.
    pub fn new(sku: impl Into<Sku>, unit_price_cents: Cents, quantity: u32) -> Self {
        Self {
            sku: sku.into(),
            unit_price_cents,
            quantity,
            attributes: serde_json::Value::Null,
        }
    }

    /// Extended price of this line.
    pub fn line_total_cents(&self) -> Cents {
        self.unit_price_cents * Cents::from(self.quantity)
    }
}

/// One visible line under optimistic edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRecord {
    /// Tentative or confirmed identifier
    pub id: RecordId,
    /// The rendered payload
    pub item: LineItem,
    /// Acknowledgement status
    pub status: LineStatus,
    /// Value replaced by a staged update; `None` means this record is a
    /// creation and rollback removes it
    pub baseline: Option<LineItem>,
    /// Bumped whenever an outstanding operation is superseded; outcomes
    /// carrying an older generation are stale
    pub generation: Generation,
}

impl LineRecord {
    /// Create a pending record, as staged by an optimistic creation.
    pub fn pending(id: RecordId, item: LineItem) -> Self {
        Self {
            id,
            item,
            status: LineStatus::Pending,
            baseline: None,
            generation: 0,
        }
    }

    /// Create a confirmed record, as loaded from the server.
    pub fn confirmed(id: RecordId, item: LineItem) -> Self {
        Self {
            id,
            item,
            status: LineStatus::Confirmed,
            baseline: None,
            generation: 0,
        }
    }

    /// Whether the server has acknowledged this record.
    pub fn is_confirmed(&self) -> bool {
        self.status == LineStatus::Confirmed
    }

    /// Whether an operation on this record is still awaiting its outcome.
    pub fn is_pending(&self) -> bool {
        self.status == LineStatus::Pending
    }
}

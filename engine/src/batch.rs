//! Batch fetch wire types and response demultiplexing.
//!
//! N item-level requests are carried by a single network call. The
//! response holds one slot per request, each independently a value or an
//! error marker. [`demux`] maps the slots back onto per-item results,
//! substituting a placeholder for error slots so one bad item never
//! fails its siblings.

use crate::{Cents, Sku};
use serde::{Deserialize, Serialize};

/// One item-level request folded into a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    /// Product code to look up
    pub sku: Sku,
    /// Customer pricing context, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    /// Region/warehouse context, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl ItemRequest {
    /// Request with no extra context.
    pub fn new(sku: impl Into<Sku>) -> Self {
        Self {
            sku: sku.into(),
            customer_id: None,
            region: None,
        }
    }

    /// Attach a customer pricing context.
    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    /// Attach a region context.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Deterministic cache key over the semantic parameters only.
    pub fn signature(&self) -> String {
        format!(
            "{}|{}|{}",
            self.sku,
            self.customer_id.as_deref().unwrap_or("-"),
            self.region.as_deref().unwrap_or("-"),
        )
    }
}

/// Resolved item details for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetail {
    /// Product code
    pub sku: Sku,
    /// Unit price in cents
    pub unit_price_cents: Cents,
    /// Stock on hand
    pub available_qty: u32,
    /// Display description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// True when this slot failed and was replaced by a safe empty value
    #[serde(default)]
    pub placeholder: bool,
}

impl ItemDetail {
    /// The safe empty value substituted for a failed slot.
    pub fn placeholder(sku: impl Into<Sku>) -> Self {
        Self {
            sku: sku.into(),
            unit_price_cents: 0,
            available_qty: 0,
            description: None,
            placeholder: true,
        }
    }
}

/// The single network request carrying all folded item requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    /// Item requests, order significant
    pub requests: Vec<ItemRequest>,
}

/// One response slot: a value or an error marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchSlot {
    /// This item failed server-side; its siblings are unaffected.
    Error {
        /// Server-reported reason
        error: String,
    },
    /// Resolved item details.
    Detail(ItemDetail),
}

/// The batched response, one slot per request in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    /// Result slots, same order and length as the request list
    pub results: Vec<BatchSlot>,
}

/// Map response slots back onto per-item results. Order-preserving and
/// always the same length as `requests`: error slots and missing slots
/// (a short response) become placeholders.
pub fn demux(requests: &[ItemRequest], slots: &[BatchSlot]) -> Vec<ItemDetail> {
    requests
        .iter()
        .enumerate()
        .map(|(i, request)| match slots.get(i) {
            Some(BatchSlot::Detail(detail)) => detail.clone(),
            Some(BatchSlot::Error { .. }) | None => ItemDetail::placeholder(request.sku.clone()),
        })
        .collect()
}

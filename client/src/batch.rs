//! Batch fetch coordination.
//!
//! Folds N item-level requests into one network call and maps the
//! response back onto per-item results. A failed slot becomes a safe
//! placeholder; a transport-level failure makes every result a
//! placeholder and is reported once alongside them.

use crate::error::SyncError;
use crate::transport::BatchTransport;
use std::sync::Arc;
use stockline_engine::{demux, BatchRequest, BatchSlot, ItemDetail, ItemRequest};

/// Result of one batched fetch.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// One detail per request, in request order; failed slots are
    /// placeholders
    pub details: Vec<ItemDetail>,
    /// Set once if the whole call failed transport-level
    pub failure: Option<SyncError>,
}

/// Issues exactly one network call per `fetch_many`, however many item
/// requests it carries.
pub struct BatchFetchCoordinator {
    transport: Arc<dyn BatchTransport>,
}

impl BatchFetchCoordinator {
    pub fn new(transport: Arc<dyn BatchTransport>) -> Self {
        Self { transport }
    }

    /// Fetch details for all `requests` with a single call. The returned
    /// list is order-preserving and the same length as the input. Empty
    /// input short-circuits without a network call.
    pub async fn fetch_many(&self, requests: Vec<ItemRequest>) -> BatchOutcome {
        if requests.is_empty() {
            return BatchOutcome {
                details: Vec::new(),
                failure: None,
            };
        }

        let call = BatchRequest {
            requests: requests.clone(),
        };
        match self.transport.fetch_batch(call).await {
            Ok(response) => {
                if response.results.len() != requests.len() {
                    tracing::warn!(
                        expected = requests.len(),
                        got = response.results.len(),
                        "batch response length mismatch"
                    );
                }
                for (index, slot) in response.results.iter().enumerate() {
                    if let BatchSlot::Error { error } = slot {
                        tracing::warn!(index, %error, "batch slot failed");
                    }
                }
                BatchOutcome {
                    details: demux(&requests, &response.results),
                    failure: None,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "batch fetch failed");
                BatchOutcome {
                    details: requests
                        .iter()
                        .map(|r| ItemDetail::placeholder(r.sku.clone()))
                        .collect(),
                    failure: Some(e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::transport_error;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicU32, Ordering};
    use stockline_engine::BatchResponse;

    struct ScriptedBatch {
        calls: AtomicU32,
        response: crate::error::Result<BatchResponse>,
    }

    impl BatchTransport for ScriptedBatch {
        fn fetch_batch(
            &self,
            _request: BatchRequest,
        ) -> BoxFuture<'_, crate::error::Result<BatchResponse>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let response = self.response.clone();
            async move { response }.boxed()
        }
    }

    fn detail(sku: &str) -> ItemDetail {
        ItemDetail {
            sku: sku.into(),
            unit_price_cents: 100,
            available_qty: 3,
            description: None,
            placeholder: false,
        }
    }

    #[tokio::test]
    async fn one_call_per_fetch_many() {
        let transport = Arc::new(ScriptedBatch {
            calls: AtomicU32::new(0),
            response: Ok(BatchResponse {
                results: vec![
                    BatchSlot::Detail(detail("A")),
                    BatchSlot::Detail(detail("B")),
                ],
            }),
        });
        let coordinator = BatchFetchCoordinator::new(Arc::clone(&transport) as Arc<dyn BatchTransport>);

        let outcome = coordinator
            .fetch_many(vec![ItemRequest::new("A"), ItemRequest::new("B")])
            .await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.details.len(), 2);
        assert!(outcome.failure.is_none());
    }

    #[tokio::test]
    async fn bad_slot_becomes_placeholder_without_failing_siblings() {
        let transport = Arc::new(ScriptedBatch {
            calls: AtomicU32::new(0),
            response: Ok(BatchResponse {
                results: vec![
                    BatchSlot::Detail(detail("A")),
                    BatchSlot::Error {
                        error: "price list missing".into(),
                    },
                    BatchSlot::Detail(detail("C")),
                ],
            }),
        });
        let coordinator = BatchFetchCoordinator::new(transport);

        let outcome = coordinator
            .fetch_many(vec![
                ItemRequest::new("A"),
                ItemRequest::new("B"),
                ItemRequest::new("C"),
            ])
            .await;

        assert!(outcome.failure.is_none());
        assert!(!outcome.details[0].placeholder);
        assert!(outcome.details[1].placeholder);
        assert!(!outcome.details[2].placeholder);
    }

    #[tokio::test]
    async fn transport_failure_reported_once_with_placeholders() {
        let transport = Arc::new(ScriptedBatch {
            calls: AtomicU32::new(0),
            response: Err(transport_error("connection refused")),
        });
        let coordinator = BatchFetchCoordinator::new(transport);

        let outcome = coordinator
            .fetch_many(vec![ItemRequest::new("A"), ItemRequest::new("B")])
            .await;

        assert_eq!(outcome.details.len(), 2);
        assert!(outcome.details.iter().all(|d| d.placeholder));
        assert!(matches!(outcome.failure, Some(SyncError::Transport(_))));
    }

    #[tokio::test]
    async fn empty_input_short_circuits() {
        let transport = Arc::new(ScriptedBatch {
            calls: AtomicU32::new(0),
            response: Ok(BatchResponse { results: vec![] }),
        });
        let coordinator = BatchFetchCoordinator::new(Arc::clone(&transport) as Arc<dyn BatchTransport>);

        let outcome = coordinator.fetch_many(vec![]).await;
        assert!(outcome.details.is_empty());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }
}

//! Delivery deduplication.
//!
//! The bus delivers at least once. A [`Deduplicator`] remembers the event ids
//! it has seen so a redelivery of an already handled message is skipped.
//! Deduplication is per physical delivery, not per pick request: a create and a
//! later update for the same pick request have different event ids.

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors from the dedup store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Deduplication store error: {0}")]
pub struct DedupError(pub String);

/// Tracks which deliveries have been handled.
pub trait Deduplicator: Send + Sync {
    /// Atomically record `event_id` as seen and report whether it was seen
    /// before.
    ///
    /// # Errors
    ///
    /// Returns [`DedupError`] if the dedup store is unavailable.
    fn is_duplicate(
        &self,
        event_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, DedupError>> + Send + '_>>;

    /// Forget `event_id` so that a redelivery is processed again.
    ///
    /// Used when a message fails with a retryable error.
    ///
    /// # Errors
    ///
    /// Returns [`DedupError`] if the dedup store is unavailable.
    fn release(
        &self,
        event_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), DedupError>> + Send + '_>>;
}

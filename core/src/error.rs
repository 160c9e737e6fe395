//! Failure classification for pick request reconciliation.
//!
//! Every failure raised while handling an inbound message is one of four kinds.
//! The kind decides whether the flawed-message handler may ask the bus for a
//! redelivery (`is_retryable`) or should acknowledge and stop retrying.
//!
//! Benign skips (duplicate delivery, duplicate create, non-cancellable status,
//! unknown operation, automation system outside the allow-list) are not errors;
//! they are reported as successful outcomes by the reconciler.

use crate::dedup::DedupError;
use crate::event_bus::PublishError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors raised while reconciling a single inbound message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// The envelope or payload cannot be processed: missing attributes, missing
    /// identifiers, empty or unparseable payload, invalid date-time values.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// An update or cancel referenced a pick request that does not exist.
    #[error("Could not find pick request with ID: {identifier}")]
    NotFound {
        /// The pick request identifier carried by the payload
        identifier: String,
        /// The WMS the pick request was looked up in
        wms_identifier: String,
    },

    /// Reading from or writing to the pick request store (or the dedup store) failed.
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Publishing to the routing topic failed after the store was updated.
    #[error("Could not publish message for routing service: {0}")]
    Publish(String),
}

impl ReconcileError {
    /// Create a malformed-message error.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedMessage(reason.into())
    }

    /// Whether the bus may redeliver the message to try again.
    ///
    /// Store and publish failures may not have taken effect, so redelivery can
    /// succeed. Malformed messages and unknown pick requests never will.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Publish(_))
    }

    /// Stable, low-cardinality label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MalformedMessage(_) => "malformed_message",
            Self::NotFound { .. } => "not_found",
            Self::Persistence(_) => "persistence",
            Self::Publish(_) => "publish",
        }
    }
}

impl From<StoreError> for ReconcileError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Serialization(reason) => Self::MalformedMessage(reason),
            other => Self::Persistence(other.to_string()),
        }
    }
}

impl From<PublishError> for ReconcileError {
    fn from(error: PublishError) -> Self {
        Self::Publish(error.to_string())
    }
}

impl From<DedupError> for ReconcileError {
    fn from(error: DedupError) -> Self {
        Self::Persistence(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_infrastructure_failures_are_retryable() {
        assert!(!ReconcileError::malformed("empty payload").is_retryable());
        assert!(
            !ReconcileError::NotFound {
                identifier: "2".to_string(),
                wms_identifier: "TEST-WMS-1".to_string(),
            }
            .is_retryable()
        );
        assert!(ReconcileError::Persistence("timeout".to_string()).is_retryable());
        assert!(ReconcileError::Publish("broker down".to_string()).is_retryable());
    }

    #[test]
    fn not_found_display_names_the_identifier() {
        let error = ReconcileError::NotFound {
            identifier: "PR-9".to_string(),
            wms_identifier: "TEST-WMS-1".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Could not find pick request with ID: PR-9"
        );
    }

    #[test]
    fn store_serialization_failures_are_not_retried() {
        let error: ReconcileError = StoreError::Serialization("bad status".to_string()).into();
        assert_eq!(error.kind(), "malformed_message");

        let error: ReconcileError = StoreError::Database("connection reset".to_string()).into();
        assert_eq!(error.kind(), "persistence");
        assert!(error.is_retryable());
    }
}

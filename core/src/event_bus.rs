//! Routing publisher abstraction.
//!
//! The reconciler forwards pick requests to the routing service through a
//! [`RoutingPublisher`]. Publishing happens after the store write, so a publish
//! failure leaves the local state already updated; the message is then
//! redelivered and the (idempotent) transition runs again.
//!
//! # Implementations
//!
//! - `RedpandaRoutingPublisher` (in `pick-request-redpanda`): Kafka-compatible
//! - `RecordingPublisher` (in `pick-request-testing`): captures messages for tests

use crate::routing::RoutingMessage;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur while publishing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// Failed to connect to the bus
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The bus rejected or timed out the publish
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed {
        /// The topic that failed
        topic: String,
        /// The reason for failure
        reason: String,
    },

    /// The message body could not be serialized
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),
}

/// Publishes messages to the routing topic.
///
/// # Dyn Compatibility
///
/// Uses explicit `Pin<Box<dyn Future>>` returns so the publisher can be held
/// as `Arc<dyn RoutingPublisher>`.
pub trait RoutingPublisher: Send + Sync {
    /// Publish `message` to `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] if the message was not accepted by the bus.
    fn publish(
        &self,
        topic: &str,
        message: &RoutingMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), PublishError>> + Send + '_>>;
}

//! Dead letter sink for messages that will never succeed.
//!
//! Non-retryable failures are acknowledged so the bus stops redelivering them.
//! Before that, the message and its failure are recorded in a dead letter sink
//! for investigation and manual replay.

use crate::message::MessageAttributes;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors from the dead letter sink.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Dead letter sink error: {0}")]
pub struct DeadLetterError(pub String);

/// A message that failed with a non-retryable error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailedMessage {
    /// Delivery identifier
    pub event_id: String,
    /// Topic or subscription the message came from
    pub source_topic: String,
    /// Raw payload bytes
    pub data: Vec<u8>,
    /// Message attributes (empty if the envelope had none)
    pub attributes: MessageAttributes,
    /// Failure kind label, e.g. `not_found`
    pub error_kind: String,
    /// Human-readable failure
    pub error_message: String,
    /// When the failure was handled
    pub failed_at: DateTime<Utc>,
}

/// Stores failed messages.
pub trait DeadLetterSink: Send + Sync {
    /// Record a failed message.
    ///
    /// # Errors
    ///
    /// Returns [`DeadLetterError`] if the entry could not be stored.
    fn record(
        &self,
        message: &FailedMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), DeadLetterError>> + Send + '_>>;
}

//! Recording doubles for the message bus side of reconciliation
//!
//! - [`RecordingPublisher`]: captures routing publishes
//! - [`InMemoryDeduplicator`]: remembers seen event ids
//! - [`RecordingDeadLetterSink`]: captures dead-lettered messages
//!
//! Each double can be switched into a failing mode to exercise error paths.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only happens after a test panicked

use pick_request_core::dead_letter::{DeadLetterError, DeadLetterSink, FailedMessage};
use pick_request_core::dedup::{DedupError, Deduplicator};
use pick_request_core::event_bus::{PublishError, RoutingPublisher};
use pick_request_core::routing::RoutingMessage;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Captures every message published to routing.
///
/// # Example
///
/// ```
/// use pick_request_core::event_bus::RoutingPublisher;
/// use pick_request_core::message::MessageAttributes;
/// use pick_request_core::routing::RoutingMessage;
/// use pick_request_testing::RecordingPublisher;
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let publisher = RecordingPublisher::new();
/// let message = RoutingMessage::new(&json!({ "a": 1 }), MessageAttributes::new())?;
/// publisher.publish("routing-topic", &message).await?;
///
/// assert_eq!(publisher.published_to("routing-topic").len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct RecordingPublisher {
    published: Arc<Mutex<Vec<(String, RoutingMessage)>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingPublisher {
    /// Create a publisher with nothing recorded
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent publish fail (or succeed again).
    pub fn fail_publishes(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// All successful publishes as `(topic, message)` in order.
    #[must_use]
    pub fn published(&self) -> Vec<(String, RoutingMessage)> {
        self.published.lock().unwrap().clone()
    }

    /// Messages published to `topic`, in order.
    #[must_use]
    pub fn published_to(&self, topic: &str) -> Vec<RoutingMessage> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|(published_topic, _)| published_topic == topic)
            .map(|(_, message)| message.clone())
            .collect()
    }

    /// Number of successful publishes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    /// Whether nothing was published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.published.lock().unwrap().is_empty()
    }

    /// Forget recorded publishes.
    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
    }
}

impl RoutingPublisher for RecordingPublisher {
    fn publish(
        &self,
        topic: &str,
        message: &RoutingMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), PublishError>> + Send + '_>> {
        let topic = topic.to_string();
        let message = message.clone();
        Box::pin(async move {
            if self.fail.load(Ordering::SeqCst) {
                return Err(PublishError::PublishFailed {
                    topic,
                    reason: "injected publish failure".to_string(),
                });
            }
            self.published.lock().unwrap().push((topic, message));
            Ok(())
        })
    }
}

/// Remembers event ids in a `HashSet`.
#[derive(Clone, Debug, Default)]
pub struct InMemoryDeduplicator {
    seen: Arc<Mutex<HashSet<String>>>,
    fail: Arc<AtomicBool>,
}

impl InMemoryDeduplicator {
    /// Create a deduplicator that has seen nothing
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `event_id` as already seen.
    pub fn mark_seen(&self, event_id: &str) {
        self.seen.lock().unwrap().insert(event_id.to_string());
    }

    /// Whether `event_id` is currently recorded.
    #[must_use]
    pub fn has_seen(&self, event_id: &str) -> bool {
        self.seen.lock().unwrap().contains(event_id)
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn fail_checks(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), DedupError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DedupError("injected dedup failure".to_string()));
        }
        Ok(())
    }
}

impl Deduplicator for InMemoryDeduplicator {
    fn is_duplicate(
        &self,
        event_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, DedupError>> + Send + '_>> {
        let event_id = event_id.to_string();
        Box::pin(async move {
            self.check_available()?;
            Ok(!self.seen.lock().unwrap().insert(event_id))
        })
    }

    fn release(
        &self,
        event_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), DedupError>> + Send + '_>> {
        let event_id = event_id.to_string();
        Box::pin(async move {
            self.check_available()?;
            self.seen.lock().unwrap().remove(&event_id);
            Ok(())
        })
    }
}

/// Captures dead-lettered messages.
#[derive(Clone, Debug, Default)]
pub struct RecordingDeadLetterSink {
    recorded: Arc<Mutex<Vec<FailedMessage>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingDeadLetterSink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent record fail (or succeed again).
    pub fn fail_records(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Recorded messages in order.
    #[must_use]
    pub fn recorded(&self) -> Vec<FailedMessage> {
        self.recorded.lock().unwrap().clone()
    }
}

impl DeadLetterSink for RecordingDeadLetterSink {
    fn record(
        &self,
        message: &FailedMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), DeadLetterError>> + Send + '_>> {
        let message = message.clone();
        Box::pin(async move {
            if self.fail.load(Ordering::SeqCst) {
                return Err(DeadLetterError("injected dead letter failure".to_string()));
            }
            self.recorded.lock().unwrap().push(message);
            Ok(())
        })
    }
}

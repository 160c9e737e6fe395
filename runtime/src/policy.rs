//! Stop-retry versus redeliver decision for failed messages.

use pick_request_core::dead_letter::{DeadLetterSink, FailedMessage};
use pick_request_core::dedup::Deduplicator;
use pick_request_core::environment::{Clock, SystemClock};
use pick_request_core::error::ReconcileError;
use pick_request_core::flawed::FlawedMessageHandler;
use pick_request_core::message::InboundMessage;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Default [`FlawedMessageHandler`].
///
/// - Retryable errors (store or publish failures) release the event id from
///   the deduplicator and are returned, so the bus redelivers the message and
///   the redelivery is processed rather than skipped as a duplicate.
/// - Non-retryable errors (malformed message, unknown pick request) are
///   recorded in the dead letter sink, if one is configured, and swallowed so
///   the bus acknowledges the message.
pub struct FlawedMessagePolicy {
    deduplicator: Arc<dyn Deduplicator>,
    dead_letters: Option<Arc<dyn DeadLetterSink>>,
    clock: Arc<dyn Clock>,
}

impl FlawedMessagePolicy {
    /// Create a policy without a dead letter sink.
    #[must_use]
    pub fn new(deduplicator: Arc<dyn Deduplicator>) -> Self {
        Self {
            deduplicator,
            dead_letters: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Record non-retryable failures in `sink`.
    #[must_use]
    pub fn with_dead_letters(mut self, sink: Arc<dyn DeadLetterSink>) -> Self {
        self.dead_letters = Some(sink);
        self
    }

    /// Timestamp dead letters with `clock`.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    async fn redeliver(
        &self,
        message: &InboundMessage,
        error: ReconcileError,
    ) -> Result<(), ReconcileError> {
        if let Err(release_error) = self.deduplicator.release(&message.event_id).await {
            // The redelivery will be skipped as a duplicate.
            tracing::error!(
                event_id = %message.event_id,
                error = %release_error,
                "Failed to release event id for redelivery"
            );
        }
        tracing::warn!(
            event_id = %message.event_id,
            kind = error.kind(),
            "Message will be redelivered"
        );
        Err(error)
    }

    async fn discard(&self, source_topic: &str, message: &InboundMessage, error: &ReconcileError) {
        if let Some(sink) = &self.dead_letters {
            let failed = FailedMessage {
                event_id: message.event_id.clone(),
                source_topic: source_topic.to_string(),
                data: message.data.clone(),
                attributes: message.attributes.clone().unwrap_or_default(),
                error_kind: error.kind().to_string(),
                error_message: error.to_string(),
                failed_at: self.clock.now(),
            };
            if let Err(sink_error) = sink.record(&failed).await {
                tracing::error!(
                    event_id = %message.event_id,
                    error = %sink_error,
                    "Failed to dead-letter message"
                );
            }
        }
        tracing::warn!(
            event_id = %message.event_id,
            kind = error.kind(),
            "Message cannot be processed, acknowledging to stop retries"
        );
    }
}

impl FlawedMessageHandler for FlawedMessagePolicy {
    fn handle_flawed_message<'a>(
        &'a self,
        source_topic: &'a str,
        message: &'a InboundMessage,
        error: ReconcileError,
    ) -> Pin<Box<dyn Future<Output = Result<(), ReconcileError>> + Send + 'a>> {
        Box::pin(async move {
            if error.is_retryable() {
                return self.redeliver(message, error).await;
            }
            self.discard(source_topic, message, &error).await;
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pick_request_testing::fixtures::MessageBuilder;
    use pick_request_testing::{InMemoryDeduplicator, RecordingDeadLetterSink, test_clock};

    fn policy() -> (FlawedMessagePolicy, InMemoryDeduplicator, RecordingDeadLetterSink) {
        let dedup = InMemoryDeduplicator::new();
        let sink = RecordingDeadLetterSink::new();
        let policy = FlawedMessagePolicy::new(Arc::new(dedup.clone()))
            .with_dead_letters(Arc::new(sink.clone()))
            .with_clock(Arc::new(test_clock()));
        (policy, dedup, sink)
    }

    #[tokio::test]
    async fn retryable_errors_release_and_propagate() {
        let (policy, dedup, sink) = policy();
        dedup.mark_seen("e-1");
        let message = MessageBuilder::new("e-1").build();

        let result = policy
            .handle_flawed_message(
                "pick-request-topic",
                &message,
                ReconcileError::Publish("broker down".to_string()),
            )
            .await;

        assert_eq!(result, Err(ReconcileError::Publish("broker down".to_string())));
        assert!(!dedup.has_seen("e-1"));
        assert!(sink.recorded().is_empty());
    }

    #[tokio::test]
    async fn non_retryable_errors_are_dead_lettered_and_acknowledged() {
        let (policy, dedup, sink) = policy();
        dedup.mark_seen("e-2");
        let message = MessageBuilder::new("e-2").data(b"{}").build();

        let result = policy
            .handle_flawed_message(
                "pick-request-topic",
                &message,
                ReconcileError::malformed("Message does not contain valid data."),
            )
            .await;

        assert!(result.is_ok());
        assert!(dedup.has_seen("e-2"));
        let recorded = sink.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].error_kind, "malformed_message");
        assert_eq!(recorded[0].source_topic, "pick-request-topic");
        assert_eq!(recorded[0].data, b"{}".to_vec());
        assert_eq!(recorded[0].failed_at, test_clock().now());
    }

    #[tokio::test]
    async fn dead_letter_failures_still_acknowledge() {
        let (policy, _, sink) = policy();
        sink.fail_records(true);
        let message = MessageBuilder::new("e-3").build();

        let result = policy
            .handle_flawed_message(
                "pick-request-topic",
                &message,
                ReconcileError::NotFound {
                    identifier: "9".to_string(),
                    wms_identifier: "TEST-WMS-1".to_string(),
                },
            )
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn policy_without_sink_acknowledges() {
        let policy = FlawedMessagePolicy::new(Arc::new(InMemoryDeduplicator::new()));
        let message = MessageBuilder::new("e-4").without_attributes().build();

        let result = policy
            .handle_flawed_message(
                "pick-request-topic",
                &message,
                ReconcileError::malformed("Message does not contain attributes"),
            )
            .await;

        assert!(result.is_ok());
    }
}

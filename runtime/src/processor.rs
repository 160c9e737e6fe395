//! Per-message entry point.
//!
//! [`MessageProcessor::process`] runs one delivery through the full pipeline:
//!
//! ```text
//! attributes -> dedup gate -> header -> decode -> reconcile
//!                                                    |
//!                    any error -> log -> flawed-message handler
//! ```
//!
//! Each delivery is handled independently; the processor holds no per-message
//! state, so deliveries may run concurrently.

use crate::metrics::ProcessorMetrics;
use crate::reconciler::Reconciler;
use pick_request_core::dedup::Deduplicator;
use pick_request_core::error::ReconcileError;
use pick_request_core::flawed::FlawedMessageHandler;
use pick_request_core::message::{EventHeader, InboundEvent, InboundMessage};
use pick_request_core::outcome::Outcome;
use pick_request_core::payload::{JsonPayloadDecoder, PayloadDecoder};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Processes deliveries from one topic or subscription.
pub struct MessageProcessor {
    source_topic: String,
    deduplicator: Arc<dyn Deduplicator>,
    decoder: Arc<dyn PayloadDecoder>,
    reconciler: Reconciler,
    flawed_handler: Arc<dyn FlawedMessageHandler>,
}

impl MessageProcessor {
    /// Create a processor for `source_topic` decoding JSON payloads.
    #[must_use]
    pub fn new(
        source_topic: impl Into<String>,
        deduplicator: Arc<dyn Deduplicator>,
        reconciler: Reconciler,
        flawed_handler: Arc<dyn FlawedMessageHandler>,
    ) -> Self {
        Self {
            source_topic: source_topic.into(),
            deduplicator,
            decoder: Arc::new(JsonPayloadDecoder),
            reconciler,
            flawed_handler,
        }
    }

    /// Decode payloads with `decoder`.
    #[must_use]
    pub fn with_decoder(mut self, decoder: Arc<dyn PayloadDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Topic or subscription this processor handles.
    #[must_use]
    pub fn source_topic(&self) -> &str {
        &self.source_topic
    }

    /// Process one delivery.
    ///
    /// Returns `Ok` when the delivery may be acknowledged: either it was
    /// handled, or it failed and the flawed-message handler chose to stop
    /// retrying ([`Outcome::Discarded`]).
    ///
    /// # Errors
    ///
    /// Returns the error passed back by the flawed-message handler when the
    /// delivery should be redelivered.
    pub async fn process(&self, message: &InboundMessage) -> Result<Outcome, ReconcileError> {
        let span = tracing::info_span!(
            "pick_request_message",
            subscription = %self.source_topic,
            event_id = %message.event_id,
        );

        async {
            let started = Instant::now();
            match self.handle(message).await {
                Ok(outcome) => {
                    ProcessorMetrics::record_outcome(&outcome, started.elapsed());
                    Ok(outcome)
                },
                Err(error) => {
                    tracing::error!(
                        event_id = %message.event_id,
                        kind = error.kind(),
                        retryable = error.is_retryable(),
                        error = %error,
                        "Failed to process pick request message"
                    );
                    ProcessorMetrics::record_failure(&error, started.elapsed());
                    self.flawed_handler
                        .handle_flawed_message(&self.source_topic, message, error)
                        .await
                        .map(|()| Outcome::Discarded)
                },
            }
        }
        .instrument(span)
        .await
    }

    async fn handle(&self, message: &InboundMessage) -> Result<Outcome, ReconcileError> {
        let attributes = message.attributes()?;

        if self.deduplicator.is_duplicate(&message.event_id).await? {
            tracing::debug!(event_id = %message.event_id, "Skipping duplicate delivery");
            return Ok(Outcome::DuplicateDelivery);
        }

        let header = EventHeader::from_attributes(&attributes)?;
        let payload = self.decoder.decode(&message.data)?;
        let event = InboundEvent {
            event_id: message.event_id.clone(),
            header,
            payload,
            attributes,
        };

        self.reconciler.reconcile(&event).await
    }
}

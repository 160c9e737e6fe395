//! Shared harness for scenario tests.

#![allow(dead_code)] // Not every scenario file uses every helper

use pick_request_core::outcome::Outcome;
use pick_request_core::payload::PayloadDecoder;
use pick_request_core::routing::RoutingMessage;
use pick_request_core::{InboundMessage, KnownAutomationSystems, ReconcileError};
use pick_request_runtime::{FlawedMessagePolicy, MessageProcessor, Reconciler};
use pick_request_testing::fixtures::{self, MessageBuilder};
use pick_request_testing::{
    InMemoryDeduplicator, InMemoryPickRequestStore, RecordingDeadLetterSink, RecordingPublisher,
    test_clock,
};
use serde_json::Value;
use std::sync::Arc;

pub const SOURCE_TOPIC: &str = "pick-request-topic";
pub const ROUTING_TOPIC: &str = "routing-topic";

/// Processor wired to in-memory doubles, with handles kept for assertions.
pub struct Harness {
    pub processor: MessageProcessor,
    pub store: InMemoryPickRequestStore,
    pub publisher: RecordingPublisher,
    pub dedup: InMemoryDeduplicator,
    pub dead_letters: RecordingDeadLetterSink,
}

impl Harness {
    /// Harness over an empty store.
    pub fn empty() -> Self {
        Self::with_known_systems(KnownAutomationSystems::default())
    }

    /// Harness over the default seeded store.
    pub fn seeded() -> Self {
        let harness = Self::empty();
        fixtures::seed_default_pick_requests(&harness.store);
        harness
    }

    pub fn with_known_systems(known_systems: KnownAutomationSystems) -> Self {
        init_tracing();
        let store = InMemoryPickRequestStore::new();
        let publisher = RecordingPublisher::new();
        let dedup = InMemoryDeduplicator::new();
        let dead_letters = RecordingDeadLetterSink::new();

        let reconciler = Reconciler::new(Arc::new(store.clone()), Arc::new(publisher.clone()))
            .with_routing_topic(ROUTING_TOPIC)
            .with_known_systems(known_systems);
        let policy = FlawedMessagePolicy::new(Arc::new(dedup.clone()))
            .with_dead_letters(Arc::new(dead_letters.clone()))
            .with_clock(Arc::new(test_clock()));
        let processor = MessageProcessor::new(
            SOURCE_TOPIC,
            Arc::new(dedup.clone()),
            reconciler,
            Arc::new(policy),
        );

        Self {
            processor,
            store,
            publisher,
            dedup,
            dead_letters,
        }
    }

    /// Decode payloads with `decoder` instead of plain JSON.
    pub fn with_decoder(mut self, decoder: Arc<dyn PayloadDecoder>) -> Self {
        self.processor = self.processor.with_decoder(decoder);
        self
    }

    pub async fn process(&self, message: &InboundMessage) -> Result<Outcome, ReconcileError> {
        self.processor.process(message).await
    }

    /// Messages published to the routing topic.
    pub fn routed(&self) -> Vec<RoutingMessage> {
        self.publisher.published_to(ROUTING_TOPIC)
    }
}

/// Route test logs through the test writer. `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A message with a fresh event id for `operation` and `payload`.
pub fn message(event_id: &str, operation: &str, payload: &Value) -> InboundMessage {
    MessageBuilder::new(event_id)
        .operation(operation)
        .payload(payload)
        .build()
}

/// Same as [`message`] but for a specific automation system.
pub fn message_for(
    event_id: &str,
    operation: &str,
    automation_system: &str,
    payload: &Value,
) -> InboundMessage {
    MessageBuilder::new(event_id)
        .operation(operation)
        .automation_system(automation_system)
        .payload(payload)
        .build()
}

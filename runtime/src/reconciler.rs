//! Operation reconciler.
//!
//! Applies one decoded event to the pick request store and decides what, if
//! anything, is forwarded to the routing topic:
//!
//! | Operation | Store | Routing |
//! |---|---|---|
//! | `create` | insert the built record unless it exists | the record, `target` = automation system |
//! | `update` | merge the changed fields | the payload, when manually picked from a cancellable status or for a known automation system |
//! | `cancel` | nothing | the stored record, when its status is cancellable |
//!
//! Anything else is ignored.

use crate::metrics::ReconcilerMetrics;
use pick_request_core::datetime::normalize_field;
use pick_request_core::error::ReconcileError;
use pick_request_core::event_bus::{PublishError, RoutingPublisher};
use pick_request_core::message::{InboundEvent, MessageAttributes, Operation};
use pick_request_core::outcome::Outcome;
use pick_request_core::payload::PickRequestPayload;
use pick_request_core::pick_request::{
    PickRequest, PickRequestKey, PickRequestStatus, PickRequestUpdate,
};
use pick_request_core::record::build_pick_request;
use pick_request_core::routing::{KnownAutomationSystems, ROUTING_TOPIC, RoutingMessage};
use pick_request_core::store::{PickRequestStore, to_document};
use serde::Serialize;
use std::sync::Arc;

/// Reconciles inbound pick request events with the store.
///
/// Collaborators are injected, so the same reconciler runs against Postgres and
/// Redpanda in production and against in-memory doubles in tests.
///
/// # Example
///
/// ```
/// use pick_request_runtime::Reconciler;
/// use pick_request_testing::{InMemoryPickRequestStore, RecordingPublisher};
/// use std::sync::Arc;
///
/// let reconciler = Reconciler::new(
///     Arc::new(InMemoryPickRequestStore::new()),
///     Arc::new(RecordingPublisher::new()),
/// )
/// .with_routing_topic("routing-topic");
/// assert_eq!(reconciler.routing_topic(), "routing-topic");
/// ```
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn PickRequestStore>,
    publisher: Arc<dyn RoutingPublisher>,
    routing_topic: String,
    known_systems: KnownAutomationSystems,
}

impl Reconciler {
    /// Create a reconciler publishing to the default routing topic with the
    /// default automation allow-list.
    #[must_use]
    pub fn new(store: Arc<dyn PickRequestStore>, publisher: Arc<dyn RoutingPublisher>) -> Self {
        Self {
            store,
            publisher,
            routing_topic: ROUTING_TOPIC.to_string(),
            known_systems: KnownAutomationSystems::default(),
        }
    }

    /// Publish to `topic` instead of the default routing topic.
    #[must_use]
    pub fn with_routing_topic(mut self, topic: impl Into<String>) -> Self {
        self.routing_topic = topic.into();
        self
    }

    /// Replace the automation systems whose updates are forwarded.
    #[must_use]
    pub fn with_known_systems(mut self, known_systems: KnownAutomationSystems) -> Self {
        self.known_systems = known_systems;
        self
    }

    /// Topic routing messages are published to.
    #[must_use]
    pub fn routing_topic(&self) -> &str {
        &self.routing_topic
    }

    /// Apply `event`.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::MalformedMessage`] if the payload lacks the
    ///   identifier the operation needs or carries an invalid date-time
    /// - [`ReconcileError::NotFound`] if an update or cancel references an
    ///   unknown pick request
    /// - [`ReconcileError::Persistence`] if the store fails
    /// - [`ReconcileError::Publish`] if publishing to routing fails
    pub async fn reconcile(&self, event: &InboundEvent) -> Result<Outcome, ReconcileError> {
        match event.operation() {
            Operation::Create => self.create(event).await,
            Operation::Update => self.update(event).await,
            Operation::Cancel => self.cancel(event).await,
            Operation::Unknown(operation) => {
                tracing::debug!(
                    event_id = %event.event_id,
                    operation = %operation,
                    "Ignoring message with unknown operation"
                );
                Ok(Outcome::IgnoredOperation)
            },
        }
    }

    async fn create(&self, event: &InboundEvent) -> Result<Outcome, ReconcileError> {
        let wms_identifier = event.wms_identifier();
        let automation_system_identifier = event.automation_system_identifier();
        let identifier = event
            .payload
            .wms_pick_request_identifier()
            .ok_or_else(|| ReconcileError::malformed("wmsPickRequestIdentifier is missing"))?;

        if self
            .store
            .get_pick_request(identifier, wms_identifier)
            .await?
            .is_some()
        {
            tracing::warn!(
                event_id = %event.event_id,
                wms_identifier = %wms_identifier,
                pick_request_identifier = %identifier,
                "Pick request already exists, ignoring duplicate create"
            );
            return Ok(Outcome::DuplicateCreate);
        }

        let record = build_pick_request(&event.payload, automation_system_identifier, wms_identifier)?;
        self.store.upsert(&record.key(), to_document(&record)?).await?;

        let attributes = event.attributes.with_target(automation_system_identifier);
        self.publish(&Operation::Create, &record, attributes).await?;

        tracing::info!(
            event_id = %event.event_id,
            wms_identifier = %wms_identifier,
            pick_request_identifier = %identifier,
            automation_system_identifier = %automation_system_identifier,
            "Processed pick request create"
        );
        Ok(Outcome::Created)
    }

    async fn cancel(&self, event: &InboundEvent) -> Result<Outcome, ReconcileError> {
        let wms_identifier = event.wms_identifier();
        let identifier = pick_request_identifier(&event.payload)?;
        let stored = self.load(identifier, wms_identifier).await?;

        if !stored.status.is_cancellable() {
            tracing::info!(
                event_id = %event.event_id,
                wms_identifier = %wms_identifier,
                pick_request_identifier = %identifier,
                status = %stored.status,
                "Pick request can no longer be cancelled, skipping cancellation"
            );
            return Ok(Outcome::CancellationSkipped);
        }

        let attributes = event
            .attributes
            .with_target(&stored.automation_system_identifier);
        self.publish(&Operation::Cancel, &stored, attributes).await?;

        tracing::info!(
            event_id = %event.event_id,
            wms_identifier = %wms_identifier,
            pick_request_identifier = %identifier,
            automation_system_identifier = %stored.automation_system_identifier,
            "Processed pick request cancellation"
        );
        Ok(Outcome::CancellationForwarded)
    }

    async fn update(&self, event: &InboundEvent) -> Result<Outcome, ReconcileError> {
        let wms_identifier = event.wms_identifier();
        let identifier = pick_request_identifier(&event.payload)?;
        let stored = self.load(identifier, wms_identifier).await?;

        let mut forwarded = event.payload.clone();
        forwarded
            .automation_pick_request_identifier
            .clone_from(&stored.automation_pick_request_identifier);
        forwarded.order_reference.clone_from(&stored.order_reference);
        forwarded.pick_identifier.clone_from(&stored.pick_identifier);

        let manually_picked = event.payload.is_manually_picked();
        let update = PickRequestUpdate {
            wms_pick_request_identifier: identifier.to_string(),
            cut_off_time: normalize_field("cutOffTime", event.payload.cut_off_time.as_ref())?,
            pick_before_time: normalize_field(
                "pickBeforeTime",
                event.payload.pick_before_time.as_ref(),
            )?,
            handover_location: event.payload.handover_location().cloned(),
            status: manually_picked.then_some(PickRequestStatus::ManuallyPicked),
        };
        let key = PickRequestKey::new(wms_identifier, identifier);
        self.store.upsert(&key, to_document(&update)?).await?;

        let published = if manually_picked {
            // A manual pick withdraws the automated pick while it is still cancellable.
            if stored.status.is_cancellable() {
                self.publish(&Operation::Update, &forwarded, event.attributes.clone())
                    .await?;
                true
            } else {
                false
            }
        } else if self
            .known_systems
            .contains(event.automation_system_identifier())
        {
            forwarded.manually_picked = Some(false);
            self.publish(&Operation::Update, &forwarded, event.attributes.clone())
                .await?;
            true
        } else {
            false
        };

        tracing::info!(
            event_id = %event.event_id,
            wms_identifier = %wms_identifier,
            pick_request_identifier = %identifier,
            manually_picked,
            published,
            "Processed pick request update"
        );
        Ok(Outcome::Updated { published })
    }

    async fn load(
        &self,
        identifier: &str,
        wms_identifier: &str,
    ) -> Result<PickRequest, ReconcileError> {
        self.store
            .get_pick_request(identifier, wms_identifier)
            .await?
            .ok_or_else(|| ReconcileError::NotFound {
                identifier: identifier.to_string(),
                wms_identifier: wms_identifier.to_string(),
            })
    }

    async fn publish<T: Serialize + Sync>(
        &self,
        operation: &Operation,
        body: &T,
        attributes: MessageAttributes,
    ) -> Result<(), ReconcileError> {
        let message = RoutingMessage::new(body, attributes)
            .map_err(|e| PublishError::SerializationFailed(e.to_string()))?;
        self.publisher.publish(&self.routing_topic, &message).await?;
        ReconcilerMetrics::record_publish(operation);
        Ok(())
    }
}

fn pick_request_identifier(payload: &PickRequestPayload) -> Result<&str, ReconcileError> {
    payload
        .pick_request_identifier()
        .ok_or_else(|| ReconcileError::malformed("pickRequestIdentifier is missing"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pick_request_core::message::{EventHeader, MessageAttributes};
    use pick_request_core::payload::decode_payload;
    use pick_request_testing::fixtures::{self, WMS_IDENTIFIER};
    use pick_request_testing::{InMemoryPickRequestStore, RecordingPublisher};
    use serde_json::{Value, json};

    fn event(operation: &str, automation: &str, payload: &Value) -> InboundEvent {
        let attributes = MessageAttributes::new()
            .with("operation", operation)
            .with("wmsIdentifier", WMS_IDENTIFIER)
            .with("automationSystemIdentifier", automation);
        InboundEvent {
            event_id: "event-1".to_string(),
            header: EventHeader::from_attributes(&attributes).unwrap(),
            payload: decode_payload(payload.to_string().as_bytes()).unwrap(),
            attributes,
        }
    }

    fn reconciler() -> (Reconciler, InMemoryPickRequestStore, RecordingPublisher) {
        let store = InMemoryPickRequestStore::new();
        fixtures::seed_default_pick_requests(&store);
        let publisher = RecordingPublisher::new();
        let reconciler = Reconciler::new(Arc::new(store.clone()), Arc::new(publisher.clone()));
        (reconciler, store, publisher)
    }

    #[tokio::test]
    async fn unknown_operation_touches_nothing() {
        let (reconciler, store, publisher) = reconciler();
        let outcome = reconciler
            .reconcile(&event("archive", "iws-1", &json!({ "pickRequestIdentifier": "2" })))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::IgnoredOperation);
        assert_eq!(store.read_count(), 0);
        assert!(publisher.is_empty());
    }

    #[tokio::test]
    async fn create_without_identifier_is_malformed() {
        let (reconciler, store, _) = reconciler();
        let error = reconciler
            .reconcile(&event("create", "iws-1", &json!({ "orderReference": "O-1" })))
            .await
            .unwrap_err();

        assert_eq!(error.kind(), "malformed_message");
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn update_publishes_to_the_configured_topic() {
        let (reconciler, _, publisher) = reconciler();
        let reconciler = reconciler.with_routing_topic("routing-topic-eu");

        reconciler
            .reconcile(&event("update", "iws-1", &json!({ "pickRequestIdentifier": "2" })))
            .await
            .unwrap();

        assert_eq!(publisher.published_to("routing-topic-eu").len(), 1);
        assert!(publisher.published_to(ROUTING_TOPIC).is_empty());
    }

    #[tokio::test]
    async fn allow_list_can_be_replaced() {
        let (reconciler, _, publisher) = reconciler();
        let reconciler =
            reconciler.with_known_systems(KnownAutomationSystems::from_csv("autostore"));

        let outcome = reconciler
            .reconcile(&event("update", "iws-1", &json!({ "pickRequestIdentifier": "2" })))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Updated { published: false });

        let outcome = reconciler
            .reconcile(&event(
                "update",
                "AutoStore-DC-7",
                &json!({ "pickRequestIdentifier": "2" }),
            ))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Updated { published: true });
        assert_eq!(publisher.len(), 1);
    }
}

//! Message builders and seeded pick requests
//!
//! The default seed mirrors a small WMS with three pick requests:
//!
//! | Document id | `wmsPickRequestIdentifier` | Status |
//! |---|---|---|
//! | `test-pick-request` | `test-pick-request` | `allocated` |
//! | `TEST-WMS-1-2` | `2` | `allocated` |
//! | `TEST-WMS-1-3` | `3` | `manually-picked` |
//!
//! All belong to [`WMS_IDENTIFIER`] and [`SEEDED_AUTOMATION_SYSTEM`].

use crate::store_mocks::InMemoryPickRequestStore;
use pick_request_core::message::{
    AUTOMATION_SYSTEM_IDENTIFIER, InboundMessage, MessageAttributes, OPERATION,
    WMS_IDENTIFIER as WMS_IDENTIFIER_ATTRIBUTE,
};
use pick_request_core::pick_request::{PickRequest, PickRequestStatus};
use serde_json::{Map, Value};

/// WMS of every seeded pick request.
pub const WMS_IDENTIFIER: &str = "TEST-WMS-1";
/// Automation system of every seeded pick request.
pub const SEEDED_AUTOMATION_SYSTEM: &str = "test-automationSystemIdentifier";
/// An automation system on the default allow-list.
pub const KNOWN_AUTOMATION_SYSTEM: &str = "iws-sto-1";
/// An automation system outside the default allow-list.
pub const UNKNOWN_AUTOMATION_SYSTEM: &str = "AS-STO-TEST";

/// A stored pick request with the fields the seed uses.
#[must_use]
pub fn pick_request(wms_pick_request_identifier: &str, status: PickRequestStatus) -> PickRequest {
    PickRequest {
        wms_identifier: WMS_IDENTIFIER.to_string(),
        wms_pick_request_identifier: wms_pick_request_identifier.to_string(),
        order_reference: Some("test-orderReference".to_string()),
        pick_identifier: Some("test-pickIdentifier".to_string()),
        automation_system_identifier: SEEDED_AUTOMATION_SYSTEM.to_string(),
        automation_pick_request_identifier: None,
        status,
        cut_off_time: None,
        pick_before_time: None,
        handover_location: None,
        service: None,
        extra: Map::new(),
    }
}

/// Seed the three default pick requests.
pub fn seed_default_pick_requests(store: &InMemoryPickRequestStore) {
    store.seed(
        "test-pick-request",
        &pick_request("test-pick-request", PickRequestStatus::Allocated),
    );
    store.seed(
        "TEST-WMS-1-2",
        &pick_request("2", PickRequestStatus::Allocated),
    );
    store.seed(
        "TEST-WMS-1-3",
        &pick_request("3", PickRequestStatus::ManuallyPicked),
    );
}

/// Builder for inbound messages.
///
/// Defaults to a message from [`WMS_IDENTIFIER`] for
/// [`KNOWN_AUTOMATION_SYSTEM`] with an empty payload and no operation.
///
/// # Example
///
/// ```
/// use pick_request_testing::fixtures::MessageBuilder;
/// use serde_json::json;
///
/// let message = MessageBuilder::new("event-1")
///     .operation("create")
///     .payload(&json!({ "wmsPickRequestIdentifier": "7" }))
///     .build();
/// assert_eq!(message.event_id, "event-1");
/// ```
#[derive(Clone, Debug)]
pub struct MessageBuilder {
    event_id: String,
    data: Vec<u8>,
    attributes: Option<MessageAttributes>,
}

impl MessageBuilder {
    /// Start a message with the given delivery id
    #[must_use]
    pub fn new(event_id: &str) -> Self {
        Self {
            event_id: event_id.to_string(),
            data: Vec::new(),
            attributes: Some(
                MessageAttributes::new()
                    .with(WMS_IDENTIFIER_ATTRIBUTE, WMS_IDENTIFIER)
                    .with(AUTOMATION_SYSTEM_IDENTIFIER, KNOWN_AUTOMATION_SYSTEM),
            ),
        }
    }

    /// Set the `operation` attribute.
    #[must_use]
    pub fn operation(self, operation: &str) -> Self {
        self.attribute(OPERATION, operation)
    }

    /// Set the `wmsIdentifier` attribute.
    #[must_use]
    pub fn wms(self, wms_identifier: &str) -> Self {
        self.attribute(WMS_IDENTIFIER_ATTRIBUTE, wms_identifier)
    }

    /// Set the `automationSystemIdentifier` attribute.
    #[must_use]
    pub fn automation_system(self, automation_system_identifier: &str) -> Self {
        self.attribute(AUTOMATION_SYSTEM_IDENTIFIER, automation_system_identifier)
    }

    /// Set any attribute.
    #[must_use]
    pub fn attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes = Some(self.attributes.unwrap_or_default().with(key, value));
        self
    }

    /// Remove an attribute.
    #[must_use]
    pub fn without_attribute(mut self, key: &str) -> Self {
        self.attributes = self.attributes.map(|attributes| {
            attributes
                .iter()
                .filter(|(name, _)| *name != key)
                .collect()
        });
        self
    }

    /// Drop the attribute map entirely.
    #[must_use]
    pub fn without_attributes(mut self) -> Self {
        self.attributes = None;
        self
    }

    /// Use `payload` serialized as JSON for the message data.
    #[must_use]
    pub fn payload(mut self, payload: &Value) -> Self {
        self.data = payload.to_string().into_bytes();
        self
    }

    /// Use raw bytes for the message data.
    #[must_use]
    pub fn data(mut self, data: &[u8]) -> Self {
        self.data = data.to_vec();
        self
    }

    /// Finish the message.
    #[must_use]
    pub fn build(self) -> InboundMessage {
        InboundMessage::new(self.event_id, self.data, self.attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_sets_and_removes_attributes() {
        let message = MessageBuilder::new("e-1")
            .operation("update")
            .without_attribute(WMS_IDENTIFIER_ATTRIBUTE)
            .payload(&json!({ "a": 1 }))
            .build();

        let attributes = message.attributes.unwrap();
        assert_eq!(attributes.get(OPERATION), Some("update"));
        assert_eq!(attributes.get(WMS_IDENTIFIER_ATTRIBUTE), None);
        assert_eq!(message.data, br#"{"a":1}"#.to_vec());
    }

    #[test]
    fn default_seed_has_three_documents() {
        let store = InMemoryPickRequestStore::new();
        seed_default_pick_requests(&store);
        assert_eq!(
            store.document_ids(),
            vec!["TEST-WMS-1-2", "TEST-WMS-1-3", "test-pick-request"]
        );
        assert_eq!(
            store.field("TEST-WMS-1-3", "status"),
            Some(json!("manually-picked"))
        );
    }
}

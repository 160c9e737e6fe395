//! Inbound message envelope and attribute extraction.
//!
//! Every delivery from the pick request topic carries payload bytes, a map of
//! string attributes and a delivery event id. The attributes select the
//! operation and identify the WMS and automation system:
//!
//! ```text
//! { data: <payload bytes>,
//!   attributes: { operation, wmsIdentifier, automationSystemIdentifier, ... },
//!   eventId }
//! ```

use crate::error::ReconcileError;
use crate::payload::PickRequestPayload;
use std::collections::BTreeMap;
use std::fmt;

/// Attribute holding the operation kind.
pub const OPERATION: &str = "operation";
/// Attribute holding the WMS identifier.
pub const WMS_IDENTIFIER: &str = "wmsIdentifier";
/// Attribute holding the automation system identifier.
pub const AUTOMATION_SYSTEM_IDENTIFIER: &str = "automationSystemIdentifier";
/// Attribute added to routing messages naming the automation system.
pub const TARGET: &str = "target";

const TRACE_CONTEXT: &str = "X-Cloud-Trace-Context";
const TRACE_CONTEXT_LOWER: &str = "x-cloud-trace-context";

/// String attributes of a message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageAttributes(BTreeMap<String, String>);

impl MessageAttributes {
    /// Create an empty attribute map.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Look up an attribute.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Set an attribute, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Iterate attributes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Routing attributes: `target` followed by all of these attributes.
    ///
    /// An inbound attribute named `target` takes precedence over the
    /// automation system identifier.
    #[must_use]
    pub fn with_target(&self, target: &str) -> Self {
        let mut routed = Self::new().with(TARGET, target);
        routed.0.extend(self.0.clone());
        routed
    }

    /// Mirror the trace header under its lowercase name if only the
    /// mixed-case header is present.
    pub fn normalize_trace_context(&mut self) {
        if self.get(TRACE_CONTEXT_LOWER).is_none() {
            if let Some(trace) = self.get(TRACE_CONTEXT).map(str::to_string) {
                self.insert(TRACE_CONTEXT_LOWER, trace);
            }
        }
    }

    fn required(&self, key: &str) -> Result<&str, ReconcileError> {
        self.get(key)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                ReconcileError::malformed(format!(
                    "{key} is missing in the attributes of the message"
                ))
            })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MessageAttributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A raw delivery from the pick request topic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    /// Delivery identifier; redeliveries of the same message share it
    pub event_id: String,
    /// Payload bytes
    pub data: Vec<u8>,
    /// Message attributes; `None` if the envelope carried none
    pub attributes: Option<MessageAttributes>,
}

impl InboundMessage {
    /// Create a message.
    #[must_use]
    pub fn new(
        event_id: impl Into<String>,
        data: impl Into<Vec<u8>>,
        attributes: Option<MessageAttributes>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            data: data.into(),
            attributes,
        }
    }

    /// Attributes of the envelope, with the trace header normalized.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::MalformedMessage`] if the envelope has no
    /// attributes.
    pub fn attributes(&self) -> Result<MessageAttributes, ReconcileError> {
        let mut attributes = self
            .attributes
            .clone()
            .ok_or_else(|| ReconcileError::malformed("Message does not contain attributes"))?;
        attributes.normalize_trace_context();
        Ok(attributes)
    }
}

/// Operation requested by an inbound message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create a pick request
    Create,
    /// Update a pick request
    Update,
    /// Ask the automation system to cancel a pick request
    Cancel,
    /// Anything else, ignored for forward compatibility
    Unknown(String),
}

impl Operation {
    /// Parse the `operation` attribute. Matching is exact.
    #[must_use]
    pub fn parse(operation: &str) -> Self {
        match operation {
            "create" => Self::Create,
            "update" => Self::Update,
            "cancel" => Self::Cancel,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Cancel => "cancel",
            Self::Unknown(operation) => operation,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing-relevant attributes of a message, extracted before decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventHeader {
    /// Requested operation
    pub operation: Operation,
    /// WMS the event comes from
    pub wms_identifier: String,
    /// Automation system the pick request belongs to
    pub automation_system_identifier: String,
}

impl EventHeader {
    /// Extract the header from message attributes.
    ///
    /// A missing `operation` is not an error; it yields an unknown operation
    /// that the reconciler ignores.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::MalformedMessage`] if `wmsIdentifier` or
    /// `automationSystemIdentifier` is missing or blank.
    pub fn from_attributes(attributes: &MessageAttributes) -> Result<Self, ReconcileError> {
        let automation_system_identifier =
            attributes.required(AUTOMATION_SYSTEM_IDENTIFIER)?.to_string();
        let wms_identifier = attributes.required(WMS_IDENTIFIER)?.to_string();
        let operation = Operation::parse(attributes.get(OPERATION).unwrap_or_default());

        Ok(Self {
            operation,
            wms_identifier,
            automation_system_identifier,
        })
    }
}

/// A fully extracted inbound event, ready for reconciliation.
#[derive(Clone, Debug, PartialEq)]
pub struct InboundEvent {
    /// Delivery identifier
    pub event_id: String,
    /// Operation, WMS and automation system
    pub header: EventHeader,
    /// Decoded payload
    pub payload: PickRequestPayload,
    /// All message attributes, forwarded to routing
    pub attributes: MessageAttributes,
}

impl InboundEvent {
    /// Requested operation.
    #[must_use]
    pub const fn operation(&self) -> &Operation {
        &self.header.operation
    }

    /// WMS the event comes from.
    #[must_use]
    pub fn wms_identifier(&self) -> &str {
        &self.header.wms_identifier
    }

    /// Automation system named by the message attributes.
    #[must_use]
    pub fn automation_system_identifier(&self) -> &str {
        &self.header.automation_system_identifier
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn attributes() -> MessageAttributes {
        MessageAttributes::new()
            .with(OPERATION, "create")
            .with(WMS_IDENTIFIER, "TEST-WMS-1")
            .with(AUTOMATION_SYSTEM_IDENTIFIER, "AS-STO-TEST")
    }

    #[test]
    fn missing_envelope_attributes_are_malformed() {
        let message = InboundMessage::new("e-1", b"{}".to_vec(), None);
        assert!(matches!(
            message.attributes(),
            Err(ReconcileError::MalformedMessage(_))
        ));
    }

    #[test]
    fn trace_header_is_mirrored_in_lowercase() {
        let message = InboundMessage::new(
            "e-1",
            Vec::new(),
            Some(attributes().with("X-Cloud-Trace-Context", "abc/1;o=1")),
        );
        let attributes = message.attributes().unwrap();
        assert_eq!(attributes.get("x-cloud-trace-context"), Some("abc/1;o=1"));
    }

    #[test]
    fn existing_lowercase_trace_header_wins() {
        let mut attributes = attributes()
            .with("X-Cloud-Trace-Context", "upper")
            .with("x-cloud-trace-context", "lower");
        attributes.normalize_trace_context();
        assert_eq!(attributes.get("x-cloud-trace-context"), Some("lower"));
    }

    #[test]
    fn header_requires_both_identifiers() {
        let header = EventHeader::from_attributes(&attributes()).unwrap();
        assert_eq!(header.operation, Operation::Create);
        assert_eq!(header.wms_identifier, "TEST-WMS-1");

        let no_automation = MessageAttributes::new()
            .with(OPERATION, "create")
            .with(WMS_IDENTIFIER, "TEST-WMS-1");
        assert!(EventHeader::from_attributes(&no_automation).is_err());

        let blank_wms = attributes().with(WMS_IDENTIFIER, "");
        assert!(EventHeader::from_attributes(&blank_wms).is_err());
    }

    #[test]
    fn missing_operation_is_unknown() {
        let attributes = MessageAttributes::new()
            .with(WMS_IDENTIFIER, "TEST-WMS-1")
            .with(AUTOMATION_SYSTEM_IDENTIFIER, "iws-1");
        let header = EventHeader::from_attributes(&attributes).unwrap();
        assert_eq!(header.operation, Operation::Unknown(String::new()));
    }

    #[test]
    fn operations_parse_exactly() {
        assert_eq!(Operation::parse("cancel"), Operation::Cancel);
        assert_eq!(Operation::parse("update"), Operation::Update);
        assert_eq!(Operation::parse("UPDATE"), Operation::Unknown("UPDATE".to_string()));
        assert_eq!(Operation::parse("delete").as_str(), "delete");
    }

    #[test]
    fn inbound_attributes_override_target() {
        let routed = attributes().with_target("AS-STO-TEST");
        assert_eq!(routed.get(TARGET), Some("AS-STO-TEST"));
        assert_eq!(routed.len(), 4);

        let overridden = attributes().with(TARGET, "elsewhere").with_target("AS-STO-TEST");
        assert_eq!(overridden.get(TARGET), Some("elsewhere"));
    }
}

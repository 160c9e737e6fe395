//! Mapping between message attributes and Kafka record headers.

use pick_request_core::message::MessageAttributes;
use rdkafka::message::{Header, Headers, OwnedHeaders};

/// Header carrying the delivery identifier, if the producer sets one.
pub const EVENT_ID_HEADER: &str = "eventId";

/// One header per attribute, values as UTF-8 bytes.
#[must_use]
pub fn to_kafka_headers(attributes: &MessageAttributes) -> OwnedHeaders {
    attributes
        .iter()
        .fold(OwnedHeaders::new(), |headers, (key, value)| {
            headers.insert(Header {
                key,
                value: Some(value),
            })
        })
}

/// Attributes of a received record.
///
/// Returns `None` for a record without headers. Headers whose value is absent
/// or not UTF-8 are skipped.
#[must_use]
pub fn from_kafka_headers<H: Headers>(headers: Option<&H>) -> Option<MessageAttributes> {
    headers.map(|headers| {
        headers
            .iter()
            .filter_map(|header| {
                let value = std::str::from_utf8(header.value?).ok()?;
                Some((header.key, value))
            })
            .collect()
    })
}

/// Delivery identifier of a record: the `eventId` header, or the record's
/// position `<topic>-<partition>-<offset>` when the header is absent.
///
/// Redeliveries of one record share its position, so both forms are stable
/// across redelivery.
#[must_use]
pub fn event_id(
    attributes: Option<&MessageAttributes>,
    topic: &str,
    partition: i32,
    offset: i64,
) -> String {
    attributes
        .and_then(|attributes| attributes.get(EVENT_ID_HEADER))
        .filter(|id| !id.trim().is_empty())
        .map_or_else(|| format!("{topic}-{partition}-{offset}"), str::to_string)
}

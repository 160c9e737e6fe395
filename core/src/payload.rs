//! Decoding of inbound pick request payloads.
//!
//! The bus hands over raw bytes. A payload must be a non-empty JSON object;
//! empty bytes, `null`, `""`, `{}` and any non-object JSON are rejected as
//! malformed. Individual fields are optional, and blank per-field values are
//! treated as absent rather than as errors.

use crate::datetime::WireDateTime;
use crate::error::ReconcileError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Error message used for every structurally invalid payload.
pub const INVALID_DATA: &str = "Message does not contain valid data.";

/// Service window as sent by the WMS.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireServiceWindow {
    /// Start of the window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_time: Option<WireDateTime>,
    /// End of the window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_time: Option<WireDateTime>,
    /// Uninterpreted service fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A decoded pick request payload.
///
/// This is also the body forwarded to routing on the update path, so it
/// serializes back to camelCase with date-times in their wire form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickRequestPayload {
    /// Identifier of the pick request inside its WMS (create)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wms_pick_request_identifier: Option<String>,
    /// Identifier of the pick request inside its WMS (update, cancel)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pick_request_identifier: Option<String>,
    /// Order the pick belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_reference: Option<String>,
    /// Business pick identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pick_identifier: Option<String>,
    /// Identifier assigned by the automation system
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation_pick_request_identifier: Option<String>,
    /// Latest time the pick can still make its shipment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cut_off_time: Option<WireDateTime>,
    /// Time the pick should be completed by
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pick_before_time: Option<WireDateTime>,
    /// Where picked goods are handed over
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handover_location: Option<Value>,
    /// Set by the WMS when the pick was done by hand
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manually_picked: Option<bool>,
    /// Service window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<WireServiceWindow>,
    /// Uninterpreted fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PickRequestPayload {
    /// Whether the WMS reports the pick as done by hand.
    #[must_use]
    pub fn is_manually_picked(&self) -> bool {
        self.manually_picked.unwrap_or(false)
    }

    /// The create-path identifier, if present and not blank.
    #[must_use]
    pub fn wms_pick_request_identifier(&self) -> Option<&str> {
        non_blank(self.wms_pick_request_identifier.as_deref())
    }

    /// The update/cancel-path identifier, if present and not blank.
    #[must_use]
    pub fn pick_request_identifier(&self) -> Option<&str> {
        non_blank(self.pick_request_identifier.as_deref())
    }

    /// Handover location, unless absent, JSON `null` or a blank string.
    #[must_use]
    pub fn handover_location(&self) -> Option<&Value> {
        self.handover_location.as_ref().filter(|value| match value {
            Value::Null => false,
            Value::String(text) => !text.trim().is_empty(),
            _ => true,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}

/// Turns raw message bytes into a [`PickRequestPayload`].
///
/// The bus-specific transport decoding (base64, compression) happens before
/// this seam; implementations receive the payload bytes.
pub trait PayloadDecoder: Send + Sync {
    /// Decode a payload.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::MalformedMessage`] for empty or invalid payloads.
    fn decode(&self, data: &[u8]) -> Result<PickRequestPayload, ReconcileError>;
}

/// Decoder for UTF-8 JSON payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPayloadDecoder;

impl PayloadDecoder for JsonPayloadDecoder {
    fn decode(&self, data: &[u8]) -> Result<PickRequestPayload, ReconcileError> {
        decode_payload(data)
    }
}

/// Decode a JSON payload.
///
/// # Errors
///
/// Returns [`ReconcileError::MalformedMessage`] if the bytes are empty, not
/// JSON, not an object, an empty object, or do not match the payload shape.
pub fn decode_payload(data: &[u8]) -> Result<PickRequestPayload, ReconcileError> {
    if data.iter().all(u8::is_ascii_whitespace) {
        return Err(ReconcileError::malformed(INVALID_DATA));
    }

    let value: Value = serde_json::from_slice(data)
        .map_err(|e| ReconcileError::malformed(format!("{INVALID_DATA} {e}")))?;

    match &value {
        Value::Object(object) if !object.is_empty() => {},
        _ => return Err(ReconcileError::malformed(INVALID_DATA)),
    }

    serde_json::from_value(value)
        .map_err(|e| ReconcileError::malformed(format!("{INVALID_DATA} {e}")))
}

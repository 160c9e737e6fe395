//! The durable pick request record and its partial update.
//!
//! A pick request is stored as a JSON document under the composite key
//! `<wmsIdentifier>-<wmsPickRequestIdentifier>`. Field names on the wire and in
//! the store are camelCase. Fields this service does not interpret (pick request
//! lines, customer data, ...) are kept in `extra` and round-trip untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Lifecycle status of a pick request.
///
/// The set is open: statuses owned by other services are preserved verbatim
/// through [`PickRequestStatus::Other`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PickRequestStatus {
    /// Created by this service, not yet picked up by the automation system
    Requested,
    /// Allocated to the automation system
    Allocated,
    /// Created in the automation system
    Created,
    /// Picked by hand outside of automation
    ManuallyPicked,
    /// Cancellation sent to the automation system
    CancellationRequested,
    /// Automation system refuses cancellation (picking in progress)
    CancellationLocked,
    /// Any status this service does not know about
    Other(String),
}

impl PickRequestStatus {
    /// Wire representation, e.g. `manually-picked`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Requested => "requested",
            Self::Allocated => "allocated",
            Self::Created => "created",
            Self::ManuallyPicked => "manually-picked",
            Self::CancellationRequested => "cancellation-requested",
            Self::CancellationLocked => "cancellation-locked",
            Self::Other(status) => status,
        }
    }

    /// Parse the wire representation. Unknown values become [`Self::Other`].
    #[must_use]
    pub fn parse(status: &str) -> Self {
        match status {
            "requested" => Self::Requested,
            "allocated" => Self::Allocated,
            "created" => Self::Created,
            "manually-picked" => Self::ManuallyPicked,
            "cancellation-requested" => Self::CancellationRequested,
            "cancellation-locked" => Self::CancellationLocked,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether the automation system can still be asked to cancel the pick.
    ///
    /// Only `allocated`, `requested` and `created` qualify.
    #[must_use]
    pub const fn is_cancellable(&self) -> bool {
        matches!(self, Self::Allocated | Self::Requested | Self::Created)
    }
}

impl fmt::Display for PickRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PickRequestStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PickRequestStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let status = String::deserialize(deserializer)?;
        Ok(Self::parse(&status))
    }
}

/// Service window of a pick request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceWindow {
    /// Start of the window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_time: Option<DateTime<Utc>>,
    /// End of the window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_time: Option<DateTime<Utc>>,
    /// Uninterpreted service fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A pick request as persisted in the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickRequest {
    /// WMS that owns the pick request
    pub wms_identifier: String,
    /// Identifier of the pick request inside its WMS
    pub wms_pick_request_identifier: String,
    /// Order the pick belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_reference: Option<String>,
    /// Business pick identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pick_identifier: Option<String>,
    /// Automation system that executes the pick
    pub automation_system_identifier: String,
    /// Identifier assigned by the automation system
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation_pick_request_identifier: Option<String>,
    /// Lifecycle status
    pub status: PickRequestStatus,
    /// Latest time the pick can still make its shipment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cut_off_time: Option<DateTime<Utc>>,
    /// Time the pick should be completed by
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pick_before_time: Option<DateTime<Utc>>,
    /// Where picked goods are handed over
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handover_location: Option<Value>,
    /// Service window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceWindow>,
    /// Uninterpreted fields carried through from the create payload
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PickRequest {
    /// Store key of this record.
    #[must_use]
    pub fn key(&self) -> PickRequestKey {
        PickRequestKey::new(&self.wms_identifier, &self.wms_pick_request_identifier)
    }
}

/// Fields an update event may change.
///
/// Absent fields are omitted from the serialized document so that a merge
/// leaves the stored values untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickRequestUpdate {
    /// Identifier of the pick request inside its WMS
    pub wms_pick_request_identifier: String,
    /// New cut-off time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cut_off_time: Option<DateTime<Utc>>,
    /// New pick-before time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pick_before_time: Option<DateTime<Utc>>,
    /// New handover location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handover_location: Option<Value>,
    /// New status (only ever `manually-picked`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PickRequestStatus>,
}

/// Composite store key: `<wmsIdentifier>-<pickRequestIdentifier>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PickRequestKey(String);

impl PickRequestKey {
    /// Build the key for a pick request of a WMS.
    #[must_use]
    pub fn new(wms_identifier: &str, pick_request_identifier: &str) -> Self {
        Self(format!("{wms_identifier}-{pick_request_identifier}"))
    }

    /// Key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PickRequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

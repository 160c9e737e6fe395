//! Building the pick request record on the create path.

use crate::datetime::normalize_field;
use crate::error::ReconcileError;
use crate::payload::{PickRequestPayload, WireServiceWindow};
use crate::pick_request::{PickRequest, PickRequestStatus, ServiceWindow};

/// Build the record persisted for a newly created pick request.
///
/// Normalizes `pickBeforeTime`, `cutOffTime`, `service.fromTime` and
/// `service.toTime` into instants, stamps the WMS and automation system
/// identifiers and sets the status to `requested`. The stamped values take
/// precedence over same-named payload fields. Everything else in the payload is
/// carried over unchanged.
///
/// # Errors
///
/// Returns [`ReconcileError::MalformedMessage`] if `wmsPickRequestIdentifier`
/// is missing or a date-time field cannot be parsed.
pub fn build_pick_request(
    payload: &PickRequestPayload,
    automation_system_identifier: &str,
    wms_identifier: &str,
) -> Result<PickRequest, ReconcileError> {
    let wms_pick_request_identifier = payload
        .wms_pick_request_identifier()
        .ok_or_else(|| ReconcileError::malformed("wmsPickRequestIdentifier is missing"))?
        .to_string();

    let mut extra = payload.extra.clone();
    // Stamped fields are typed on the record; drop payload copies so they
    // cannot shadow them through the flattened map.
    for stamped in ["wmsIdentifier", "automationSystemIdentifier", "status"] {
        extra.remove(stamped);
    }
    if let Some(pick_request_identifier) = &payload.pick_request_identifier {
        extra.insert(
            "pickRequestIdentifier".to_string(),
            pick_request_identifier.clone().into(),
        );
    }
    if let Some(manually_picked) = payload.manually_picked {
        extra.insert("manuallyPicked".to_string(), manually_picked.into());
    }

    Ok(PickRequest {
        wms_identifier: wms_identifier.to_string(),
        wms_pick_request_identifier,
        order_reference: payload.order_reference.clone(),
        pick_identifier: payload.pick_identifier.clone(),
        automation_system_identifier: automation_system_identifier.to_string(),
        automation_pick_request_identifier: payload.automation_pick_request_identifier.clone(),
        status: PickRequestStatus::Requested,
        cut_off_time: normalize_field("cutOffTime", payload.cut_off_time.as_ref())?,
        pick_before_time: normalize_field("pickBeforeTime", payload.pick_before_time.as_ref())?,
        handover_location: payload.handover_location().cloned(),
        service: payload.service.as_ref().map(build_service).transpose()?,
        extra,
    })
}

fn build_service(service: &WireServiceWindow) -> Result<ServiceWindow, ReconcileError> {
    Ok(ServiceWindow {
        from_time: normalize_field("service.fromTime", service.from_time.as_ref())?,
        to_time: normalize_field("service.toTime", service.to_time.as_ref())?,
        extra: service.extra.clone(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::payload::decode_payload;
    use chrono::{DateTime, Utc};
    use serde_json::json;

    fn utc(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
    }

    fn plain_payload() -> PickRequestPayload {
        let data = json!({
            "wmsPickRequestIdentifier": "test-pick-request",
            "orderReference": "ORDER-42",
            "pickIdentifier": "PICK-42",
            "cutOffTime": "2021-10-08T22:00:00Z",
            "pickBeforeTime": "2021-10-08T21:00:00Z",
            "service": {
                "fromTime": "2021-10-08T08:00:00Z",
                "toTime": "2021-10-08T18:00:00Z",
                "serviceType": "click-and-collect",
            },
            "pickRequestLines": [{ "itemNumber": "10001", "quantity": 3 }],
        });
        decode_payload(data.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn maps_the_pick_request_and_converts_date_times() {
        let result = build_pick_request(&plain_payload(), "AS-STO-TEST", "MHS-STO-TEST").unwrap();

        assert_eq!(result.cut_off_time, Some(utc("2021-10-08T22:00:00Z")));
        assert_eq!(result.pick_before_time, Some(utc("2021-10-08T21:00:00Z")));
        let service = result.service.as_ref().unwrap();
        assert_eq!(service.from_time, Some(utc("2021-10-08T08:00:00Z")));
        assert_eq!(service.to_time, Some(utc("2021-10-08T18:00:00Z")));
        assert_eq!(service.extra["serviceType"], json!("click-and-collect"));
        assert_eq!(result.wms_identifier, "MHS-STO-TEST");
        assert_eq!(result.automation_system_identifier, "AS-STO-TEST");
        assert_eq!(result.status, PickRequestStatus::Requested);
        assert_eq!(result.order_reference.as_deref(), Some("ORDER-42"));
        assert!(result.extra.contains_key("pickRequestLines"));
    }

    #[test]
    fn absent_times_stay_absent() {
        let payload = decode_payload(br#"{"wmsPickRequestIdentifier":"1"}"#).unwrap();
        let result = build_pick_request(&payload, "iws-1", "TEST-WMS-1").unwrap();
        assert_eq!(result.cut_off_time, None);
        assert_eq!(result.pick_before_time, None);
        assert_eq!(result.service, None);
    }

    #[test]
    fn payload_cannot_override_stamped_fields() {
        let payload = decode_payload(
            br#"{"wmsPickRequestIdentifier":"1","status":"picked","wmsIdentifier":"OTHER"}"#,
        )
        .unwrap();
        let result = build_pick_request(&payload, "iws-1", "TEST-WMS-1").unwrap();
        let document = serde_json::to_value(&result).unwrap();
        assert_eq!(document["status"], json!("requested"));
        assert_eq!(document["wmsIdentifier"], json!("TEST-WMS-1"));
    }

    #[test]
    fn invalid_time_is_malformed() {
        let payload =
            decode_payload(br#"{"wmsPickRequestIdentifier":"1","cutOffTime":"soon"}"#).unwrap();
        let error = build_pick_request(&payload, "iws-1", "TEST-WMS-1").unwrap_err();
        assert!(matches!(error, ReconcileError::MalformedMessage(ref m) if m.contains("cutOffTime")));
    }

    #[test]
    fn missing_identifier_is_malformed() {
        let payload = decode_payload(br#"{"orderReference":"O-1"}"#).unwrap();
        assert!(build_pick_request(&payload, "iws-1", "TEST-WMS-1").is_err());
    }
}

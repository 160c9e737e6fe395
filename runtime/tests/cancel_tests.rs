//! Cancel operation scenarios

#![allow(clippy::unwrap_used)] // Tests can unwrap

mod common;

use common::{Harness, message};
use pick_request_core::outcome::Outcome;
use pick_request_core::pick_request::PickRequestStatus;
use pick_request_core::ReconcileError;
use pick_request_testing::fixtures::{self, SEEDED_AUTOMATION_SYSTEM};
use proptest::prelude::*;
use serde_json::json;

#[tokio::test]
async fn cancel_forwards_the_stored_record_to_its_automation_system() {
    let harness = Harness::seeded();

    let outcome = harness
        .process(&message("event-1", "cancel", &json!({ "pickRequestIdentifier": "2" })))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::CancellationForwarded);
    let routed = harness.routed();
    assert_eq!(routed.len(), 1);
    assert_eq!(routed[0].attributes.get("target"), Some(SEEDED_AUTOMATION_SYSTEM));
    assert_eq!(routed[0].attributes.get("operation"), Some("cancel"));
    assert_eq!(routed[0].body["wmsPickRequestIdentifier"], json!("2"));
    assert_eq!(routed[0].body["status"], json!("allocated"));
}

#[tokio::test]
async fn cancel_does_not_change_the_stored_status() {
    let harness = Harness::seeded();

    harness
        .process(&message("event-1", "cancel", &json!({ "pickRequestIdentifier": "2" })))
        .await
        .unwrap();

    assert_eq!(harness.store.write_count(), 0);
    assert_eq!(harness.store.field("TEST-WMS-1-2", "status"), Some(json!("allocated")));
}

#[tokio::test]
async fn cancel_finds_records_stored_under_any_document_id() {
    let harness = Harness::seeded();

    let outcome = harness
        .process(&message(
            "event-1",
            "cancel",
            &json!({ "pickRequestIdentifier": "test-pick-request" }),
        ))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::CancellationForwarded);
}

#[tokio::test]
async fn cancel_after_manual_pick_is_skipped() {
    let harness = Harness::seeded();

    let outcome = harness
        .process(&message("event-1", "cancel", &json!({ "pickRequestIdentifier": "3" })))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::CancellationSkipped);
    assert!(harness.publisher.is_empty());
    assert!(harness.dead_letters.recorded().is_empty());
}

#[tokio::test]
async fn cancel_of_unknown_pick_request_is_not_found() {
    let harness = Harness::seeded();

    let outcome = harness
        .process(&message("event-1", "cancel", &json!({ "pickRequestIdentifier": "404" })))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Discarded);
    assert_eq!(harness.dead_letters.recorded()[0].error_kind, "not_found");
}

#[tokio::test]
async fn cancel_when_the_store_is_down_is_redelivered() {
    let harness = Harness::seeded();
    harness.store.fail_reads(true);

    let error = harness
        .process(&message("event-1", "cancel", &json!({ "pickRequestIdentifier": "2" })))
        .await
        .unwrap_err();

    assert!(matches!(error, ReconcileError::Persistence(_)));
    assert!(!harness.dedup.has_seen("event-1"));
}

fn any_status() -> impl Strategy<Value = PickRequestStatus> {
    prop_oneof![
        Just(PickRequestStatus::Requested),
        Just(PickRequestStatus::Allocated),
        Just(PickRequestStatus::Created),
        Just(PickRequestStatus::ManuallyPicked),
        Just(PickRequestStatus::CancellationRequested),
        Just(PickRequestStatus::CancellationLocked),
        "[a-z]{3,12}".prop_map(|status| PickRequestStatus::parse(&status)),
    ]
}

proptest! {
    #[test]
    fn cancel_publishes_only_for_cancellable_statuses(status in any_status()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let harness = Harness::empty();
        harness.store.seed("TEST-WMS-1-5", &fixtures::pick_request("5", status.clone()));

        let outcome = runtime
            .block_on(harness.process(&message("event-1", "cancel", &json!({ "pickRequestIdentifier": "5" }))))
            .unwrap();

        let cancellable = matches!(
            status,
            PickRequestStatus::Allocated | PickRequestStatus::Requested | PickRequestStatus::Created
        );
        prop_assert_eq!(outcome == Outcome::CancellationForwarded, cancellable);
        prop_assert_eq!(harness.publisher.len(), usize::from(cancellable));
    }
}

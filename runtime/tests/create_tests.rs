//! Create operation scenarios

#![allow(clippy::unwrap_used)] // Tests can unwrap

mod common;

use common::{Harness, message, message_for};
use pick_request_core::outcome::Outcome;
use pick_request_core::ReconcileError;
use pick_request_testing::fixtures::MessageBuilder;
use serde_json::json;

#[tokio::test]
async fn create_stores_a_requested_record_and_routes_it_to_the_automation_system() {
    let harness = Harness::empty();
    let payload = json!({
        "wmsPickRequestIdentifier": "2",
        "orderReference": "ORDER-2",
        "cutOffTime": "2021-10-09T00:00:00+02:00",
        "pickRequestLines": [{ "itemNumber": "4711", "quantity": 1 }],
    });

    let outcome = harness
        .process(&message_for("event-1", "create", "AS-STO-TEST", &payload))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Created);
    assert_eq!(harness.store.document_ids(), vec!["TEST-WMS-1-2"]);
    assert_eq!(harness.store.field("TEST-WMS-1-2", "status"), Some(json!("requested")));
    assert_eq!(
        harness.store.field("TEST-WMS-1-2", "wmsIdentifier"),
        Some(json!("TEST-WMS-1"))
    );
    assert_eq!(
        harness.store.field("TEST-WMS-1-2", "automationSystemIdentifier"),
        Some(json!("AS-STO-TEST"))
    );
    assert_eq!(
        harness.store.field("TEST-WMS-1-2", "cutOffTime"),
        Some(json!("2021-10-08T22:00:00Z"))
    );

    let routed = harness.routed();
    assert_eq!(routed.len(), 1);
    assert_eq!(routed[0].attributes.get("target"), Some("AS-STO-TEST"));
    assert_eq!(routed[0].attributes.get("operation"), Some("create"));
    assert_eq!(routed[0].body["status"], json!("requested"));
    assert_eq!(routed[0].body["pickRequestLines"][0]["itemNumber"], json!("4711"));
}

#[tokio::test]
async fn second_create_for_the_same_pick_request_is_a_no_op() {
    let harness = Harness::empty();
    let payload = json!({ "wmsPickRequestIdentifier": "7" });

    let first = harness.process(&message("event-1", "create", &payload)).await.unwrap();
    let second = harness.process(&message("event-2", "create", &payload)).await.unwrap();

    assert_eq!(first, Outcome::Created);
    assert_eq!(second, Outcome::DuplicateCreate);
    assert_eq!(harness.store.len(), 1);
    assert_eq!(harness.store.write_count(), 1);
    assert_eq!(harness.routed().len(), 1);
}

#[tokio::test]
async fn create_for_an_existing_pick_request_keeps_its_status() {
    let harness = Harness::seeded();

    let outcome = harness
        .process(&message("event-1", "create", &json!({ "wmsPickRequestIdentifier": "2" })))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::DuplicateCreate);
    assert_eq!(harness.store.field("TEST-WMS-1-2", "status"), Some(json!("allocated")));
    assert!(harness.publisher.is_empty());
}

#[tokio::test]
async fn create_in_another_wms_is_a_different_pick_request() {
    let harness = Harness::seeded();
    let message = MessageBuilder::new("event-1")
        .operation("create")
        .wms("TEST-WMS-2")
        .payload(&json!({ "wmsPickRequestIdentifier": "2" }))
        .build();

    assert_eq!(harness.process(&message).await.unwrap(), Outcome::Created);
    assert!(harness.store.document("TEST-WMS-2-2").is_some());
}

#[tokio::test]
async fn inbound_target_attribute_wins_over_the_automation_system() {
    let harness = Harness::empty();
    let message = MessageBuilder::new("event-1")
        .operation("create")
        .attribute("target", "override-target")
        .payload(&json!({ "wmsPickRequestIdentifier": "8" }))
        .build();

    harness.process(&message).await.unwrap();

    assert_eq!(harness.routed()[0].attributes.get("target"), Some("override-target"));
}

#[tokio::test]
async fn store_failure_is_retried_and_the_redelivery_succeeds() {
    let harness = Harness::empty();
    let message = message("event-1", "create", &json!({ "wmsPickRequestIdentifier": "9" }));

    harness.store.fail_writes(true);
    let error = harness.process(&message).await.unwrap_err();
    assert!(matches!(error, ReconcileError::Persistence(_)));
    assert!(harness.publisher.is_empty());
    assert!(!harness.dedup.has_seen("event-1"));

    harness.store.fail_writes(false);
    assert_eq!(harness.process(&message).await.unwrap(), Outcome::Created);
    assert_eq!(harness.routed().len(), 1);
}

#[tokio::test]
async fn publish_failure_after_store_is_retryable_and_does_not_duplicate_the_record() {
    let harness = Harness::empty();
    let message = message("event-1", "create", &json!({ "wmsPickRequestIdentifier": "10" }));

    harness.publisher.fail_publishes(true);
    let error = harness.process(&message).await.unwrap_err();
    assert!(matches!(error, ReconcileError::Publish(_)));
    assert!(error.is_retryable());
    assert_eq!(harness.store.len(), 1);

    harness.publisher.fail_publishes(false);
    assert_eq!(harness.process(&message).await.unwrap(), Outcome::DuplicateCreate);
    assert_eq!(harness.store.len(), 1);
    assert_eq!(harness.store.write_count(), 1);
}

#[tokio::test]
async fn invalid_cut_off_time_is_discarded_without_writing() {
    let harness = Harness::empty();
    let payload = json!({ "wmsPickRequestIdentifier": "11", "cutOffTime": "next tuesday" });

    let outcome = harness.process(&message("event-1", "create", &payload)).await.unwrap();

    assert_eq!(outcome, Outcome::Discarded);
    assert!(harness.store.is_empty());
    assert!(harness.publisher.is_empty());
    assert_eq!(harness.dead_letters.recorded()[0].error_kind, "malformed_message");
}

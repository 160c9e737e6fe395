//! Redpanda transport for the pick request reconciler.
//!
//! This crate connects the reconciler to a Kafka-compatible bus through
//! rdkafka:
//!
//! - [`RedpandaSubscription`]: reads the pick request topic, turning each
//!   record into an `InboundMessage` (headers become attributes)
//! - [`RedpandaRoutingPublisher`]: implements `RoutingPublisher` for the
//!   routing topic (attributes become headers, the body is JSON)
//!
//! # Architecture
//!
//! ```text
//! pick-request-topic ──► RedpandaSubscription ──► MessageProcessor
//!                                                      │
//!                                                      ▼
//!                         routing-topic ◄── RedpandaRoutingPublisher
//! ```
//!
//! Any Kafka-compatible broker works: Redpanda, Apache Kafka, AWS MSK.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod headers;
pub mod publisher;
pub mod subscription;

pub use headers::EVENT_ID_HEADER;
pub use publisher::{RedpandaRoutingPublisher, RedpandaRoutingPublisherBuilder};
pub use subscription::{
    Delivery, RedpandaSubscription, RedpandaSubscriptionBuilder, SubscriptionError,
};

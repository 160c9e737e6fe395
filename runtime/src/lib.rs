//! # Pick Request Runtime
//!
//! Runtime that turns inbound pick request deliveries into store writes and
//! routing publishes.
//!
//! ## Core Components
//!
//! - **Reconciler**: applies create, update and cancel events to the store and
//!   decides what is forwarded to routing
//! - **Message processor**: dedup gate, attribute extraction, payload decoding
//!   and the boundary to the flawed-message handler
//! - **Flawed message policy**: redeliver retryable failures, dead-letter and
//!   acknowledge the rest
//! - **Metrics**: Prometheus counters and latency histogram
//!
//! ## Example
//!
//! ```
//! use pick_request_runtime::{FlawedMessagePolicy, MessageProcessor, Reconciler};
//! use pick_request_testing::fixtures::MessageBuilder;
//! use pick_request_testing::{InMemoryDeduplicator, InMemoryPickRequestStore, RecordingPublisher};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dedup = Arc::new(InMemoryDeduplicator::new());
//! let reconciler = Reconciler::new(
//!     Arc::new(InMemoryPickRequestStore::new()),
//!     Arc::new(RecordingPublisher::new()),
//! );
//! let processor = MessageProcessor::new(
//!     "pick-request-topic",
//!     dedup.clone(),
//!     reconciler,
//!     Arc::new(FlawedMessagePolicy::new(dedup)),
//! );
//!
//! let message = MessageBuilder::new("event-1")
//!     .operation("create")
//!     .payload(&json!({ "wmsPickRequestIdentifier": "7" }))
//!     .build();
//! let outcome = processor.process(&message).await?;
//! assert!(outcome.published());
//! # Ok(())
//! # }
//! ```

/// Prometheus metrics for observability
pub mod metrics;

pub mod policy;
pub mod processor;
pub mod reconciler;

pub use policy::FlawedMessagePolicy;
pub use processor::MessageProcessor;
pub use reconciler::Reconciler;

//! # Pick Request Core
//!
//! Domain types and collaborator traits for reconciling WMS pick request events.
//!
//! A warehouse management system (WMS) publishes create, update and cancel
//! events for pick requests. The reconciler keeps one stored record per pick
//! request and forwards the relevant messages to the routing topic for the
//! automation system that will perform the pick.
//!
//! ## Core Concepts
//!
//! - **Inbound message**: payload bytes, string attributes and a delivery id
//!   ([`message`])
//! - **Payload**: the decoded JSON body of a message ([`payload`])
//! - **Pick request**: the stored record and its status ([`pick_request`])
//! - **Routing message**: what gets forwarded to an automation system
//!   ([`routing`])
//! - **Collaborators**: store, publisher, deduplicator, dead letter sink and
//!   flawed-message handler, all injected as `Arc<dyn Trait>`
//!
//! ## Example
//!
//! ```
//! use pick_request_core::message::{EventHeader, MessageAttributes, Operation};
//!
//! let attributes = MessageAttributes::new()
//!     .with("operation", "create")
//!     .with("wmsIdentifier", "TEST-WMS-1")
//!     .with("automationSystemIdentifier", "iws-sto-1");
//!
//! let header = EventHeader::from_attributes(&attributes).unwrap();
//! assert_eq!(header.operation, Operation::Create);
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

pub mod datetime;
pub mod dead_letter;
pub mod dedup;
pub mod environment;
pub mod error;
pub mod event_bus;
pub mod flawed;
pub mod message;
pub mod outcome;
pub mod payload;
pub mod pick_request;
pub mod record;
pub mod routing;
pub mod store;

pub use dead_letter::{DeadLetterError, DeadLetterSink, FailedMessage};
pub use dedup::{DedupError, Deduplicator};
pub use environment::{Clock, SystemClock};
pub use error::ReconcileError;
pub use event_bus::{PublishError, RoutingPublisher};
pub use flawed::FlawedMessageHandler;
pub use message::{EventHeader, InboundEvent, InboundMessage, MessageAttributes, Operation};
pub use outcome::Outcome;
pub use payload::{JsonPayloadDecoder, PayloadDecoder, PickRequestPayload};
pub use pick_request::{PickRequest, PickRequestKey, PickRequestStatus, PickRequestUpdate};
pub use record::build_pick_request;
pub use routing::{KnownAutomationSystems, ROUTING_TOPIC, RoutingMessage};
pub use store::{Document, PickRequestStore, StoreError};

//! Pick request service.
//!
//! Wires the reconciler runtime to `PostgreSQL` and Redpanda:
//!
//! - [`config`]: environment configuration
//! - [`consumer`]: the receive, process, commit loop with graceful shutdown

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod consumer;

pub use config::Config;
pub use consumer::{DeliverySource, PickRequestConsumer, Settlement};

//! Prometheus metrics for observability and monitoring.
//!
//! This module provides metric collection for message processing:
//! - Outcomes of processed messages
//! - Failures by kind and retryability
//! - Routing publishes by operation
//! - Reconciliation latency
//!
//! # Example
//!
//! ```rust,no_run
//! use pick_request_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Start metrics server on port 9090
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use pick_request_core::error::ReconcileError;
use pick_request_core::message::Operation;
use pick_request_core::outcome::Outcome;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Messages that finished processing, labelled by `outcome`.
pub const MESSAGES_PROCESSED: &str = "pick_request_messages_processed_total";
/// Messages that failed, labelled by `kind` and `retryable`.
pub const MESSAGES_FAILED: &str = "pick_request_messages_failed_total";
/// Routing publishes, labelled by `operation`.
pub const ROUTING_PUBLISHED: &str = "pick_request_routing_published_total";
/// Time spent processing one message.
pub const RECONCILE_DURATION: &str = "pick_request_reconcile_duration_seconds";

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics server.
///
/// Exposes metrics on an HTTP endpoint for Prometheus scraping.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address to bind to (e.g., `0.0.0.0:9090`)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Install the recorder and start serving `/metrics`.
    ///
    /// Must be called from within a tokio runtime; the HTTP listener runs as a
    /// spawned task.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built (e.g. the address cannot
    /// be bound) or a different recorder is already installed.
    ///
    /// # Note
    ///
    /// If a metrics recorder is already installed (e.g., in tests), this logs a
    /// warning and leaves the existing recorder in place.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .build()
            .map_err(|e| MetricsError::Build(e.to_string()))?;
        let handle = recorder.handle();

        match metrics::set_global_recorder(recorder) {
            Ok(()) => {
                tokio::spawn(async move {
                    if let Err(e) = exporter.await {
                        tracing::error!(error = ?e, "Metrics exporter stopped");
                    }
                });
                self.handle = Some(handle);
                tracing::info!(
                    addr = %self.addr,
                    "Metrics server started - available at http://{}/metrics",
                    self.addr
                );
                Ok(())
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if server hasn't been started.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(
        MESSAGES_PROCESSED,
        "Total number of pick request messages processed, by outcome"
    );
    describe_counter!(
        MESSAGES_FAILED,
        "Total number of pick request messages that failed, by error kind"
    );
    describe_counter!(
        ROUTING_PUBLISHED,
        "Total number of messages published to the routing topic"
    );
    describe_histogram!(
        RECONCILE_DURATION,
        "Time taken to process a pick request message"
    );
}

/// Message processing metrics recorder.
pub struct ProcessorMetrics;

impl ProcessorMetrics {
    /// Record a message that finished with `outcome`.
    pub fn record_outcome(outcome: &Outcome, duration: Duration) {
        counter!(MESSAGES_PROCESSED, "outcome" => outcome.label()).increment(1);
        histogram!(RECONCILE_DURATION).record(duration.as_secs_f64());
    }

    /// Record a failed message.
    pub fn record_failure(error: &ReconcileError, duration: Duration) {
        counter!(
            MESSAGES_FAILED,
            "kind" => error.kind(),
            "retryable" => if error.is_retryable() { "true" } else { "false" }
        )
        .increment(1);
        histogram!(RECONCILE_DURATION).record(duration.as_secs_f64());
    }
}

/// Reconciler metrics recorder.
pub struct ReconcilerMetrics;

impl ReconcilerMetrics {
    /// Record a publish to the routing topic.
    pub fn record_publish(operation: &Operation) {
        counter!(ROUTING_PUBLISHED, "operation" => operation.as_str().to_string()).increment(1);
    }
}

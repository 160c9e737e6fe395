//! Routing publisher over a Kafka-compatible producer.

use crate::headers::to_kafka_headers;
use pick_request_core::event_bus::{PublishError, RoutingPublisher};
use pick_request_core::message::WMS_IDENTIFIER;
use pick_request_core::routing::RoutingMessage;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Publishes routing messages to Redpanda.
///
/// The body is the JSON encoding of [`RoutingMessage::body`]; every attribute
/// becomes a record header. Records are keyed by `wmsIdentifier` so messages
/// of one WMS keep their order within a partition.
///
/// # Example
///
/// ```no_run
/// use pick_request_redpanda::RedpandaRoutingPublisher;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// // Basic configuration
/// let publisher = RedpandaRoutingPublisher::new("localhost:9092")?;
///
/// // Custom configuration
/// let publisher = RedpandaRoutingPublisher::builder()
///     .brokers("localhost:9092,localhost:9093")
///     .producer_acks("all")
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct RedpandaRoutingPublisher {
    producer: FutureProducer,
    brokers: String,
    timeout: Duration,
}

impl RedpandaRoutingPublisher {
    /// Create a publisher with default producer settings.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::ConnectionFailed`] if the producer cannot be
    /// created.
    pub fn new(brokers: &str) -> Result<Self, PublishError> {
        Self::builder().brokers(brokers).build()
    }

    /// Create a new builder for configuring the publisher.
    #[must_use]
    pub fn builder() -> RedpandaRoutingPublisherBuilder {
        RedpandaRoutingPublisherBuilder::default()
    }

    /// Get a reference to the brokers string.
    #[must_use]
    pub fn brokers(&self) -> &str {
        &self.brokers
    }
}

/// Builder for configuring a [`RedpandaRoutingPublisher`].
#[derive(Default)]
pub struct RedpandaRoutingPublisherBuilder {
    brokers: Option<String>,
    producer_acks: Option<String>,
    compression: Option<String>,
    timeout: Option<Duration>,
}

impl RedpandaRoutingPublisherBuilder {
    /// Set the broker addresses (comma-separated).
    #[must_use]
    pub fn brokers(mut self, brokers: impl Into<String>) -> Self {
        self.brokers = Some(brokers.into());
        self
    }

    /// Set the producer acknowledgment mode: "0", "1" or "all".
    ///
    /// Default: "all"
    #[must_use]
    pub fn producer_acks(mut self, acks: impl Into<String>) -> Self {
        self.producer_acks = Some(acks.into());
        self
    }

    /// Set the compression codec: "none", "gzip", "snappy", "lz4", "zstd".
    ///
    /// Default: "none"
    #[must_use]
    pub fn compression(mut self, compression: impl Into<String>) -> Self {
        self.compression = Some(compression.into());
        self
    }

    /// Set the producer send timeout.
    ///
    /// Default: 5 seconds
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the [`RedpandaRoutingPublisher`].
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::ConnectionFailed`] if brokers are not set or
    /// the producer cannot be created.
    pub fn build(self) -> Result<RedpandaRoutingPublisher, PublishError> {
        let brokers = self
            .brokers
            .ok_or_else(|| PublishError::ConnectionFailed("Brokers not configured".to_string()))?;
        let timeout = self.timeout.unwrap_or(Duration::from_secs(5));
        let acks = self.producer_acks.as_deref().unwrap_or("all");
        let compression = self.compression.as_deref().unwrap_or("none");

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &brokers)
            .set("message.timeout.ms", timeout.as_millis().to_string())
            .set("acks", acks)
            .set("compression.type", compression)
            .create()
            .map_err(|e| PublishError::ConnectionFailed(format!("Failed to create producer: {e}")))?;

        tracing::info!(
            brokers = %brokers,
            acks = acks,
            compression = compression,
            timeout_ms = timeout.as_millis(),
            "RedpandaRoutingPublisher created successfully"
        );

        Ok(RedpandaRoutingPublisher {
            producer,
            brokers,
            timeout,
        })
    }
}

impl RoutingPublisher for RedpandaRoutingPublisher {
    fn publish(
        &self,
        topic: &str,
        message: &RoutingMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), PublishError>> + Send + '_>> {
        let topic = topic.to_string();
        let message = message.clone();
        let timeout = self.timeout;

        Box::pin(async move {
            let payload = serde_json::to_vec(&message.body)
                .map_err(|e| PublishError::SerializationFailed(e.to_string()))?;
            let key = message
                .attributes
                .get(WMS_IDENTIFIER)
                .unwrap_or_default()
                .to_string();

            let record = FutureRecord::to(&topic)
                .payload(&payload)
                .key(&key)
                .headers(to_kafka_headers(&message.attributes));

            match self.producer.send(record, Timeout::After(timeout)).await {
                Ok((partition, offset)) => {
                    tracing::debug!(
                        topic = %topic,
                        partition = partition,
                        offset = offset,
                        "Routing message published"
                    );
                    Ok(())
                },
                Err((kafka_error, _)) => {
                    tracing::error!(
                        topic = %topic,
                        error = %kafka_error,
                        "Failed to publish routing message"
                    );
                    Err(PublishError::PublishFailed {
                        topic,
                        reason: kafka_error.to_string(),
                    })
                },
            }
        })
    }
}

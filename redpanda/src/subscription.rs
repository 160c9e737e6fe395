//! Inbound pick request subscription.
//!
//! # Delivery Semantics
//!
//! **At-least-once delivery** with manual offset commits:
//! - A delivery is committed with [`RedpandaSubscription::ack`] only after it
//!   was processed or deliberately discarded
//! - [`RedpandaSubscription::nack`] seeks the partition back to the delivery,
//!   so it is received again
//! - If the process crashes before commit, deliveries are redelivered
//! - Ordering is guaranteed within a partition

use crate::headers::{event_id, from_kafka_headers};
use futures::Stream;
use pick_request_core::message::InboundMessage;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::topic_partition_list::{Offset, TopicPartitionList};
use rdkafka::util::Timeout;
use std::time::Duration;
use thiserror::Error;

/// Errors from the inbound subscription.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The consumer could not be created
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Subscribing to the topic failed
    #[error("Subscription to topic '{topic}' failed: {reason}")]
    SubscribeFailed {
        /// The topic
        topic: String,
        /// The reason for failure
        reason: String,
    },

    /// Receiving from the broker failed
    #[error("Failed to receive message: {0}")]
    Receive(String),

    /// Committing or rewinding an offset failed
    #[error("Offset update failed: {0}")]
    Offset(String),
}

/// One received record and its position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    /// The message handed to the processor
    pub message: InboundMessage,
    /// Topic the record was read from
    pub topic: String,
    /// Partition of the record
    pub partition: i32,
    /// Offset of the record
    pub offset: i64,
}

impl Delivery {
    fn from_record(record: &BorrowedMessage<'_>) -> Self {
        let attributes = from_kafka_headers(record.headers());
        let event_id = event_id(
            attributes.as_ref(),
            record.topic(),
            record.partition(),
            record.offset(),
        );
        Self {
            message: InboundMessage::new(
                event_id,
                record.payload().unwrap_or_default(),
                attributes,
            ),
            topic: record.topic().to_string(),
            partition: record.partition(),
            offset: record.offset(),
        }
    }
}

/// Consumer of the pick request topic with manual commits.
///
/// # Example
///
/// ```no_run
/// use futures::StreamExt;
/// use pick_request_redpanda::RedpandaSubscription;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let subscription = RedpandaSubscription::builder()
///     .brokers("localhost:9092")
///     .topic("pick-request-topic")
///     .consumer_group("pick-request-service")
///     .build()?;
///
/// let mut deliveries = std::pin::pin!(subscription.deliveries());
/// while let Some(delivery) = deliveries.next().await {
///     let delivery = delivery?;
///     // process delivery.message ...
///     subscription.ack(&delivery)?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct RedpandaSubscription {
    consumer: StreamConsumer,
    topic: String,
    consumer_group: String,
    seek_timeout: Duration,
}

impl RedpandaSubscription {
    /// Create a new builder for configuring the subscription.
    #[must_use]
    pub fn builder() -> RedpandaSubscriptionBuilder {
        RedpandaSubscriptionBuilder::default()
    }

    /// Subscribed topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Consumer group id.
    #[must_use]
    pub fn consumer_group(&self) -> &str {
        &self.consumer_group
    }

    /// Wait for the next delivery.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError::Receive`] if the broker reports an error.
    pub async fn recv(&self) -> Result<Delivery, SubscriptionError> {
        let record = self
            .consumer
            .recv()
            .await
            .map_err(|e| SubscriptionError::Receive(e.to_string()))?;

        let delivery = Delivery::from_record(&record);
        tracing::trace!(
            topic = %delivery.topic,
            partition = delivery.partition,
            offset = delivery.offset,
            event_id = %delivery.message.event_id,
            "Received pick request message"
        );
        Ok(delivery)
    }

    /// Endless stream of deliveries.
    pub fn deliveries(&self) -> impl Stream<Item = Result<Delivery, SubscriptionError>> + '_ {
        async_stream::stream! {
            loop {
                yield self.recv().await;
            }
        }
    }

    /// Commit past `delivery`.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError::Offset`] if the commit cannot be queued.
    pub fn ack(&self, delivery: &Delivery) -> Result<(), SubscriptionError> {
        let mut offsets = TopicPartitionList::new();
        offsets
            .add_partition_offset(&delivery.topic, delivery.partition, Offset::Offset(delivery.offset + 1))
            .map_err(|e| SubscriptionError::Offset(e.to_string()))?;

        self.consumer
            .commit(&offsets, CommitMode::Async)
            .map_err(|e| SubscriptionError::Offset(e.to_string()))
    }

    /// Rewind the partition to `delivery` so it is received again.
    ///
    /// Records of the partition already fetched past `delivery` may still be
    /// received before the rewind takes effect.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError::Offset`] if the seek fails.
    pub fn nack(&self, delivery: &Delivery) -> Result<(), SubscriptionError> {
        self.consumer
            .seek(
                &delivery.topic,
                delivery.partition,
                Offset::Offset(delivery.offset),
                Timeout::After(self.seek_timeout),
            )
            .map_err(|e| SubscriptionError::Offset(e.to_string()))?;

        tracing::debug!(
            topic = %delivery.topic,
            partition = delivery.partition,
            offset = delivery.offset,
            "Rewound partition for redelivery"
        );
        Ok(())
    }
}

/// Builder for configuring a [`RedpandaSubscription`].
#[derive(Default)]
pub struct RedpandaSubscriptionBuilder {
    brokers: Option<String>,
    topic: Option<String>,
    consumer_group: Option<String>,
    auto_offset_reset: Option<String>,
    seek_timeout: Option<Duration>,
}

impl RedpandaSubscriptionBuilder {
    /// Set the broker addresses (comma-separated).
    #[must_use]
    pub fn brokers(mut self, brokers: impl Into<String>) -> Self {
        self.brokers = Some(brokers.into());
        self
    }

    /// Set the topic to consume.
    #[must_use]
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Set the consumer group ID.
    ///
    /// Instances sharing a group share the partitions of the topic.
    /// Default: `pick-request-<topic>`
    #[must_use]
    pub fn consumer_group(mut self, consumer_group: impl Into<String>) -> Self {
        self.consumer_group = Some(consumer_group.into());
        self
    }

    /// Set where a new consumer group starts reading: `"earliest"` or
    /// `"latest"`.
    ///
    /// Default: "earliest"
    #[must_use]
    pub fn auto_offset_reset(mut self, policy: impl Into<String>) -> Self {
        self.auto_offset_reset = Some(policy.into());
        self
    }

    /// Set the timeout of a rewind.
    ///
    /// Default: 5 seconds
    #[must_use]
    pub const fn seek_timeout(mut self, timeout: Duration) -> Self {
        self.seek_timeout = Some(timeout);
        self
    }

    /// Build the subscription and subscribe to the topic.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError::ConnectionFailed`] if brokers or topic are
    /// missing or the consumer cannot be created, and
    /// [`SubscriptionError::SubscribeFailed`] if subscribing fails.
    pub fn build(self) -> Result<RedpandaSubscription, SubscriptionError> {
        let brokers = self.brokers.ok_or_else(|| {
            SubscriptionError::ConnectionFailed("Brokers not configured".to_string())
        })?;
        let topic = self.topic.ok_or_else(|| {
            SubscriptionError::ConnectionFailed("Topic not configured".to_string())
        })?;
        let consumer_group = self
            .consumer_group
            .unwrap_or_else(|| format!("pick-request-{topic}"));
        let auto_offset_reset = self.auto_offset_reset.unwrap_or_else(|| "earliest".to_string());

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &brokers)
            .set("group.id", &consumer_group)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", &auto_offset_reset)
            .set("session.timeout.ms", "6000")
            .set("enable.partition.eof", "false")
            .create()
            .map_err(|e| {
                SubscriptionError::ConnectionFailed(format!("Failed to create consumer: {e}"))
            })?;

        consumer
            .subscribe(&[topic.as_str()])
            .map_err(|e| SubscriptionError::SubscribeFailed {
                topic: topic.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!(
            brokers = %brokers,
            topic = %topic,
            consumer_group = %consumer_group,
            auto_offset_reset = %auto_offset_reset,
            manual_commit = true,
            "Subscribed to pick request topic"
        );

        Ok(RedpandaSubscription {
            consumer,
            topic,
            consumer_group,
            seek_timeout: self.seek_timeout.unwrap_or(Duration::from_secs(5)),
        })
    }
}

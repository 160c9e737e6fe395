//! Pick request consumer loop.
//!
//! Receives deliveries from the pick request topic, runs each through the
//! [`MessageProcessor`] and settles it:
//!
//! ```text
//! loop {
//!     receive delivery (or shutdown)
//!     process:
//!         Ok  -> commit
//!         Err -> rewind for redelivery, wait retry_delay
//! }
//! ```
//!
//! A delivery that is being processed when shutdown is signalled is finished
//! and settled before the loop exits.

use pick_request_core::outcome::Outcome;
use pick_request_redpanda::{Delivery, RedpandaSubscription, SubscriptionError};
use pick_request_runtime::MessageProcessor;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Source of deliveries that can be committed or redelivered.
///
/// Implemented for [`RedpandaSubscription`].
pub trait DeliverySource: Send + Sync {
    /// Wait for the next delivery.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError`] if receiving fails.
    fn recv(&self) -> Pin<Box<dyn Future<Output = Result<Delivery, SubscriptionError>> + Send + '_>>;

    /// Commit `delivery`.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError`] if the commit fails.
    fn ack(&self, delivery: &Delivery) -> Result<(), SubscriptionError>;

    /// Make `delivery` be received again.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError`] if the rewind fails.
    fn nack(&self, delivery: &Delivery) -> Result<(), SubscriptionError>;
}

impl DeliverySource for RedpandaSubscription {
    fn recv(&self) -> Pin<Box<dyn Future<Output = Result<Delivery, SubscriptionError>> + Send + '_>> {
        Box::pin(Self::recv(self))
    }

    fn ack(&self, delivery: &Delivery) -> Result<(), SubscriptionError> {
        Self::ack(self, delivery)
    }

    fn nack(&self, delivery: &Delivery) -> Result<(), SubscriptionError> {
        Self::nack(self, delivery)
    }
}

/// How a delivery was settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// Processed (or discarded) and committed
    Acknowledged(Outcome),
    /// Failed with a retryable error and rewound for redelivery
    Redelivered,
}

/// Consumes the pick request topic until shutdown.
pub struct PickRequestConsumer {
    name: String,
    source: Arc<dyn DeliverySource>,
    processor: Arc<MessageProcessor>,
    shutdown: broadcast::Receiver<()>,
    retry_delay: Duration,
}

impl PickRequestConsumer {
    /// Create a consumer with the default retry delay (1 second).
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        source: Arc<dyn DeliverySource>,
        processor: Arc<MessageProcessor>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            processor,
            shutdown,
            retry_delay: Duration::from_secs(1),
        }
    }

    /// Set the delay after a failed receive or a redelivery.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Spawn the consumer as a background task.
    #[must_use]
    pub fn spawn(mut self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run until a shutdown signal is received.
    pub async fn run(&mut self) {
        info!(consumer = %self.name, topic = %self.processor.source_topic(), "Pick request consumer started");

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    info!(consumer = %self.name, "Pick request consumer received shutdown signal");
                    break;
                }
                received = self.source.recv() => {
                    match received {
                        Ok(delivery) => {
                            self.settle(&delivery).await;
                        }
                        Err(e) => {
                            error!(
                                consumer = %self.name,
                                error = %e,
                                "Error receiving pick request message, retrying in {:?}",
                                self.retry_delay
                            );
                            tokio::time::sleep(self.retry_delay).await;
                        }
                    }
                }
            }
        }

        info!(consumer = %self.name, "Pick request consumer stopped");
    }

    /// Process one delivery and commit or rewind it.
    pub async fn settle(&self, delivery: &Delivery) -> Settlement {
        match self.processor.process(&delivery.message).await {
            Ok(outcome) => {
                if let Err(e) = self.source.ack(delivery) {
                    warn!(
                        consumer = %self.name,
                        event_id = %delivery.message.event_id,
                        error = %e,
                        "Failed to commit offset (message may be redelivered)"
                    );
                }
                Settlement::Acknowledged(outcome)
            },
            Err(_) => {
                if let Err(e) = self.source.nack(delivery) {
                    error!(
                        consumer = %self.name,
                        event_id = %delivery.message.event_id,
                        error = %e,
                        "Failed to rewind for redelivery"
                    );
                }
                tokio::time::sleep(self.retry_delay).await;
                Settlement::Redelivered
            },
        }
    }
}

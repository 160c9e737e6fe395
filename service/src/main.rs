//! Pick Request Service
//!
//! This binary:
//! - Connects to `PostgreSQL` and applies migrations
//! - Starts the Prometheus metrics endpoint
//! - Subscribes to the pick request topic on Redpanda
//! - Reconciles each event and forwards results to the routing topic
//! - Shuts down gracefully on Ctrl+C or SIGTERM
//!
//! # Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/pick_requests \
//! REDPANDA_BROKERS=localhost:9092 \
//! cargo run --bin pick-request-service
//! ```

use anyhow::Context;
use pick_request_core::dead_letter::DeadLetterSink;
use pick_request_core::routing::KnownAutomationSystems;
use pick_request_postgres::{DeadLetterQueue, PostgresDeduplicator, PostgresPickRequestStore};
use pick_request_redpanda::{RedpandaRoutingPublisher, RedpandaSubscription};
use pick_request_runtime::metrics::MetricsServer;
use pick_request_runtime::{FlawedMessagePolicy, MessageProcessor, Reconciler};
use pick_request_service::{Config, PickRequestConsumer};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.service.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(service = %config.service.name, "Starting pick request service");
    tracing::info!(
        redpanda = %config.redpanda.brokers,
        pick_request_topic = %config.redpanda.pick_request_topic,
        routing_topic = %config.redpanda.routing_topic,
        known_automation_systems = %config.service.known_automation_systems,
        "Configuration loaded"
    );

    let mut metrics = MetricsServer::new(config.service.metrics_addr);
    metrics.start().context("Failed to start metrics server")?;

    let pool = pick_request_postgres::connect(
        &config.postgres.url,
        config.postgres.max_connections,
        config.postgres.connect_timeout(),
    )
    .await
    .context("Failed to connect to PostgreSQL")?;
    pick_request_postgres::migrate(&pool)
        .await
        .context("Failed to migrate database")?;

    let publisher = RedpandaRoutingPublisher::builder()
        .brokers(&config.redpanda.brokers)
        .timeout(config.redpanda.producer_timeout())
        .build()
        .context("Failed to create routing publisher")?;

    let reconciler = Reconciler::new(
        Arc::new(PostgresPickRequestStore::new(pool.clone())),
        Arc::new(publisher),
    )
    .with_routing_topic(&config.redpanda.routing_topic)
    .with_known_systems(KnownAutomationSystems::from_csv(
        &config.service.known_automation_systems,
    ));

    let deduplicator = Arc::new(PostgresDeduplicator::new(pool.clone()));
    let mut policy = FlawedMessagePolicy::new(deduplicator.clone());
    if config.service.dead_letter_enabled {
        let dead_letters: Arc<dyn DeadLetterSink> = Arc::new(DeadLetterQueue::new(pool.clone()));
        policy = policy.with_dead_letters(dead_letters);
    }

    let processor = Arc::new(MessageProcessor::new(
        &config.redpanda.pick_request_topic,
        deduplicator,
        reconciler,
        Arc::new(policy),
    ));

    let subscription = RedpandaSubscription::builder()
        .brokers(&config.redpanda.brokers)
        .topic(&config.redpanda.pick_request_topic)
        .consumer_group(&config.redpanda.consumer_group)
        .auto_offset_reset(&config.redpanda.auto_offset_reset)
        .build()
        .context("Failed to subscribe to pick request topic")?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let consumer = PickRequestConsumer::new(
        &config.service.name,
        Arc::new(subscription),
        processor,
        shutdown_rx,
    )
    .spawn();

    tracing::info!("Pick request service is running, press Ctrl+C to shutdown");

    shutdown_signal().await?;

    tracing::info!("Shutting down gracefully...");
    let _ = shutdown_tx.send(());
    consumer.await.context("Consumer task panicked")?;
    pool.close().await;

    tracing::info!("Pick request service stopped");
    Ok(())
}

/// Wait for Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .context("Failed to install SIGTERM handler")?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.context("Failed to listen for Ctrl+C")?,
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    Ok(())
}

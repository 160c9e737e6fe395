//! `PostgreSQL` persistence for the pick request reconciler.
//!
//! This crate provides the production implementations of the storage traits
//! from `pick-request-core`:
//!
//! - [`PostgresPickRequestStore`]: one JSONB document per pick request, merged
//!   on upsert
//! - [`PostgresDeduplicator`]: processed event ids, check-and-mark in one
//!   statement
//! - [`DeadLetterQueue`]: failed messages kept for investigation and replay
//!
//! # Example
//!
//! ```no_run
//! use pick_request_postgres::{PostgresPickRequestStore, connect, migrate};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = connect("postgres://localhost/pick_requests", 10, Duration::from_secs(5)).await?;
//! migrate(&pool).await?;
//! let store = PostgresPickRequestStore::new(pool);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dead_letter_queue;
pub mod dedup;
pub mod store;

pub use dead_letter_queue::{DLQStatus, DeadLetterEntry, DeadLetterQueue};
pub use dedup::PostgresDeduplicator;
pub use store::PostgresPickRequestStore;

use pick_request_core::store::StoreError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// Open a connection pool.
///
/// # Errors
///
/// Returns [`StoreError::Database`] if the database is unreachable within
/// `connect_timeout`.
pub async fn connect(
    database_url: &str,
    max_connections: u32,
    connect_timeout: Duration,
) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(connect_timeout)
        .connect(database_url)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to connect to database: {e}")))?;

    tracing::info!(max_connections, "Database connection pool established");
    Ok(pool)
}

/// Apply the embedded migrations in `./migrations`.
///
/// # Errors
///
/// Returns [`StoreError::Database`] if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to run migrations: {e}")))?;

    tracing::info!("Database migrations applied");
    Ok(())
}

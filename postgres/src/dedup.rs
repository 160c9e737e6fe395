//! Processed-event table backing the dedup gate.

use pick_request_core::dedup::{DedupError, Deduplicator};
use sqlx::PgPool;
use std::future::Future;
use std::pin::Pin;

/// `PostgreSQL`-backed [`Deduplicator`].
///
/// `is_duplicate` inserts the event id with `ON CONFLICT DO NOTHING`; the
/// insert affecting no row means another delivery got there first. The check
/// and the mark are one statement, so two concurrent deliveries of one event
/// cannot both pass.
#[derive(Clone)]
pub struct PostgresDeduplicator {
    pool: PgPool,
}

impl PostgresDeduplicator {
    /// Create a deduplicator using an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Forget event ids processed more than `days` days ago. Returns the
    /// number of ids removed.
    ///
    /// # Errors
    ///
    /// Returns [`DedupError`] if the delete fails.
    pub async fn prune_older_than(&self, days: i32) -> Result<u64, DedupError> {
        let result = sqlx::query(
            "DELETE FROM processed_events WHERE processed_at < now() - make_interval(days => $1)",
        )
        .bind(days)
        .execute(&self.pool)
        .await
        .map_err(|e| DedupError(format!("Failed to prune processed events: {e}")))?;

        Ok(result.rows_affected())
    }
}

impl Deduplicator for PostgresDeduplicator {
    fn is_duplicate(
        &self,
        event_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, DedupError>> + Send + '_>> {
        let event_id = event_id.to_string();
        Box::pin(async move {
            let result = sqlx::query(
                "INSERT INTO processed_events (event_id) VALUES ($1) ON CONFLICT (event_id) DO NOTHING",
            )
            .bind(&event_id)
            .execute(&self.pool)
            .await
            .map_err(|e| DedupError(format!("Failed to record event id: {e}")))?;

            Ok(result.rows_affected() == 0)
        })
    }

    fn release(
        &self,
        event_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), DedupError>> + Send + '_>> {
        let event_id = event_id.to_string();
        Box::pin(async move {
            sqlx::query("DELETE FROM processed_events WHERE event_id = $1")
                .bind(&event_id)
                .execute(&self.pool)
                .await
                .map_err(|e| DedupError(format!("Failed to release event id: {e}")))?;

            tracing::debug!(event_id = %event_id, "Released event id for redelivery");
            Ok(())
        })
    }
}

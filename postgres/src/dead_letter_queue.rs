//! Dead Letter Queue (DLQ) for failed messages.
//!
//! Provides persistent storage and management of pick request messages that
//! failed with an error redelivery cannot fix. Enables observability, incident
//! response, and manual replay workflows.

use chrono::{DateTime, Utc};
use pick_request_core::dead_letter::{DeadLetterError, DeadLetterSink, FailedMessage};
use pick_request_core::message::MessageAttributes;
use serde_json::{Map, Value};
use sqlx::{PgPool, Row};
use std::future::Future;
use std::pin::Pin;

/// Status of a failed message in the Dead Letter Queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DLQStatus {
    /// Message is pending investigation/replay
    Pending,
    /// Message is currently being replayed
    Processing,
    /// Message was successfully replayed or fixed by hand
    Resolved,
    /// Message was permanently discarded (cannot be fixed)
    Discarded,
}

impl DLQStatus {
    /// Convert status to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Resolved => "resolved",
            Self::Discarded => "discarded",
        }
    }

    /// Parse status from database string.
    ///
    /// # Errors
    ///
    /// Returns error if the string doesn't match a known status.
    pub fn parse(s: &str) -> Result<Self, DeadLetterError> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "resolved" => Ok(Self::Resolved),
            "discarded" => Ok(Self::Discarded),
            _ => Err(DeadLetterError(format!("Invalid DLQ status: {s}"))),
        }
    }
}

/// An entry in the Dead Letter Queue.
///
/// Contains the failed message plus management metadata.
#[derive(Debug, Clone)]
pub struct DeadLetterEntry {
    /// Unique identifier for this DLQ entry
    pub id: i64,

    /// The message and its failure
    pub message: FailedMessage,

    /// Current processing status
    pub status: DLQStatus,

    /// When the failure was resolved (if applicable)
    pub resolved_at: Option<DateTime<Utc>>,

    /// Who/what resolved the failure
    pub resolved_by: Option<String>,

    /// Notes about the resolution
    pub resolution_notes: Option<String>,
}

/// `PostgreSQL`-based Dead Letter Queue for failed messages.
///
/// Provides persistent storage for messages that could not be processed,
/// enabling:
/// - Incident investigation and debugging
/// - Manual replay workflows
/// - Failure trend analysis
///
/// # Example
///
/// ```no_run
/// use pick_request_postgres::{DLQStatus, DeadLetterQueue};
///
/// # async fn example(pool: sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let dlq = DeadLetterQueue::new(pool);
///
/// // List pending failures
/// let pending = dlq.list_pending(100).await?;
/// println!("Pending failures: {}", pending.len());
///
/// // Mark one as processing
/// dlq.update_status(pending[0].id, DLQStatus::Processing).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DeadLetterQueue {
    pool: PgPool,
}

impl DeadLetterQueue {
    /// Create a new Dead Letter Queue with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Add a failed message to the DLQ.
    ///
    /// # Returns
    ///
    /// The unique ID of the created DLQ entry.
    ///
    /// # Errors
    ///
    /// Returns [`DeadLetterError`] if the insert fails.
    pub async fn add_entry(&self, message: &FailedMessage) -> Result<i64, DeadLetterError> {
        let id: (i64,) = sqlx::query_as(
            r"
            INSERT INTO failed_messages (
                event_id, source_topic, message_data, attributes,
                error_kind, error_message, failed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            ",
        )
        .bind(&message.event_id)
        .bind(&message.source_topic)
        .bind(&message.data)
        .bind(attributes_to_json(&message.attributes))
        .bind(&message.error_kind)
        .bind(&message.error_message)
        .bind(message.failed_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DeadLetterError(e.to_string()))?;

        tracing::warn!(
            dlq_id = id.0,
            event_id = %message.event_id,
            source_topic = %message.source_topic,
            error_kind = %message.error_kind,
            error = %message.error_message,
            "Message added to Dead Letter Queue"
        );

        metrics::counter!("pick_request_dlq_added_total", "kind" => message.error_kind.clone())
            .increment(1);

        Ok(id.0)
    }

    /// List pending failed messages.
    ///
    /// Returns messages in order of oldest first (FIFO processing).
    ///
    /// # Errors
    ///
    /// Returns [`DeadLetterError`] if the query fails.
    pub async fn list_pending(&self, limit: usize) -> Result<Vec<DeadLetterEntry>, DeadLetterError> {
        self.list_by_status(DLQStatus::Pending, limit).await
    }

    /// List failed messages by status.
    ///
    /// # Errors
    ///
    /// Returns [`DeadLetterError`] if the query fails.
    pub async fn list_by_status(
        &self,
        status: DLQStatus,
        limit: usize,
    ) -> Result<Vec<DeadLetterEntry>, DeadLetterError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r"
            SELECT
                id, event_id, source_topic, message_data, attributes,
                error_kind, error_message, failed_at, status,
                resolved_at, resolved_by, resolution_notes
            FROM failed_messages
            WHERE status = $1
            ORDER BY failed_at ASC
            LIMIT $2
            ",
        )
        .bind(status.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DeadLetterError(e.to_string()))?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    /// Get a specific entry by ID.
    ///
    /// # Errors
    ///
    /// Returns [`DeadLetterError`] if the query fails or entry not found.
    pub async fn get_by_id(&self, id: i64) -> Result<DeadLetterEntry, DeadLetterError> {
        let row = sqlx::query(
            r"
            SELECT
                id, event_id, source_topic, message_data, attributes,
                error_kind, error_message, failed_at, status,
                resolved_at, resolved_by, resolution_notes
            FROM failed_messages
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DeadLetterError(e.to_string()))?;

        Self::row_to_entry(&row)
    }

    /// Update the status of an entry.
    ///
    /// # Errors
    ///
    /// Returns [`DeadLetterError`] if the update fails.
    pub async fn update_status(&self, id: i64, status: DLQStatus) -> Result<(), DeadLetterError> {
        sqlx::query("UPDATE failed_messages SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| DeadLetterError(e.to_string()))?;

        tracing::info!(dlq_id = id, status = status.as_str(), "DLQ entry status updated");

        Ok(())
    }

    /// Mark an entry as resolved.
    ///
    /// # Arguments
    ///
    /// * `id` - The DLQ entry ID
    /// * `resolved_by` - Who/what resolved it (e.g., username, service name)
    /// * `notes` - Resolution notes
    ///
    /// # Errors
    ///
    /// Returns [`DeadLetterError`] if the update fails.
    pub async fn mark_resolved(
        &self,
        id: i64,
        resolved_by: &str,
        notes: Option<&str>,
    ) -> Result<(), DeadLetterError> {
        sqlx::query(
            r"
            UPDATE failed_messages
            SET status = 'resolved',
                resolved_at = NOW(),
                resolved_by = $1,
                resolution_notes = $2
            WHERE id = $3
            ",
        )
        .bind(resolved_by)
        .bind(notes)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| DeadLetterError(e.to_string()))?;

        tracing::info!(dlq_id = id, resolved_by = resolved_by, "DLQ entry marked as resolved");

        metrics::counter!("pick_request_dlq_resolved_total").increment(1);

        Ok(())
    }

    /// Mark an entry as discarded (permanently failed).
    ///
    /// # Errors
    ///
    /// Returns [`DeadLetterError`] if the update fails.
    pub async fn mark_discarded(&self, id: i64, reason: &str) -> Result<(), DeadLetterError> {
        sqlx::query(
            r"
            UPDATE failed_messages
            SET status = 'discarded',
                resolved_at = NOW(),
                resolution_notes = $1
            WHERE id = $2
            ",
        )
        .bind(reason)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| DeadLetterError(e.to_string()))?;

        tracing::warn!(dlq_id = id, reason = reason, "DLQ entry marked as discarded");

        metrics::counter!("pick_request_dlq_discarded_total").increment(1);

        Ok(())
    }

    /// Get count of pending failures.
    ///
    /// Useful for monitoring and health checks.
    ///
    /// # Errors
    ///
    /// Returns [`DeadLetterError`] if the query fails.
    pub async fn count_pending(&self) -> Result<i64, DeadLetterError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM failed_messages WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DeadLetterError(e.to_string()))?;

        Ok(count)
    }

    /// Convert a database row to a `DeadLetterEntry`.
    fn row_to_entry(row: &sqlx::postgres::PgRow) -> Result<DeadLetterEntry, DeadLetterError> {
        let status_str: String = row.get("status");
        let status = DLQStatus::parse(&status_str)?;
        let attributes: Value = row.get("attributes");

        Ok(DeadLetterEntry {
            id: row.get("id"),
            message: FailedMessage {
                event_id: row.get("event_id"),
                source_topic: row.get("source_topic"),
                data: row.get("message_data"),
                attributes: attributes_from_json(&attributes),
                error_kind: row.get("error_kind"),
                error_message: row.get("error_message"),
                failed_at: row.get("failed_at"),
            },
            status,
            resolved_at: row.get("resolved_at"),
            resolved_by: row.get("resolved_by"),
            resolution_notes: row.get("resolution_notes"),
        })
    }
}

impl DeadLetterSink for DeadLetterQueue {
    fn record(
        &self,
        message: &FailedMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), DeadLetterError>> + Send + '_>> {
        let message = message.clone();
        Box::pin(async move { self.add_entry(&message).await.map(|_| ()) })
    }
}

fn attributes_to_json(attributes: &MessageAttributes) -> Value {
    Value::Object(
        attributes
            .iter()
            .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
            .collect::<Map<String, Value>>(),
    )
}

fn attributes_from_json(value: &Value) -> MessageAttributes {
    value
        .as_object()
        .map(|object| {
            object
                .iter()
                .filter_map(|(key, value)| value.as_str().map(|text| (key.clone(), text.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[test]
    fn dlq_status_roundtrip() {
        for status in &[
            DLQStatus::Pending,
            DLQStatus::Processing,
            DLQStatus::Resolved,
            DLQStatus::Discarded,
        ] {
            let s = status.as_str();
            let parsed = DLQStatus::parse(s).expect("valid status should parse");
            assert_eq!(*status, parsed);
        }
    }

    #[test]
    fn dlq_status_invalid() {
        assert!(DLQStatus::parse("invalid").is_err());
    }

    #[test]
    fn attributes_survive_the_jsonb_column() {
        let attributes = MessageAttributes::new()
            .with("operation", "update")
            .with("wmsIdentifier", "TEST-WMS-1");

        let json = attributes_to_json(&attributes);
        assert_eq!(json["operation"], "update");
        assert_eq!(attributes_from_json(&json), attributes);
    }

    #[test]
    fn non_string_attribute_values_are_dropped() {
        let json = serde_json::json!({ "operation": "create", "retries": 3 });
        let attributes = attributes_from_json(&json);
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes.get("operation"), Some("create"));
    }
}

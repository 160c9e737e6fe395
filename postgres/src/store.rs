//! JSONB document store for pick requests.

use pick_request_core::pick_request::{PickRequest, PickRequestKey};
use pick_request_core::store::{Document, PickRequestStore, StoreError, from_document};
use serde_json::Value;
use sqlx::PgPool;
use std::future::Future;
use std::pin::Pin;

/// `PostgreSQL`-backed pick request store.
///
/// Each pick request is one row in `pick_requests`:
///
/// ```sql
/// CREATE TABLE pick_requests (
///     document_key TEXT PRIMARY KEY,
///     document JSONB NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL,
///     updated_at TIMESTAMPTZ NOT NULL
/// );
/// ```
///
/// Upserts merge with the JSONB `||` operator, so top-level fields of the write
/// replace stored ones and other stored fields are kept. The merge happens in
/// a single statement; concurrent writes to one key are last-write-wins.
///
/// # Example
///
/// ```no_run
/// use pick_request_core::store::PickRequestStore;
/// use pick_request_postgres::PostgresPickRequestStore;
///
/// # async fn example(pool: sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let store = PostgresPickRequestStore::new(pool);
/// let found = store.get_pick_request("2", "TEST-WMS-1").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PostgresPickRequestStore {
    pool: PgPool,
}

impl PostgresPickRequestStore {
    /// Create a store using an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Raw stored document under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn document(&self, key: &PickRequestKey) -> Result<Option<Document>, StoreError> {
        let row: Option<(Value,)> =
            sqlx::query_as("SELECT document FROM pick_requests WHERE document_key = $1")
                .bind(key.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Database(format!("Failed to load document: {e}")))?;

        row.map(|(document,)| into_document(document)).transpose()
    }

    async fn find(
        &self,
        identifier: &str,
        wms_identifier: &str,
    ) -> Result<Option<PickRequest>, StoreError> {
        let row: Option<(Value,)> = sqlx::query_as(
            r"
            SELECT document
            FROM pick_requests
            WHERE document->>'wmsPickRequestIdentifier' = $1
              AND document->>'wmsIdentifier' = $2
            ORDER BY document_key
            LIMIT 1
            ",
        )
        .bind(identifier)
        .bind(wms_identifier)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to look up pick request: {e}")))?;

        row.map(|(document,)| into_document(document).and_then(from_document))
            .transpose()
    }

    async fn merge(&self, key: &PickRequestKey, document: Document) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO pick_requests (document_key, document, created_at, updated_at)
            VALUES ($1, $2, now(), now())
            ON CONFLICT (document_key) DO UPDATE
            SET document = pick_requests.document || EXCLUDED.document,
                updated_at = now()
            ",
        )
        .bind(key.as_str())
        .bind(Value::Object(document))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to upsert pick request: {e}")))?;

        tracing::debug!(document_key = %key, "Pick request upserted");
        Ok(())
    }
}

fn into_document(value: Value) -> Result<Document, StoreError> {
    match value {
        Value::Object(document) => Ok(document),
        other => Err(StoreError::Serialization(format!(
            "stored pick request is not a JSON object: {other}"
        ))),
    }
}

impl PickRequestStore for PostgresPickRequestStore {
    fn get_pick_request(
        &self,
        identifier: &str,
        wms_identifier: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<PickRequest>, StoreError>> + Send + '_>> {
        let identifier = identifier.to_string();
        let wms_identifier = wms_identifier.to_string();
        Box::pin(async move { self.find(&identifier, &wms_identifier).await })
    }

    fn upsert(
        &self,
        key: &PickRequestKey,
        document: Document,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        let key = key.clone();
        Box::pin(async move { self.merge(&key, document).await })
    }
}

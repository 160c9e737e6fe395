//! Pick request document store abstraction.
//!
//! The store holds one JSON document per pick request. Reads look a pick
//! request up by its identifier within a WMS; writes upsert by composite key
//! and merge the given fields into any existing document (top-level fields in
//! the write replace stored ones, fields not in the write are left alone).
//! Concurrent upserts to the same key are last-write-wins.
//!
//! # Implementations
//!
//! - `PostgresPickRequestStore` (in `pick-request-postgres`): JSONB documents
//! - `InMemoryPickRequestStore` (in `pick-request-testing`): `HashMap` for tests
//!
//! # Dyn Compatibility
//!
//! Methods return `Pin<Box<dyn Future>>` so the store can be shared as
//! `Arc<dyn PickRequestStore>`.

use crate::pick_request::{PickRequest, PickRequestKey};
use serde::Serialize;
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// A JSON document (top-level object).
pub type Document = Map<String, Value>;

/// Errors from store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connection or query failure.
    #[error("Database error: {0}")]
    Database(String),

    /// A document could not be converted to or from a pick request.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Convert a serializable value into a store document.
///
/// # Errors
///
/// Returns [`StoreError::Serialization`] if `value` does not serialize to a
/// JSON object.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(other) => Err(StoreError::Serialization(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(e) => Err(StoreError::Serialization(e.to_string())),
    }
}

/// Read a pick request out of a store document.
///
/// # Errors
///
/// Returns [`StoreError::Serialization`] if the document lacks required fields.
pub fn from_document(document: Document) -> Result<PickRequest, StoreError> {
    serde_json::from_value(Value::Object(document))
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Durable storage of pick requests.
pub trait PickRequestStore: Send + Sync {
    /// Find the pick request with `wmsPickRequestIdentifier == identifier`
    /// owned by `wms_identifier`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the lookup fails or the stored document is
    /// not a valid pick request.
    fn get_pick_request(
        &self,
        identifier: &str,
        wms_identifier: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<PickRequest>, StoreError>> + Send + '_>>;

    /// Insert `document` under `key`, or merge it into the existing document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the write fails.
    fn upsert(
        &self,
        key: &PickRequestKey,
        document: Document,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>>;
}

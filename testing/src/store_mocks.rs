//! In-memory pick request store
//!
//! [`InMemoryPickRequestStore`] keeps documents in a `HashMap` keyed by document
//! id. Lookups scan documents by content, so records seeded under ids that do
//! not follow the `<wms>-<id>` key schema are still found.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only happens after a test panicked

use pick_request_core::pick_request::{PickRequest, PickRequestKey};
use pick_request_core::store::{
    Document, PickRequestStore, StoreError, from_document, to_document,
};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// In-memory pick request store for fast, deterministic testing.
///
/// Clones share the same documents, so a test can keep a handle for
/// assertions after handing the store to the reconciler.
///
/// # Example
///
/// ```
/// use pick_request_core::pick_request::PickRequestKey;
/// use pick_request_core::store::PickRequestStore;
/// use pick_request_testing::InMemoryPickRequestStore;
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryPickRequestStore::new();
/// let key = PickRequestKey::new("TEST-WMS-1", "7");
///
/// let document = json!({ "wmsPickRequestIdentifier": "7" });
/// store.upsert(&key, document.as_object().cloned().unwrap_or_default()).await?;
///
/// assert_eq!(store.write_count(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryPickRequestStore {
    documents: Arc<RwLock<HashMap<String, Document>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryPickRequestStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `pick_request` under an arbitrary document id.
    pub fn seed(&self, document_id: &str, pick_request: &PickRequest) {
        let document = to_document(pick_request).unwrap();
        self.seed_document(document_id, document);
    }

    /// Store a raw document under an arbitrary document id.
    pub fn seed_document(&self, document_id: &str, document: Document) {
        self.documents
            .write()
            .unwrap()
            .insert(document_id.to_string(), document);
    }

    /// Make every subsequent lookup fail (or succeed again).
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent upsert fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Stored document under `document_id`.
    #[must_use]
    pub fn document(&self, document_id: &str) -> Option<Document> {
        self.documents.read().unwrap().get(document_id).cloned()
    }

    /// Stored field of the document under `document_id`.
    #[must_use]
    pub fn field(&self, document_id: &str, field: &str) -> Option<Value> {
        self.document(document_id)
            .and_then(|document| document.get(field).cloned())
    }

    /// Number of lookups attempted.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of upserts attempted.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().unwrap().len()
    }

    /// Whether the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.read().unwrap().is_empty()
    }

    /// Sorted ids of all stored documents.
    #[must_use]
    pub fn document_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.documents.read().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn find(&self, identifier: &str, wms_identifier: &str) -> Option<Document> {
        let documents = self.documents.read().unwrap();
        let mut ids: Vec<&String> = documents.keys().collect();
        ids.sort();
        ids.into_iter()
            .filter_map(|id| documents.get(id))
            .find(|document| {
                text_field(document, "wmsPickRequestIdentifier") == Some(identifier)
                    && text_field(document, "wmsIdentifier") == Some(wms_identifier)
            })
            .cloned()
    }
}

fn text_field<'a>(document: &'a Document, field: &str) -> Option<&'a str> {
    document.get(field).and_then(Value::as_str)
}

impl PickRequestStore for InMemoryPickRequestStore {
    fn get_pick_request(
        &self,
        identifier: &str,
        wms_identifier: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<PickRequest>, StoreError>> + Send + '_>> {
        let identifier = identifier.to_string();
        let wms_identifier = wms_identifier.to_string();
        Box::pin(async move {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StoreError::Database("injected read failure".to_string()));
            }
            self.find(&identifier, &wms_identifier)
                .map(from_document)
                .transpose()
        })
    }

    fn upsert(
        &self,
        key: &PickRequestKey,
        document: Document,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Database("injected write failure".to_string()));
            }
            let mut documents = self.documents.write().unwrap();
            let stored = documents.entry(key).or_default();
            for (field, value) in document {
                stored.insert(field, value);
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn upsert_merges_top_level_fields() {
        let store = InMemoryPickRequestStore::new();
        let key = PickRequestKey::new("TEST-WMS-1", "2");

        store
            .upsert(&key, document(json!({ "status": "allocated", "cutOffTime": "a" })))
            .await
            .unwrap();
        store
            .upsert(&key, document(json!({ "cutOffTime": "b" })))
            .await
            .unwrap();

        assert_eq!(store.field("TEST-WMS-1-2", "status"), Some(json!("allocated")));
        assert_eq!(store.field("TEST-WMS-1-2", "cutOffTime"), Some(json!("b")));
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn lookup_matches_identifier_and_wms() {
        let store = InMemoryPickRequestStore::new();
        store.seed_document(
            "any-id",
            document(json!({
                "wmsIdentifier": "TEST-WMS-1",
                "wmsPickRequestIdentifier": "9",
                "automationSystemIdentifier": "iws-1",
                "status": "allocated",
            })),
        );

        assert!(store.get_pick_request("9", "TEST-WMS-1").await.unwrap().is_some());
        assert!(store.get_pick_request("9", "TEST-WMS-2").await.unwrap().is_none());
        assert!(store.get_pick_request("10", "TEST-WMS-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn injected_failures_surface_as_database_errors() {
        let store = InMemoryPickRequestStore::new();
        store.fail_reads(true);
        store.fail_writes(true);

        assert!(matches!(
            store.get_pick_request("1", "W").await,
            Err(StoreError::Database(_))
        ));
        assert!(matches!(
            store.upsert(&PickRequestKey::new("W", "1"), Document::new()).await,
            Err(StoreError::Database(_))
        ));
        assert!(store.is_empty());
    }
}

//! Storage collaborator contract and an in-memory implementation.
//!
//! Collections hold JSON documents. Only the three operations the pipeline
//! needs are exposed: `find_one`, `insert_one`, `count_documents`.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::types::DbId;

/// A stored document. Inserted documents carry their identifier under `id`.
pub type Document = Map<String, Value>;

/// Field predicate for lookups.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Exact JSON equality on `field`.
    Eq { field: String, value: Value },
    /// Case-insensitive exact match on a string `field`.
    EqIgnoreCase { field: String, value: String },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Case-insensitive match on `name`, the identity of configuration entities.
    pub fn name_ignore_case(name: impl Into<String>) -> Self {
        Self::EqIgnoreCase {
            field: "name".to_string(),
            value: name.into(),
        }
    }

    /// Evaluate the filter against an in-memory document.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::Eq { field, value } => doc.get(field) == Some(value),
            Self::EqIgnoreCase { field, value } => doc
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| s.to_lowercase() == value.to_lowercase()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Named-collection document storage used by the import pipeline.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_one(&self, collection: &str, filter: &Filter)
        -> Result<Option<Document>, StoreError>;

    async fn insert_one(&self, collection: &str, doc: Document) -> Result<DbId, StoreError>;

    async fn count_documents(&self, collection: &str, filter: &Filter)
        -> Result<u64, StoreError>;

    /// Confirm the backend is reachable. In-process stores always are.
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Mutex-guarded in-memory store. Used by tests and local tooling.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    next_id: DbId,
    collections: HashMap<String, Vec<Document>>,
    failing: HashSet<String>,
    insert_calls: HashMap<String, usize>,
    unhealthy: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent insert into `collection` fail.
    pub fn fail_inserts_into(&self, collection: &str) {
        self.lock().failing.insert(collection.to_string());
    }

    /// Make `health_check` report the store as unreachable.
    pub fn mark_unhealthy(&self) {
        self.lock().unhealthy = true;
    }

    /// All documents of a collection, in insertion order.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.lock()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of insert attempts against a collection, failed ones included.
    pub fn insert_attempts(&self, collection: &str) -> usize {
        self.lock()
            .insert_calls
            .get(collection)
            .copied()
            .unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        // A poisoned lock only means a test panicked mid-insert; the data is
        // still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .lock()
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)).cloned()))
    }

    async fn insert_one(&self, collection: &str, mut doc: Document) -> Result<DbId, StoreError> {
        let mut inner = self.lock();
        *inner.insert_calls.entry(collection.to_string()).or_default() += 1;
        if inner.failing.contains(collection) {
            return Err(StoreError::Backend(format!(
                "write to '{collection}' rejected"
            )));
        }
        inner.next_id += 1;
        let id = inner.next_id;
        doc.insert("id".to_string(), Value::from(id));
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(doc);
        Ok(id)
    }

    async fn count_documents(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        Ok(self
            .lock()
            .collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).count() as u64)
            .unwrap_or(0))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        if self.lock().unhealthy {
            return Err(StoreError::Backend("store marked unhealthy".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let store = MemoryStore::new();
        let a = store.insert_one("states", doc(json!({"name": "Goa"}))).await.unwrap();
        let b = store.insert_one("states", doc(json!({"name": "Kerala"}))).await.unwrap();
        assert!(b > a);
        assert_eq!(store.documents("states")[1]["id"], json!(b));
    }

    #[tokio::test]
    async fn find_by_name_ignores_case() {
        let store = MemoryStore::new();
        store
            .insert_one("categories", doc(json!({"name": "Residential"})))
            .await
            .unwrap();
        let found = store
            .find_one("categories", &Filter::name_ignore_case("RESIDENTIAL"))
            .await
            .unwrap();
        assert!(found.is_some());
        let missing = store
            .find_one("categories", &Filter::name_ignore_case("Commercial"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn count_with_exact_filter() {
        let store = MemoryStore::new();
        for slug in ["a", "b", "a"] {
            store
                .insert_one("properties", doc(json!({"slug": slug})))
                .await
                .unwrap();
        }
        let n = store
            .count_documents("properties", &Filter::eq("slug", "a"))
            .await
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(
            store
                .count_documents("missing", &Filter::eq("slug", "a"))
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn injected_failure_is_counted() {
        let store = MemoryStore::new();
        store.fail_inserts_into("leads");
        let err = store.insert_one("leads", Document::new()).await;
        assert!(matches!(err, Err(StoreError::Backend(_))));
        assert_eq!(store.insert_attempts("leads"), 1);
        assert!(store.documents("leads").is_empty());
    }
}

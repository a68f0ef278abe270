//! PostgreSQL-backed [`DocumentStore`].

use async_trait::async_trait;
use propline_core::import::store::{Document, DocumentStore, Filter, StoreError};
use propline_core::types::DbId;
use serde_json::Value;

use crate::models::document::DocumentMatch;
use crate::repositories::DocumentRepo;
use crate::DbPool;

#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: DbPool,
}

impl PgDocumentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    tracing::error!(error = %err, "Document store query failed");
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        let matcher = DocumentMatch::from_filter(filter)?;
        let row = DocumentRepo::find_one(&self.pool, collection, &matcher)
            .await
            .map_err(backend)?;
        Ok(row.map(|r| r.into_document()))
    }

    async fn insert_one(&self, collection: &str, mut doc: Document) -> Result<DbId, StoreError> {
        // The identifier is the row key; never persist a stale copy in the body.
        doc.remove("id");
        DocumentRepo::insert(&self.pool, collection, Value::Object(doc))
            .await
            .map_err(backend)
    }

    async fn count_documents(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let matcher = DocumentMatch::from_filter(filter)?;
        let count = DocumentRepo::count(&self.pool, collection, &matcher)
            .await
            .map_err(backend)?;
        Ok(count.max(0) as u64)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await.map_err(backend)
    }
}

//! Repository for the `documents` table.

use propline_core::types::DbId;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::document::{DocumentMatch, DocumentRow};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, collection, body, created_at, updated_at";

/// Provides lookup, insert and count operations on collection documents.
pub struct DocumentRepo;

impl DocumentRepo {
    /// First document in `collection` matching the predicate, oldest first.
    pub async fn find_one(
        pool: &PgPool,
        collection: &str,
        matcher: &DocumentMatch,
    ) -> Result<Option<DocumentRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM documents
             WHERE {}
             ORDER BY id
             LIMIT 1",
            matcher.predicate
        );
        sqlx::query_as::<_, DocumentRow>(&query)
            .bind(collection)
            .bind(&matcher.field)
            .bind(&matcher.param)
            .fetch_optional(pool)
            .await
    }

    /// Insert a document body, returning the new identifier.
    pub async fn insert(pool: &PgPool, collection: &str, body: Value) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO documents (collection, body)
             VALUES ($1, $2)
             RETURNING id",
        )
        .bind(collection)
        .bind(Json(body))
        .fetch_one(pool)
        .await
    }

    /// Number of documents in `collection` matching the predicate.
    pub async fn count(
        pool: &PgPool,
        collection: &str,
        matcher: &DocumentMatch,
    ) -> Result<i64, sqlx::Error> {
        let query = format!(
            "SELECT COUNT(*) FROM documents WHERE {}",
            matcher.predicate
        );
        sqlx::query_scalar::<_, i64>(&query)
            .bind(collection)
            .bind(&matcher.field)
            .bind(&matcher.param)
            .fetch_one(pool)
            .await
    }
}

//! Document row model and filter translation.
//!
//! Maps to the `documents` table created in migration 20260101000001.

use propline_core::import::store::{Document, Filter};
use propline_core::types::{DbId, Timestamp};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `documents` table.
#[derive(Debug, Clone, FromRow)]
pub struct DocumentRow {
    pub id: DbId,
    pub collection: String,
    pub body: Json<Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DocumentRow {
    /// The stored body with the row identifier set under `id`.
    pub fn into_document(self) -> Document {
        let mut doc = match self.body.0 {
            Value::Object(map) => map,
            other => {
                let mut map = Document::new();
                map.insert("value".into(), other);
                map
            }
        };
        doc.insert("id".into(), Value::from(self.id));
        doc
    }
}

// ---------------------------------------------------------------------------
// Filter translation
// ---------------------------------------------------------------------------

/// A [`Filter`] lowered to a SQL predicate over `body`.
///
/// Every predicate binds `$1` = collection, `$2` = field name, `$3` = text
/// parameter, so the repository binds the same three values regardless of
/// the filter variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMatch {
    pub predicate: &'static str,
    pub field: String,
    pub param: String,
}

impl DocumentMatch {
    pub fn from_filter(filter: &Filter) -> Result<Self, serde_json::Error> {
        Ok(match filter {
            Filter::Eq { field, value } => Self {
                predicate: "collection = $1 AND body -> $2 = $3::jsonb",
                field: field.clone(),
                param: serde_json::to_string(value)?,
            },
            Filter::EqIgnoreCase { field, value } => Self {
                predicate: "collection = $1 AND lower(body ->> $2) = lower($3)",
                field: field.clone(),
                param: value.clone(),
            },
        })
    }
}

//! Find-or-create resolution of configuration entities referenced by name
//! from property rows.
//!
//! Lookups are case-insensitive exact matches on `name`. Nothing here is
//! transactional: two concurrent imports introducing the same new name can
//! both miss the lookup and both insert.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;

use super::row::{CellValue, RowRecord};
use super::schema::EntityKind;
use super::slug::allocate_slug;
use super::store::{Document, DocumentStore, Filter, StoreError};
use crate::types::DbId;

/// A free-text column on a property row that names configuration entities.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceField {
    pub column: &'static str,
    pub kind: EntityKind,
    /// Document field that receives the resolved identifier(s).
    pub target: &'static str,
    /// Set-valued columns hold comma-separated names.
    pub multi: bool,
}

pub const PROPERTY_REFERENCES: [ReferenceField; 5] = [
    ReferenceField {
        column: "category",
        kind: EntityKind::Category,
        target: "category_id",
        multi: false,
    },
    ReferenceField {
        column: "state",
        kind: EntityKind::State,
        target: "state_id",
        multi: false,
    },
    ReferenceField {
        column: "developer_name",
        kind: EntityKind::Developer,
        target: "developer_id",
        multi: false,
    },
    ReferenceField {
        column: "amenities",
        kind: EntityKind::Amenity,
        target: "amenity_ids",
        multi: true,
    },
    ReferenceField {
        column: "facilities",
        kind: EntityKind::Facility,
        target: "facility_ids",
        multi: true,
    },
];

/// An entity the import created as a side effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigCreation {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub name: String,
    #[serde(rename = "isNew")]
    pub is_new: bool,
}

/// Audit summary of everything the import added to the taxonomy.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigCreationSummary {
    pub summary: BTreeMap<EntityKind, Vec<String>>,
    pub total_new_entries: usize,
    pub details: Vec<ConfigCreation>,
}

/// Deduplicate creations by `(type, name)` and group names by type.
/// Returns `None` when nothing was created.
pub fn summarize_creations(creations: &[ConfigCreation]) -> Option<ConfigCreationSummary> {
    let mut seen = HashSet::new();
    let details: Vec<ConfigCreation> = creations
        .iter()
        .filter(|c| seen.insert((c.kind, c.name.clone())))
        .cloned()
        .collect();

    if details.is_empty() {
        return None;
    }

    let mut summary: BTreeMap<EntityKind, Vec<String>> = BTreeMap::new();
    for creation in &details {
        summary
            .entry(creation.kind)
            .or_default()
            .push(creation.name.clone());
    }

    Some(ConfigCreationSummary {
        summary,
        total_new_entries: details.len(),
        details,
    })
}

/// Split a reference cell into trimmed, non-empty names, dropping repeats
/// that differ only by case.
pub fn split_names(value: &CellValue) -> Vec<String> {
    let mut seen = HashSet::new();
    value
        .as_text()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Fields a freshly created configuration entity of `kind` starts with.
pub fn kind_defaults(kind: EntityKind) -> Vec<(&'static str, Value)> {
    let mut defaults = match kind {
        EntityKind::Category => vec![("icon_class", Value::from("fa-building"))],
        EntityKind::Amenity => vec![("icon_class", Value::from("fa-check"))],
        EntityKind::Facility => vec![("icon_class", Value::from("fa-star"))],
        EntityKind::Developer => vec![("logo_url", Value::Null)],
        EntityKind::State => vec![("country", Value::from("India"))],
        EntityKind::Property | EntityKind::Lead => return Vec::new(),
    };
    defaults.push(("is_active", Value::Bool(true)));
    defaults
}

/// Current time as stored in documents.
pub(crate) fn now_value() -> Value {
    Value::String(chrono::Utc::now().to_rfc3339())
}

/// A configuration entity document: `name`, `slug`, kind defaults, and
/// timestamps.
pub fn config_document(kind: EntityKind, name: &str, slug: String) -> Document {
    let mut doc = Document::new();
    doc.insert("name".into(), Value::from(name.trim()));
    doc.insert("slug".into(), Value::from(slug));
    for (field, value) in kind_defaults(kind) {
        doc.insert(field.into(), value);
    }
    let now = now_value();
    doc.insert("created_at".into(), now.clone());
    doc.insert("updated_at".into(), now);
    doc
}

/// [`config_document`] with a slug allocated within the kind's collection.
pub async fn new_config_document(
    store: &dyn DocumentStore,
    kind: EntityKind,
    name: &str,
) -> Result<Document, StoreError> {
    let slug = allocate_slug(store, kind.collection(), name.trim()).await?;
    Ok(config_document(kind, name, slug))
}

fn document_id(doc: &Document) -> Result<DbId, StoreError> {
    doc.get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| StoreError::Backend("stored document has no numeric id".into()))
}

/// Resolved identifiers for one property row, ready to merge into its document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedReferences {
    pub fields: Vec<(&'static str, Value)>,
}

/// Find-or-create resolver with a per-import cache keyed on lower-cased name.
#[derive(Debug, Default)]
pub struct EntityResolver {
    cache: HashMap<(EntityKind, String), DbId>,
    creations: Vec<ConfigCreation>,
}

impl EntityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier of the `kind` entity called `name`, creating it if absent.
    pub async fn resolve(
        &mut self,
        store: &dyn DocumentStore,
        kind: EntityKind,
        name: &str,
    ) -> Result<DbId, StoreError> {
        let name = name.trim();
        let key = (kind, name.to_lowercase());
        if let Some(id) = self.cache.get(&key) {
            return Ok(*id);
        }

        let collection = kind.collection();
        let id = match store
            .find_one(collection, &Filter::name_ignore_case(name))
            .await?
        {
            Some(existing) => document_id(&existing)?,
            None => {
                let doc = new_config_document(store, kind, name).await?;
                let id = store.insert_one(collection, doc).await?;
                tracing::debug!(kind = %kind, name, id, "Auto-created configuration entity");
                self.creations.push(ConfigCreation {
                    kind,
                    name: name.to_string(),
                    is_new: true,
                });
                id
            }
        };

        self.cache.insert(key, id);
        Ok(id)
    }

    /// Resolve every reference column present on a property row.
    pub async fn resolve_row(
        &mut self,
        store: &dyn DocumentStore,
        row: &RowRecord,
    ) -> Result<ResolvedReferences, StoreError> {
        let mut resolved = ResolvedReferences::default();
        for reference in PROPERTY_REFERENCES {
            let Some(value) = row.get(reference.column).filter(|v| !v.is_blank()) else {
                continue;
            };

            if reference.multi {
                let mut ids = Vec::new();
                for name in split_names(value) {
                    ids.push(Value::from(self.resolve(store, reference.kind, &name).await?));
                }
                resolved.fields.push((reference.target, Value::Array(ids)));
            } else {
                let name = value.as_text();
                let id = self.resolve(store, reference.kind, &name).await?;
                resolved.fields.push((reference.target, Value::from(id)));
            }
        }
        Ok(resolved)
    }

    pub fn creations(&self) -> &[ConfigCreation] {
        &self.creations
    }

    pub fn summary(&self) -> Option<ConfigCreationSummary> {
        summarize_creations(&self.creations)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::import::store::MemoryStore;

    fn property_row(pairs: &[(&str, &str)]) -> RowRecord {
        let mut row = RowRecord::new(2);
        for (k, v) in pairs {
            row.insert(*k, CellValue::from_text(v));
        }
        row
    }

    #[tokio::test]
    async fn case_insensitive_create_once() {
        let store = MemoryStore::new();
        let mut resolver = EntityResolver::new();
        let a = resolver
            .resolve(&store, EntityKind::Category, "Residential")
            .await
            .unwrap();
        let b = resolver
            .resolve(&store, EntityKind::Category, "residential")
            .await
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(store.documents("categories").len(), 1);
        assert_eq!(resolver.creations().len(), 1);
    }

    #[tokio::test]
    async fn existing_entity_is_reused_without_creation() {
        let store = MemoryStore::new();
        let mut doc = Document::new();
        doc.insert("name".into(), json!("Goa"));
        let id = store.insert_one("states", doc).await.unwrap();

        let mut resolver = EntityResolver::new();
        let found = resolver.resolve(&store, EntityKind::State, " GOA ").await.unwrap();
        assert_eq!(found, id);
        assert!(resolver.creations().is_empty());
        assert!(resolver.summary().is_none());
    }

    #[tokio::test]
    async fn created_entity_has_slug_defaults_and_timestamps() {
        let store = MemoryStore::new();
        let mut resolver = EntityResolver::new();
        resolver
            .resolve(&store, EntityKind::Amenity, "  Swimming Pool ")
            .await
            .unwrap();
        let doc = &store.documents("amenities")[0];
        assert_eq!(doc["name"], json!("Swimming Pool"));
        assert_eq!(doc["slug"], json!("swimming-pool"));
        assert_eq!(doc["icon_class"], json!("fa-check"));
        assert_eq!(doc["is_active"], json!(true));
        assert!(doc["created_at"].is_string());
        assert_eq!(doc["created_at"], doc["updated_at"]);
    }

    #[tokio::test]
    async fn resolve_row_fills_ids_and_sets() {
        let store = MemoryStore::new();
        let mut resolver = EntityResolver::new();
        let row = property_row(&[
            ("category", "Villa"),
            ("state", "Goa"),
            ("developer_name", ""),
            ("amenities", "Gym, Pool, gym"),
        ]);
        let resolved = resolver.resolve_row(&store, &row).await.unwrap();
        let targets: Vec<_> = resolved.fields.iter().map(|(t, _)| *t).collect();
        assert_eq!(targets, vec!["category_id", "state_id", "amenity_ids"]);
        let (_, amenity_ids) = &resolved.fields[2];
        assert_eq!(amenity_ids.as_array().map(Vec::len), Some(2));
        assert!(store.documents("developers").is_empty());
    }

    #[tokio::test]
    async fn write_failure_propagates() {
        let store = MemoryStore::new();
        store.fail_inserts_into("developers");
        let mut resolver = EntityResolver::new();
        let row = property_row(&[("category", "Villa"), ("developer_name", "Acme")]);
        let err = resolver.resolve_row(&store, &row).await;
        assert!(matches!(err, Err(StoreError::Backend(_))));
    }

    #[test]
    fn summary_dedups_by_type_and_name() {
        let creations = vec![
            ConfigCreation {
                kind: EntityKind::Developer,
                name: "Acme".into(),
                is_new: true,
            },
            ConfigCreation {
                kind: EntityKind::Developer,
                name: "Acme".into(),
                is_new: true,
            },
            ConfigCreation {
                kind: EntityKind::Category,
                name: "Acme".into(),
                is_new: true,
            },
        ];
        let summary = summarize_creations(&creations).unwrap();
        assert_eq!(summary.total_new_entries, 2);
        assert_eq!(summary.summary[&EntityKind::Developer], vec!["Acme"]);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["totalNewEntries"], json!(2));
        assert_eq!(json["summary"]["developer"], json!(["Acme"]));
        assert_eq!(json["details"][0]["isNew"], json!(true));
        assert_eq!(json["details"][0]["type"], json!("developer"));
    }

    #[test]
    fn split_names_trims_and_dedups() {
        let names = split_names(&CellValue::from_text(" Gym ,, Pool,POOL "));
        assert_eq!(names, vec!["Gym", "Pool"]);
    }
}

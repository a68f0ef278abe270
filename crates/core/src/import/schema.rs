//! Schema registry: required and optional field names per entity kind.
//!
//! The table is a set of `static` schemas indexed by a closed enum, so it is
//! fixed at compile time and cannot be altered at runtime.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The target collection an import or validation run applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Property,
    Category,
    State,
    Amenity,
    Developer,
    Facility,
    Lead,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        Self::Property,
        Self::Category,
        Self::State,
        Self::Amenity,
        Self::Developer,
        Self::Facility,
        Self::Lead,
    ];

    /// Singular tag, used in config-creation summaries.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Property => "property",
            Self::Category => "category",
            Self::State => "state",
            Self::Amenity => "amenity",
            Self::Developer => "developer",
            Self::Facility => "facility",
            Self::Lead => "lead",
        }
    }

    /// Storage collection name, also the selector used in request paths.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Property => "properties",
            Self::Category => "categories",
            Self::State => "states",
            Self::Amenity => "amenities",
            Self::Developer => "developers",
            Self::Facility => "facilities",
            Self::Lead => "leads",
        }
    }

    pub fn schema(&self) -> &'static EntitySchema {
        match self {
            Self::Property => &PROPERTY_SCHEMA,
            Self::Category => &CATEGORY_SCHEMA,
            Self::State => &STATE_SCHEMA,
            Self::Amenity => &AMENITY_SCHEMA,
            Self::Developer => &DEVELOPER_SCHEMA,
            Self::Facility => &FACILITY_SCHEMA,
            Self::Lead => &LEAD_SCHEMA,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = CoreError;

    /// Accepts the plural collection selector or the singular tag.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.collection() == needle || k.as_str() == needle)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Unknown entity kind '{s}'. Must be one of: {}",
                    Self::ALL
                        .iter()
                        .map(|k| k.collection())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

/// Required and optional field names for one entity kind.
#[derive(Debug, Serialize)]
pub struct EntitySchema {
    pub kind: EntityKind,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

impl EntitySchema {
    /// Required fields first, then optional, in declaration order.
    pub fn all_fields(&self) -> impl Iterator<Item = &'static str> {
        self.required.iter().chain(self.optional.iter()).copied()
    }
}

pub static PROPERTY_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Property,
    required: &["property_name", "category", "state", "price"],
    optional: &[
        "slug",
        "developer_name",
        "location",
        "city",
        "address",
        "area_sqft",
        "bedrooms",
        "bathrooms",
        "amenities",
        "facilities",
        "description",
        "property_status",
        "featured",
        "image_url",
    ],
};

pub static CATEGORY_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Category,
    required: &["name"],
    optional: &["slug", "description", "icon_class"],
};

pub static STATE_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::State,
    required: &["name"],
    optional: &["slug", "code", "country"],
};

pub static AMENITY_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Amenity,
    required: &["name"],
    optional: &["slug", "description", "icon_class"],
};

pub static DEVELOPER_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Developer,
    required: &["name"],
    optional: &[
        "slug",
        "description",
        "logo_url",
        "website",
        "established_year",
    ],
};

pub static FACILITY_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Facility,
    required: &["name"],
    optional: &["slug", "description", "icon_class"],
};

pub static LEAD_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Lead,
    required: &["name", "phone"],
    optional: &[
        "email",
        "lead_type",
        "source",
        "city",
        "budget",
        "property_interest",
        "notes",
    ],
};

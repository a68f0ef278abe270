//! Row validator: pure logic, no storage access.

use serde::Serialize;

use super::row::{CellValue, RowRecord};
use super::schema::EntitySchema;

/// Outcome of checking one field of one row.
#[derive(Debug, Clone, Serialize)]
pub struct FieldResult {
    pub field: String,
    pub value: CellValue,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Every field result for a row: all required fields, plus optional fields
/// that were present with a value.
#[derive(Debug, Clone, Serialize)]
pub struct RowValidation {
    pub line: usize,
    pub is_valid: bool,
    pub results: Vec<FieldResult>,
}

impl RowValidation {
    pub fn errors(&self) -> impl Iterator<Item = &FieldResult> {
        self.results.iter().filter(|r| !r.valid)
    }
}

/// Validate `row` against `schema`.
///
/// A required field fails when absent or blank. Optional fields never fail;
/// they are recorded only when present so field accuracy can count them.
pub fn validate_row(row: &RowRecord, schema: &EntitySchema) -> RowValidation {
    let mut results = Vec::with_capacity(schema.required.len() + schema.optional.len());

    for field in schema.required {
        let value = row.get(field).cloned().unwrap_or(CellValue::Empty);
        let valid = !value.is_blank();
        results.push(FieldResult {
            field: field.to_string(),
            value,
            valid,
            error: (!valid).then(|| format!("{field} is required")),
        });
    }

    for field in schema.optional {
        if let Some(value) = row.get(field).filter(|v| !v.is_blank()) {
            results.push(FieldResult {
                field: field.to_string(),
                value: value.clone(),
                valid: true,
                error: None,
            });
        }
    }

    RowValidation {
        line: row.line,
        is_valid: results.iter().all(|r| r.valid),
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::schema::{EntityKind, CATEGORY_SCHEMA};

    fn row(pairs: &[(&str, &str)]) -> RowRecord {
        let mut row = RowRecord::new(2);
        for (k, v) in pairs {
            row.insert(*k, CellValue::from_text(v));
        }
        row
    }

    #[test]
    fn complete_row_is_valid() {
        let r = row(&[
            ("property_name", "Golf View"),
            ("category", "Residential"),
            ("state", "Goa"),
            ("price", "1200000"),
        ]);
        let result = validate_row(&r, EntityKind::Property.schema());
        assert!(result.is_valid);
        assert_eq!(result.errors().count(), 0);
        assert_eq!(result.results.len(), 4);
    }

    #[test]
    fn one_error_per_missing_required_field() {
        let r = row(&[("category", "Residential"), ("state", "  ")]);
        let result = validate_row(&r, EntityKind::Property.schema());
        assert!(!result.is_valid);
        let missing: Vec<_> = result.errors().map(|e| e.field.as_str()).collect();
        assert_eq!(missing, vec!["property_name", "state", "price"]);
        let messages: Vec<_> = result.errors().filter_map(|e| e.error.clone()).collect();
        assert_eq!(messages[0], "property_name is required");
        assert_eq!(messages.len(), 3);
    }

    #[test]
    fn optional_fields_recorded_only_when_present() {
        let r = row(&[("name", "Villa"), ("description", ""), ("icon_class", "fa-home")]);
        let result = validate_row(&r, &CATEGORY_SCHEMA);
        assert!(result.is_valid);
        let fields: Vec<_> = result.results.iter().map(|r| r.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "icon_class"]);
    }

    #[test]
    fn non_text_values_satisfy_required() {
        let mut r = RowRecord::new(2);
        r.insert("name", CellValue::Number(42.0));
        let result = validate_row(&r, &CATEGORY_SCHEMA);
        assert!(result.is_valid);
    }

    #[test]
    fn unknown_columns_are_ignored() {
        let r = row(&[("name", "Pool"), ("colour", "blue")]);
        let result = validate_row(&r, EntityKind::Amenity.schema());
        assert_eq!(result.results.len(), 1);
    }
}

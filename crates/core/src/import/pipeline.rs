//! Import orchestration: decode, validate, deduplicate, resolve and persist.
//!
//! Two paths share the front half (decode + header normalization):
//!
//! - **Entity path** (properties and configuration kinds): in-file duplicate
//!   rows are flagged with a warning but still imported; property rows get
//!   their category/state/developer/amenity/facility names resolved to ids.
//! - **Leads path**: rows are keyed on their canonical phone number; a
//!   malformed number, a repeat within the file, or a number already on
//!   record rejects the row. The dry run applies the same phone rules.
//!
//! A failing row never aborts the import. Only file-level problems (parse
//! failure, no data rows) surface as [`ImportError`].

use serde::Serialize;
use serde_json::Value;

use super::decoder::{decode, FileKind, ParseError};
use super::duplicates::{PhoneKeySet, RowFingerprints};
use super::phone::{CanonicalPhone, PhoneError, PhonePolicy};
use super::report::{ImportReport, ReportBuilder, RowOutcome};
use super::resolver::{config_document, now_value, ConfigCreationSummary, PROPERTY_REFERENCES};
use super::row::{number_value, CellValue, RowRecord};
use super::schema::EntityKind;
use super::session::ImportSession;
use super::slug::{allocate_slug, slugify};
use super::store::{Document, DocumentStore, Filter, StoreError};
use super::validator::{validate_row, RowValidation};
use crate::types::DbId;

/// Alternate lead column names and the canonical column each maps to.
pub const LEAD_HEADER_ALIASES: &[(&str, &str)] = &[
    ("mobile", "phone"),
    ("mobile_number", "phone"),
    ("phone_number", "phone"),
    ("contact", "phone"),
    ("contact_number", "phone"),
    ("full_name", "name"),
    ("lead_name", "name"),
    ("customer_name", "name"),
    ("type", "lead_type"),
];

pub const DEFAULT_LEAD_TYPE: &str = "general";
pub const NEW_LEAD_STATUS: &str = "new";

const NUMERIC_PROPERTY_FIELDS: &[&str] = &["price", "area_sqft", "bedrooms", "bathrooms"];
const BOOLEAN_PROPERTY_FIELDS: &[&str] = &["featured"];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// File-level failure. Nothing was persisted.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("The uploaded file contains no data rows")]
    EmptyFile,
}

/// Why a single row was not persisted.
#[derive(Debug, thiserror::Error)]
pub enum RowFailure {
    #[error(transparent)]
    InvalidPhone(#[from] PhoneError),

    #[error("Duplicate phone number {phone} (first seen in row {first_row})")]
    DuplicatePhone {
        phone: CanonicalPhone,
        first_row: usize,
    },

    #[error("A lead with phone number {phone} already exists")]
    ExistingLead { phone: CanonicalPhone },

    #[error("Failed to save row: {0}")]
    Persistence(#[from] StoreError),
}

impl RowFailure {
    pub fn outcome(&self) -> RowOutcome {
        match self {
            Self::InvalidPhone(_) | Self::DuplicatePhone { .. } | Self::ExistingLead { .. } => {
                RowOutcome::Rejected
            }
            Self::Persistence(_) => RowOutcome::PersistenceFailed,
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Error entry for one row of an entity import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RowErrorEntry {
    /// Field-level validation messages.
    Validation { row: usize, errors: Vec<String> },
    /// A single failure message (persistence).
    Failure { row: usize, error: String },
}

/// Result of importing properties or a configuration kind.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityImportSummary {
    pub success: bool,
    pub inserted_count: usize,
    pub skipped_count: usize,
    pub total_processed: usize,
    pub duplicate_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<RowErrorEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_creations: Option<ConfigCreationSummary>,
}

/// Result of importing leads. `successful + failed == total`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadImportSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ImportOutcome {
    Entities(EntityImportSummary),
    Leads(LeadImportSummary),
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Header aliases that apply to `kind`.
pub fn header_aliases(kind: EntityKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        EntityKind::Lead => LEAD_HEADER_ALIASES,
        _ => &[],
    }
}

/// Decode a file and normalize its headers for `kind`.
pub fn prepare_rows(
    bytes: &[u8],
    file_kind: FileKind,
    kind: EntityKind,
) -> Result<Vec<RowRecord>, ImportError> {
    let rows = decode(bytes, file_kind)?;
    if rows.is_empty() {
        return Err(ImportError::EmptyFile);
    }
    let aliases = header_aliases(kind);
    Ok(rows
        .into_iter()
        .map(|row| row.with_normalized_headers(aliases))
        .collect())
}

/// Dry run: validate every row and flag in-file duplicates without touching
/// storage.
///
/// Lead rows also have their phone canonicalized by `phone_policy`, and their
/// duplicates are decided by canonical phone rather than by the whole row.
pub fn validate_file(
    phone_policy: &dyn PhonePolicy,
    bytes: &[u8],
    file_kind: FileKind,
    kind: EntityKind,
) -> Result<ImportReport, ImportError> {
    let rows = prepare_rows(bytes, file_kind, kind)?;
    let schema = kind.schema();
    let mut fingerprints = RowFingerprints::new();
    let mut phones = PhoneKeySet::new();
    let mut report = ReportBuilder::new();

    for row in &rows {
        let mut validation = validate_row(row, schema);
        if kind == EntityKind::Lead {
            let phone = canonical_phone(&mut validation, phone_policy);
            // Invalid rows never reach the claim step of a real import.
            if let Some(phone) = phone.filter(|_| validation.is_valid) {
                if let Err(first_line) = phones.claim(&phone, row.line) {
                    report.record_duplicate_phone(row.line, phone.as_str(), first_line);
                }
            }
        } else if let Some(first_line) = fingerprints.check(row) {
            report.record_duplicate(row.line, first_line);
        }
        report.record_validation(&validation);
    }

    let report = report.finish();
    tracing::info!(
        kind = %kind,
        total = report.total_rows,
        valid = report.valid_rows,
        duplicates = report.duplicate_rows,
        "Validated import file"
    );
    Ok(report)
}

/// Import a file of `kind` into `store`.
pub async fn import_file(
    store: &dyn DocumentStore,
    phone_policy: &dyn PhonePolicy,
    bytes: &[u8],
    file_kind: FileKind,
    kind: EntityKind,
) -> Result<ImportOutcome, ImportError> {
    let rows = prepare_rows(bytes, file_kind, kind)?;
    tracing::info!(kind = %kind, file_kind = %file_kind, rows = rows.len(), "Import started");

    let mut session = ImportSession::new(store, kind);
    let outcome = match kind {
        EntityKind::Lead => {
            ImportOutcome::Leads(import_leads(&mut session, phone_policy, &rows).await)
        }
        _ => ImportOutcome::Entities(import_entities(&mut session, &rows).await),
    };

    let tally = session.report().tally();
    tracing::info!(
        kind = %kind,
        persisted = tally.persisted,
        validation_failed = tally.validation_failed,
        rejected = tally.rejected,
        persistence_failed = tally.persistence_failed,
        "Import finished"
    );
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Entity path
// ---------------------------------------------------------------------------

async fn import_entities(session: &mut ImportSession<'_>, rows: &[RowRecord]) -> EntityImportSummary {
    let schema = session.kind.schema();
    let mut errors = Vec::new();

    for row in rows {
        if let Some(first_line) = session.fingerprints.check(row) {
            session.report.record_duplicate(row.line, first_line);
        }

        let validation = validate_row(row, schema);
        session.report.record_validation(&validation);
        if !validation.is_valid {
            errors.push(RowErrorEntry::Validation {
                row: row.line,
                errors: validation.errors().filter_map(|r| r.error.clone()).collect(),
            });
            session.report.record_outcome(RowOutcome::ValidationFailed);
            continue;
        }

        match persist_entity_row(session, row).await {
            Ok(id) => {
                tracing::debug!(kind = %session.kind, line = row.line, id, "Row imported");
                session.report.record_outcome(RowOutcome::Persisted);
            }
            Err(err) => {
                tracing::warn!(kind = %session.kind, line = row.line, error = %err, "Row not saved");
                let failure = RowFailure::Persistence(err);
                session.report.record_outcome(failure.outcome());
                errors.push(RowErrorEntry::Failure {
                    row: row.line,
                    error: failure.to_string(),
                });
            }
        }
    }

    let tally = session.report.tally();
    EntityImportSummary {
        success: true,
        inserted_count: tally.persisted,
        skipped_count: tally.not_persisted(),
        total_processed: rows.len(),
        duplicate_count: session.report.duplicate_rows(),
        warnings: session.report.warnings().to_vec(),
        errors,
        config_creations: session.resolver.summary(),
    }
}

async fn persist_entity_row(
    session: &mut ImportSession<'_>,
    row: &RowRecord,
) -> Result<DbId, StoreError> {
    let store = session.store;
    let kind = session.kind;
    let doc = match kind {
        EntityKind::Property => property_document(session, row).await?,
        _ => config_row_document(store, kind, row).await?,
    };
    store.insert_one(kind.collection(), doc).await
}

async fn property_document(
    session: &mut ImportSession<'_>,
    row: &RowRecord,
) -> Result<Document, StoreError> {
    let store = session.store;
    let references = session.resolver.resolve_row(store, row).await?;

    let mut doc = Document::new();
    for (column, value) in row.iter() {
        let is_reference = PROPERTY_REFERENCES.iter().any(|r| r.column == column);
        if value.is_blank() || is_reference || column == "slug" {
            continue;
        }
        doc.insert(column.to_string(), property_value(column, value));
    }
    for (target, value) in references.fields {
        doc.insert(target.to_string(), value);
    }

    let name = row.text("property_name").unwrap_or_default();
    let slug = row_slug(store, EntityKind::Property.collection(), row, &name).await?;
    doc.insert("slug".into(), Value::from(slug));
    stamp(&mut doc);
    Ok(doc)
}

async fn config_row_document(
    store: &dyn DocumentStore,
    kind: EntityKind,
    row: &RowRecord,
) -> Result<Document, StoreError> {
    let name = row.text("name").unwrap_or_default();
    let slug = row_slug(store, kind.collection(), row, &name).await?;

    let mut doc = config_document(kind, &name, slug);
    for (column, value) in row.iter() {
        if value.is_blank() || column == "name" || column == "slug" {
            continue;
        }
        doc.insert(column.to_string(), cell_json(value));
    }
    Ok(doc)
}

/// Slug for a new document in `collection`: the row's own `slug` column if it
/// has one, else `name`. Either way the candidate is probed for collisions.
async fn row_slug(
    store: &dyn DocumentStore,
    collection: &str,
    row: &RowRecord,
    name: &str,
) -> Result<String, StoreError> {
    let explicit = row.text("slug").filter(|raw| !slugify(raw).is_empty());
    allocate_slug(store, collection, explicit.as_deref().unwrap_or(name)).await
}

fn property_value(column: &str, value: &CellValue) -> Value {
    if NUMERIC_PROPERTY_FIELDS.contains(&column) {
        if let Some(n) = parse_number(value) {
            return number_value(n);
        }
    }
    if BOOLEAN_PROPERTY_FIELDS.contains(&column) {
        if let Some(b) = parse_bool(value) {
            return Value::Bool(b);
        }
    }
    cell_json(value)
}

/// Numeric reading of a cell. Thousands separators are ignored.
fn parse_number(value: &CellValue) -> Option<f64> {
    let n = match value {
        CellValue::Number(n) => *n,
        CellValue::Text(s) => s.trim().replace(',', "").parse().ok()?,
        CellValue::Bool(_) | CellValue::Empty => return None,
    };
    n.is_finite().then_some(n)
}

fn parse_bool(value: &CellValue) -> Option<bool> {
    match value {
        CellValue::Bool(b) => Some(*b),
        CellValue::Number(n) if *n == 1.0 => Some(true),
        CellValue::Number(n) if *n == 0.0 => Some(false),
        CellValue::Text(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn cell_json(value: &CellValue) -> Value {
    match value {
        CellValue::Text(s) => Value::from(s.trim()),
        other => other.to_json(),
    }
}

fn stamp(doc: &mut Document) {
    let now = now_value();
    doc.insert("created_at".into(), now.clone());
    doc.insert("updated_at".into(), now);
}

// ---------------------------------------------------------------------------
// Leads path
// ---------------------------------------------------------------------------

async fn import_leads(
    session: &mut ImportSession<'_>,
    phone_policy: &dyn PhonePolicy,
    rows: &[RowRecord],
) -> LeadImportSummary {
    let schema = EntityKind::Lead.schema();
    let mut errors = Vec::new();

    for row in rows {
        let validation = validate_row(row, schema);
        session.report.record_validation(&validation);

        if !validation.is_valid {
            errors.extend(
                validation
                    .errors()
                    .filter_map(|r| r.error.as_deref())
                    .map(|message| format!("Row {}: {message}", row.line)),
            );
            session.report.record_outcome(RowOutcome::ValidationFailed);
            continue;
        }

        match persist_lead_row(session, phone_policy, row).await {
            Ok(id) => {
                tracing::debug!(line = row.line, id, "Lead imported");
                session.report.record_outcome(RowOutcome::Persisted);
            }
            Err(failure) => {
                if let RowFailure::Persistence(err) = &failure {
                    tracing::warn!(line = row.line, error = %err, "Lead not saved");
                }
                session.report.record_outcome(failure.outcome());
                errors.push(format!("Row {}: {failure}", row.line));
            }
        }
    }

    let tally = session.report.tally();
    LeadImportSummary {
        total: rows.len(),
        successful: tally.persisted,
        failed: tally.not_persisted(),
        errors,
    }
}

/// Canonicalize, claim the phone within the file, check storage, insert.
///
/// A number is claimed before the storage check so a later repeat in the
/// same file is reported as an in-file duplicate even when the first
/// occurrence was rejected as already on record.
async fn persist_lead_row(
    session: &mut ImportSession<'_>,
    phone_policy: &dyn PhonePolicy,
    row: &RowRecord,
) -> Result<DbId, RowFailure> {
    let raw = row
        .get("phone")
        .map(|v| v.as_text().into_owned())
        .unwrap_or_default();
    let phone = phone_policy.canonicalize(&raw)?;

    if let Err(first_row) = session.phones.claim(&phone, row.line) {
        return Err(RowFailure::DuplicatePhone { phone, first_row });
    }

    let collection = EntityKind::Lead.collection();
    let on_record = session
        .store
        .count_documents(collection, &Filter::eq("phone", phone.as_str()))
        .await?;
    if on_record > 0 {
        return Err(RowFailure::ExistingLead { phone });
    }

    let doc = lead_document(row, &phone);
    Ok(session.store.insert_one(collection, doc).await?)
}

/// Canonicalize the row's `phone` result. A number the policy rejects turns
/// that field result into a failure and the row invalid.
fn canonical_phone(
    validation: &mut RowValidation,
    phone_policy: &dyn PhonePolicy,
) -> Option<CanonicalPhone> {
    let result = validation
        .results
        .iter_mut()
        .find(|r| r.field == "phone" && r.valid)?;

    let canonical = phone_policy.canonicalize(&result.value.as_text());
    match canonical {
        Ok(phone) => Some(phone),
        Err(err) => {
            result.valid = false;
            result.error = Some(err.to_string());
            validation.is_valid = false;
            None
        }
    }
}

fn lead_document(row: &RowRecord, phone: &CanonicalPhone) -> Document {
    let mut doc = Document::new();
    for (column, value) in row.iter() {
        if value.is_blank() || column == "phone" {
            continue;
        }
        doc.insert(column.to_string(), cell_json(value));
    }
    doc.insert("phone".into(), Value::from(phone.as_str()));
    doc.entry("lead_type")
        .or_insert_with(|| Value::from(DEFAULT_LEAD_TYPE));
    doc.entry("status")
        .or_insert_with(|| Value::from(NEW_LEAD_STATUS));
    stamp(&mut doc);
    doc
}

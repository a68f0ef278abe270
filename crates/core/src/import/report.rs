//! Report aggregation: totals, per-field accuracy, row errors and warnings.

use std::collections::BTreeMap;

use serde::Serialize;

use super::validator::RowValidation;

/// Pass/fail tally for one field across all rows where it was evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldAccuracy {
    pub valid: usize,
    pub invalid: usize,
    pub percentage: u32,
}

/// One failed field on one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportError {
    pub row: usize,
    pub field: String,
    pub message: String,
}

/// Structured result of a validate-only run.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub invalid_rows: usize,
    pub duplicate_rows: usize,
    pub warnings: Vec<String>,
    pub errors: Vec<ReportError>,
    pub field_accuracy: BTreeMap<String, FieldAccuracy>,
}

/// What finally happened to a row during an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    ValidationFailed,
    Rejected,
    PersistenceFailed,
    Persisted,
}

/// Per-outcome row counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeTally {
    pub validation_failed: usize,
    pub rejected: usize,
    pub persistence_failed: usize,
    pub persisted: usize,
}

impl OutcomeTally {
    /// Rows that did not end up persisted.
    pub fn not_persisted(&self) -> usize {
        self.validation_failed + self.rejected + self.persistence_failed
    }
}

/// Accumulates row results incrementally; [`ReportBuilder::finish`] produces
/// the report. Error lists are never truncated here.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    total_rows: usize,
    valid_rows: usize,
    invalid_rows: usize,
    duplicate_rows: usize,
    warnings: Vec<String>,
    errors: Vec<ReportError>,
    fields: BTreeMap<String, (usize, usize)>,
    tally: OutcomeTally,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a row and fold its field results into the accuracy table.
    pub fn record_validation(&mut self, validation: &RowValidation) {
        self.total_rows += 1;
        if validation.is_valid {
            self.valid_rows += 1;
        } else {
            self.invalid_rows += 1;
        }

        for result in &validation.results {
            let entry = self.fields.entry(result.field.clone()).or_default();
            if result.valid {
                entry.0 += 1;
            } else {
                entry.1 += 1;
                self.errors.push(ReportError {
                    row: validation.line,
                    field: result.field.clone(),
                    message: result
                        .error
                        .clone()
                        .unwrap_or_else(|| format!("{} is invalid", result.field)),
                });
            }
        }
    }

    /// Flag an in-file duplicate of an earlier row.
    pub fn record_duplicate(&mut self, line: usize, first_line: usize) {
        self.duplicate_rows += 1;
        self.warnings
            .push(format!("Row {line} is a duplicate of row {first_line}"));
    }

    /// Flag a lead row whose canonical phone an earlier row already claimed.
    pub fn record_duplicate_phone(&mut self, line: usize, phone: &str, first_line: usize) {
        self.duplicate_rows += 1;
        self.warnings
            .push(format!("Row {line} repeats phone {phone} from row {first_line}"));
    }

    pub fn record_outcome(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::ValidationFailed => self.tally.validation_failed += 1,
            RowOutcome::Rejected => self.tally.rejected += 1,
            RowOutcome::PersistenceFailed => self.tally.persistence_failed += 1,
            RowOutcome::Persisted => self.tally.persisted += 1,
        }
    }

    pub fn tally(&self) -> OutcomeTally {
        self.tally
    }

    pub fn duplicate_rows(&self) -> usize {
        self.duplicate_rows
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn finish(self) -> ImportReport {
        let field_accuracy = self
            .fields
            .into_iter()
            .map(|(field, (valid, invalid))| {
                (
                    field,
                    FieldAccuracy {
                        valid,
                        invalid,
                        percentage: percentage(valid, invalid),
                    },
                )
            })
            .collect();

        ImportReport {
            total_rows: self.total_rows,
            valid_rows: self.valid_rows,
            invalid_rows: self.invalid_rows,
            duplicate_rows: self.duplicate_rows,
            warnings: self.warnings,
            errors: self.errors,
            field_accuracy,
        }
    }
}

/// `round(100 * valid / (valid + invalid))`, or 0 when nothing was evaluated.
fn percentage(valid: usize, invalid: usize) -> u32 {
    let total = valid + invalid;
    if total == 0 {
        return 0;
    }
    (valid as f64 * 100.0 / total as f64).round() as u32
}

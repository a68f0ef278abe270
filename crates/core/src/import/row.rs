//! Row records: one decoded line of an uploaded file, keyed by column header.

use std::borrow::Cow;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// A raw cell value as produced by the decoder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Empty,
}

impl CellValue {
    /// Wrap a raw text cell, mapping the empty string to [`CellValue::Empty`].
    pub fn from_text(raw: &str) -> Self {
        if raw.is_empty() {
            Self::Empty
        } else {
            Self::Text(raw.to_string())
        }
    }

    /// `true` for absent values and for text that is empty after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::Empty => true,
            Self::Number(_) | Self::Bool(_) => false,
        }
    }

    /// Render the value as text. Integral numbers drop the fractional part so
    /// that spreadsheet-typed phone numbers come through as digits.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s) => Cow::Borrowed(s),
            Self::Number(n) => Cow::Owned(format_number(*n)),
            Self::Bool(b) => Cow::Owned(b.to_string()),
            Self::Empty => Cow::Borrowed(""),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::Number(n) => number_value(*n),
            Self::Bool(b) => Value::Bool(*b),
            Self::Empty => Value::Null,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Convert a float into a JSON number, preferring an integer representation.
pub(crate) fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// One decoded row, with the 1-based line number it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowRecord {
    pub line: usize,
    fields: IndexMap<String, CellValue>,
}

impl RowRecord {
    pub fn new(line: usize) -> Self {
        Self {
            line,
            fields: IndexMap::new(),
        }
    }

    /// Insert a cell. A repeated column only replaces an earlier blank cell.
    pub fn insert(&mut self, column: impl Into<String>, value: CellValue) {
        let column = column.into();
        match self.fields.get(&column) {
            Some(existing) if !existing.is_blank() => {}
            _ => {
                self.fields.insert(column, value);
            }
        }
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.fields.get(column)
    }

    /// Trimmed text of a column, or `None` when absent or blank.
    pub fn text(&self, column: &str) -> Option<String> {
        self.fields
            .get(column)
            .filter(|v| !v.is_blank())
            .map(|v| v.as_text().trim().to_string())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `true` when every cell is blank (trailing spreadsheet rows, `,,,` lines).
    pub fn is_blank(&self) -> bool {
        self.fields.values().all(CellValue::is_blank)
    }

    /// Rebuild the record with normalized column names, then rename alias
    /// columns to their canonical names. An alias never overwrites a
    /// canonical column that already carries a value; it is kept as-is.
    pub fn with_normalized_headers(self, aliases: &[(&str, &str)]) -> Self {
        let mut out = RowRecord::new(self.line);
        for (column, value) in self.fields {
            out.insert(normalize_header(&column), value);
        }
        for (alias, canonical) in aliases {
            let canonical_filled = out.get(canonical).is_some_and(|v| !v.is_blank());
            if canonical_filled {
                continue;
            }
            if let Some(value) = out.fields.shift_remove(*alias) {
                out.fields.insert(canonical.to_string(), value);
            }
        }
        out
    }
}

/// Normalize a header: trim (including a UTF-8 BOM), lower-case, and turn
/// runs of whitespace or hyphens into a single underscore.
pub fn normalize_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for c in raw.trim_start_matches('\u{feff}').trim().chars() {
        if c.is_whitespace() || c == '-' {
            pending_sep = true;
            continue;
        }
        if pending_sep && !out.is_empty() {
            out.push('_');
        }
        pending_sep = false;
        out.extend(c.to_lowercase());
    }
    out
}

//! Tabular decoder: delimited text or packed spreadsheet bytes into row records.
//!
//! Column names are passed through untouched; normalization is the caller's
//! job (see [`super::row::RowRecord::with_normalized_headers`]).

use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use serde::{Deserialize, Serialize};

use super::row::{CellValue, RowRecord};

/// Declared format of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileKind {
    DelimitedText,
    PackedSpreadsheet,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DelimitedText => "delimited-text",
            Self::PackedSpreadsheet => "packed-spreadsheet",
        }
    }

    /// Derive the file kind from a file name's extension (case-insensitive).
    pub fn from_file_name(file_name: &str) -> Result<Self, ParseError> {
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(Self::DelimitedText),
            "xlsx" => Ok(Self::PackedSpreadsheet),
            _ => Err(ParseError::UnsupportedExtension(file_name.to_string())),
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The buffer could not be decoded as the declared file kind.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unreadable spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::XlsxError),

    #[error("Spreadsheet contains no sheets")]
    NoSheets,

    #[error("Unsupported file type '{0}'; expected .csv or .xlsx")]
    UnsupportedExtension(String),
}

/// Decode `bytes` as `kind` into ordered row records. Blank rows are skipped.
pub fn decode(bytes: &[u8], kind: FileKind) -> Result<Vec<RowRecord>, ParseError> {
    match kind {
        FileKind::DelimitedText => decode_delimited(bytes),
        FileKind::PackedSpreadsheet => decode_spreadsheet(bytes),
    }
}

fn decode_delimited(bytes: &[u8]) -> Result<Vec<RowRecord>, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Ok(Vec::new());
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(rows.len() + 2);

        let mut row = RowRecord::new(line);
        for (idx, header) in headers.iter().enumerate() {
            let raw = record.get(idx).unwrap_or("");
            row.insert(header, CellValue::from_text(raw));
        }
        if !row.is_blank() {
            rows.push(row);
        }
    }
    Ok(rows)
}

fn decode_spreadsheet(bytes: &[u8]) -> Result<Vec<RowRecord>, ParseError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(ParseError::NoSheets)?;
    let range = workbook.worksheet_range(&sheet_name)?;

    // Ranges start at the first non-empty cell; offset keeps line numbers
    // aligned with what the operator sees in their spreadsheet.
    let first_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);

    let mut rows_iter = range.rows();
    let headers: Vec<String> = match rows_iter.next() {
        Some(cells) => cells.iter().map(header_text).collect(),
        None => return Ok(Vec::new()),
    };

    let mut rows = Vec::new();
    for (idx, cells) in rows_iter.enumerate() {
        // Header sits on sheet row `first_row`; data rows follow, 1-based.
        let line = first_row + idx + 2;
        let mut row = RowRecord::new(line);
        for (col, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let value = cells.get(col).map(cell_value).unwrap_or(CellValue::Empty);
            row.insert(header.as_str(), value);
        }
        if !row.is_blank() {
            rows.push(row);
        }
    }
    Ok(rows)
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Empty => String::new(),
        other => cell_value(other).as_text().into_owned(),
    }
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::String(s) => CellValue::from_text(s),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::from_text(s),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}

//! Downloadable import templates: the kind's header row plus two example
//! rows, as CSV or a minimal single-sheet XLSX workbook.

use std::io::{Cursor, Write};
use std::str::FromStr;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::schema::EntityKind;
use crate::error::CoreError;

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const SHEET_NAME: &str = "Template";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TemplateFormat {
    #[default]
    Csv,
    Xlsx,
}

impl TemplateFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => CSV_CONTENT_TYPE,
            Self::Xlsx => XLSX_CONTENT_TYPE,
        }
    }
}

impl FromStr for TemplateFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" => Ok(Self::Xlsx),
            other => Err(CoreError::Validation(format!(
                "Unknown template format '{other}'. Must be one of: csv, xlsx"
            ))),
        }
    }
}

/// A rendered template ready to be served as an attachment.
#[derive(Debug, Clone)]
pub struct TemplateFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Header row for `kind`: required fields, then optional, in schema order.
pub fn template_headers(kind: EntityKind) -> Vec<&'static str> {
    kind.schema().all_fields().collect()
}

/// Two example rows aligned with [`template_headers`]. Columns without an
/// example value are left empty.
pub fn sample_rows(kind: EntityKind) -> Vec<Vec<String>> {
    let headers = template_headers(kind);
    sample_values(kind)
        .iter()
        .map(|values| {
            headers
                .iter()
                .map(|header| {
                    values
                        .iter()
                        .find(|(field, _)| field == header)
                        .map(|(_, value)| value.to_string())
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect()
}

fn sample_values(kind: EntityKind) -> [&'static [(&'static str, &'static str)]; 2] {
    match kind {
        EntityKind::Property => [
            &[
                ("property_name", "Palm Residency"),
                ("category", "Apartment"),
                ("state", "Maharashtra"),
                ("price", "8500000"),
                ("developer_name", "Skyline Builders"),
                ("location", "Baner"),
                ("city", "Pune"),
                ("area_sqft", "1250"),
                ("bedrooms", "3"),
                ("bathrooms", "2"),
                ("amenities", "Swimming Pool, Gym"),
                ("facilities", "Power Backup"),
                ("description", "Corner unit with two balconies"),
                ("property_status", "ready_to_move"),
                ("featured", "yes"),
            ],
            &[
                ("property_name", "Coconut Grove Villa"),
                ("category", "Villa"),
                ("state", "Goa"),
                ("price", "24000000"),
                ("city", "Panaji"),
                ("area_sqft", "3200"),
                ("bedrooms", "4"),
                ("bathrooms", "4"),
                ("amenities", "Garden"),
                ("property_status", "under_construction"),
                ("featured", "no"),
            ],
        ],
        EntityKind::Category => [
            &[
                ("name", "Apartment"),
                ("description", "Multi-storey residential units"),
                ("icon_class", "fa-building"),
            ],
            &[("name", "Villa"), ("slug", "villa")],
        ],
        EntityKind::State => [
            &[("name", "Maharashtra"), ("code", "MH"), ("country", "India")],
            &[("name", "Goa"), ("code", "GA")],
        ],
        EntityKind::Amenity => [
            &[("name", "Swimming Pool"), ("icon_class", "fa-swimmer")],
            &[("name", "Gym"), ("description", "Fully equipped fitness centre")],
        ],
        EntityKind::Developer => [
            &[
                ("name", "Skyline Builders"),
                ("website", "https://skyline.example"),
                ("established_year", "1998"),
            ],
            &[("name", "Coastal Homes"), ("description", "Boutique villa developer")],
        ],
        EntityKind::Facility => [
            &[("name", "Power Backup"), ("icon_class", "fa-bolt")],
            &[("name", "Covered Parking")],
        ],
        EntityKind::Lead => [
            &[
                ("name", "Asha Patil"),
                ("phone", "9876543210"),
                ("email", "asha@example.com"),
                ("lead_type", "buyer"),
                ("source", "website"),
                ("city", "Pune"),
                ("budget", "9000000"),
            ],
            &[
                ("name", "Ravi Kumar"),
                ("phone", "+91 91234 56789"),
                ("source", "walk_in"),
                ("notes", "Call after 6pm"),
            ],
        ],
    }
}

/// Render the template for `kind` in `format`.
pub fn render(kind: EntityKind, format: TemplateFormat) -> Result<TemplateFile, CoreError> {
    let headers = template_headers(kind);
    let rows = sample_rows(kind);
    let bytes = match format {
        TemplateFormat::Csv => render_csv(&headers, &rows)?,
        TemplateFormat::Xlsx => render_xlsx(&headers, &rows)?,
    };
    Ok(TemplateFile {
        file_name: format!("{}_template.{}", kind.collection(), format.extension()),
        content_type: format.content_type(),
        bytes,
    })
}

fn render_csv(headers: &[&str], rows: &[Vec<String>]) -> Result<Vec<u8>, CoreError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers).map_err(internal)?;
    for row in rows {
        writer.write_record(row).map_err(internal)?;
    }
    writer
        .into_inner()
        .map_err(|e| CoreError::Internal(format!("Failed to flush CSV template: {e}")))
}

// ── XLSX ─────────────────────────────────────────────────────────────

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

fn workbook_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{SHEET_NAME}" sheetId="1" r:id="rId1"/></sheets></workbook>"#
    )
}

/// Worksheet with every cell written as an inline string, so no shared
/// strings part is needed.
fn sheet_xml(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );

    let header_row: Vec<&str> = headers.to_vec();
    let all_rows = std::iter::once(header_row)
        .chain(rows.iter().map(|r| r.iter().map(String::as_str).collect()));

    for (idx, cells) in all_rows.enumerate() {
        let row_number = idx + 1;
        xml.push_str(&format!(r#"<row r="{row_number}">"#));
        for (col, value) in cells.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            xml.push_str(&format!(
                r#"<c r="{}{row_number}" t="inlineStr"><is><t>{}</t></is></c>"#,
                column_letters(col),
                escape_xml(value)
            ));
        }
        xml.push_str("</row>");
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

fn render_xlsx(headers: &[&str], rows: &[Vec<String>]) -> Result<Vec<u8>, CoreError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
        ("_rels/.rels", ROOT_RELS_XML.to_string()),
        ("xl/workbook.xml", workbook_xml()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS_XML.to_string()),
        ("xl/worksheets/sheet1.xml", sheet_xml(headers, rows)),
    ];
    for (name, body) in parts {
        zip.start_file(name, options).map_err(internal)?;
        zip.write_all(body.as_bytes()).map_err(internal)?;
    }

    let cursor = zip.finish().map_err(internal)?;
    Ok(cursor.into_inner())
}

/// Zero-based column index to spreadsheet letters: 0 → A, 25 → Z, 26 → AA.
fn column_letters(mut col: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (col % 26) as u8);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn internal(err: impl std::fmt::Display) -> CoreError {
    CoreError::Internal(format!("Failed to render template: {err}"))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::import::decoder::{decode, FileKind};
    use crate::import::validator::validate_row;

    #[test]
    fn format_parsing() {
        assert_eq!("CSV".parse::<TemplateFormat>().unwrap(), TemplateFormat::Csv);
        assert_eq!("xlsx".parse::<TemplateFormat>().unwrap(), TemplateFormat::Xlsx);
        assert_matches!("pdf".parse::<TemplateFormat>(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn column_letters_wrap() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(27), "AB");
        assert_eq!(column_letters(701), "ZZ");
        assert_eq!(column_letters(702), "AAA");
    }

    #[test]
    fn escape_xml_special_characters() {
        assert_eq!(escape_xml("R&D <\"x\">"), "R&amp;D &lt;&quot;x&quot;&gt;");
    }

    #[test]
    fn csv_template_lists_required_fields_first() {
        let file = render(EntityKind::Lead, TemplateFormat::Csv).unwrap();
        assert_eq!(file.file_name, "leads_template.csv");
        assert_eq!(file.content_type, CSV_CONTENT_TYPE);

        let text = String::from_utf8(file.bytes).unwrap();
        let header = text.lines().next().unwrap();
        assert!(header.starts_with("name,phone,email"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn every_sample_row_passes_validation() {
        for kind in EntityKind::ALL {
            let file = render(kind, TemplateFormat::Csv).unwrap();
            let rows = decode(&file.bytes, FileKind::DelimitedText).unwrap();
            assert_eq!(rows.len(), 2, "{kind}");
            for row in &rows {
                assert!(validate_row(row, kind.schema()).is_valid, "{kind} line {}", row.line);
            }
        }
    }

    #[test]
    fn xlsx_template_round_trips_through_the_decoder() {
        let file = render(EntityKind::Property, TemplateFormat::Xlsx).unwrap();
        assert_eq!(file.file_name, "properties_template.xlsx");
        assert_eq!(file.content_type, XLSX_CONTENT_TYPE);

        let rows = decode(&file.bytes, FileKind::PackedSpreadsheet).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[0].text("property_name").as_deref(), Some("Palm Residency"));
        assert_eq!(rows[0].text("amenities").as_deref(), Some("Swimming Pool, Gym"));
        assert_eq!(rows[1].text("state").as_deref(), Some("Goa"));
        assert!(validate_row(&rows[1], EntityKind::Property.schema()).is_valid);
    }
}

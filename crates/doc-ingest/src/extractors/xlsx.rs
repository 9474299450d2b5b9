//! Spreadsheet (.xlsx) extraction: one chunk per non-empty worksheet

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{Duration, NaiveDate};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::ooxml::OoxmlPackage;
use crate::error::{Error, Result};
use crate::loader::registry::ChunkExtractor;
use crate::loader::text::{confluence_id, file_name, file_stem};
use crate::types::Chunk;

/// Extracts worksheets as JSON record arrays
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxExtractor;

/// A trimmed worksheet: header labels plus data rows of equal width
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl SheetTable {
    /// Build from raw rows; the first row is the header.
    ///
    /// Returns `None` when nothing is left after dropping all-empty rows and columns.
    pub fn from_rows(mut raw: Vec<Vec<Value>>) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        let header = raw.remove(0);
        let width = raw.iter().map(Vec::len).chain([header.len()]).max().unwrap_or(0);

        let columns = column_labels(&header, width);
        let rows: Vec<Vec<Value>> = raw
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .filter(|row| row.iter().any(|v| !v.is_null()))
            .collect();

        let keep: Vec<usize> = (0..width)
            .filter(|&col| rows.iter().any(|row| !row[col].is_null()))
            .collect();
        if rows.is_empty() || keep.is_empty() {
            return None;
        }

        Some(Self {
            columns: keep.iter().map(|&col| columns[col].clone()).collect(),
            rows: rows
                .into_iter()
                .map(|row| keep.iter().map(|&col| row[col].clone()).collect())
                .collect(),
        })
    }

    /// JSON array of row objects keyed by column label, non-ASCII unescaped
    pub fn to_records_json(&self) -> Result<String> {
        let records: Vec<Map<String, Value>> = self
            .rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect();
        Ok(serde_json::to_string(&records)?)
    }
}

/// Header labels: blank cells become `Unnamed: <index>`, repeats get `.1`, `.2` suffixes
fn column_labels(header: &[Value], width: usize) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    (0..width)
        .map(|col| {
            let base = match header.get(col) {
                None | Some(Value::Null) => format!("Unnamed: {}", col),
                Some(Value::String(s)) if s.trim().is_empty() => format!("Unnamed: {}", col),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let label = if *count == 0 {
                base
            } else {
                format!("{}.{}", base, count)
            };
            *count += 1;
            label
        })
        .collect()
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Bool(b) => Value::Bool(*b),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => float_value(*f),
        Data::DateTime(dt) => date_value(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
    }
}

/// Integral floats serialize as integers
fn float_value(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < 9.0e15 {
        Value::from(f as i64)
    } else {
        Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Date cells render as ISO text; a serial outside the calendar keeps its raw number
fn date_value(serial: f64) -> Value {
    excel_serial_to_iso(serial)
        .map(Value::String)
        .unwrap_or_else(|| float_value(serial))
}

/// Excel serial date (1900 system) to `YYYY-MM-DDTHH:MM:SS`
fn excel_serial_to_iso(serial: f64) -> Option<String> {
    if !serial.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    let ts = epoch.checked_add_signed(Duration::try_milliseconds(millis)?)?;
    Some(ts.format("%Y-%m-%dT%H:%M:%S").to_string())
}

fn range_rows(range: &Range<Data>) -> Vec<Vec<Value>> {
    range
        .rows()
        .map(|row| row.iter().map(cell_value).collect())
        .collect()
}

impl XlsxExtractor {
    /// Write every embedded media part beside the workbook as `<stem>_image_<n>.png`.
    ///
    /// Not part of the default extraction path. One failing image does not stop the rest.
    pub fn extract_images(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut package = OoxmlPackage::open(path)?;
        let target_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let stem = file_stem(path);

        let mut media: Vec<String> = package
            .part_names()
            .into_iter()
            .filter(|name| name.starts_with("xl/media/"))
            .collect();
        media.sort();

        let mut written = Vec::new();
        for (index, part) in media.iter().enumerate() {
            let destination = target_dir.join(format!("{}_image_{}.png", stem, index + 1));
            tracing::debug!("Saving image: {}", destination.display());
            let result = package
                .read_bytes(part)
                .and_then(|bytes| fs::write(&destination, bytes).map_err(Error::from));
            match result {
                Ok(()) => written.push(destination),
                Err(e) => tracing::warn!("Failed to extract {} from {}: {}", part, path.display(), e),
            }
        }
        Ok(written)
    }
}

impl ChunkExtractor for XlsxExtractor {
    fn extract(&self, path: &Path) -> Result<Option<Vec<Chunk>>> {
        tracing::info!("Loading xlsx file: {}", path.display());
        let name = file_name(path);
        let mut workbook =
            open_workbook_auto(path).map_err(|e| Error::file_parse(&name, e.to_string()))?;
        let document_id = confluence_id(path);

        let mut chunks = Vec::new();
        for sheet_name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&sheet_name)
                .map_err(|e| Error::file_parse(&name, format!("sheet {}: {}", sheet_name, e)))?;

            let Some(table) = SheetTable::from_rows(range_rows(&range)) else {
                tracing::debug!("Skipping empty sheet {} in {}", sheet_name, name);
                continue;
            };

            let mut chunk = Chunk::generate().with_content(table.to_records_json()?);
            chunk.set("file_name", name.as_str());
            chunk.set("sheet_name", sheet_name.as_str());
            chunk.set("source", name.as_str());
            chunk.set("confluence_id", document_id.as_str());
            chunks.push(chunk);
        }

        Ok(Some(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::ooxml::fixtures::write_package;
    use serde_json::json;
    use tempfile::tempdir;

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

    const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Blank" sheetId="1" r:id="rId1"/><sheet name="Inventory" sheetId="2" r:id="rId2"/></sheets></workbook>"#;

    const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/></Relationships>"#;

    const BLANK_SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData/></worksheet>"#;

    const DATA_SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
<row r="1"><c r="A1" t="inlineStr"><is><t>Item</t></is></c><c r="B1" t="inlineStr"><is><t>Count</t></is></c><c r="C1" t="inlineStr"><is><t>Notes</t></is></c></row>
<row r="2"><c r="A2" t="inlineStr"><is><t>Crème brûlée</t></is></c><c r="B2"><v>3</v></c></row>
<row r="3"></row>
<row r="4"><c r="A4" t="inlineStr"><is><t>Tea</t></is></c><c r="B4"><v>2.5</v></c></row>
</sheetData></worksheet>"#;

    fn write_workbook(path: &Path, extra: &[(&str, &[u8])]) {
        let mut parts: Vec<(&str, &[u8])> = vec![
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
            ("_rels/.rels", ROOT_RELS.as_bytes()),
            ("xl/workbook.xml", WORKBOOK.as_bytes()),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes()),
            ("xl/worksheets/sheet1.xml", BLANK_SHEET.as_bytes()),
            ("xl/worksheets/sheet2.xml", DATA_SHEET.as_bytes()),
        ];
        parts.extend_from_slice(extra);
        write_package(path, &parts);
    }

    #[test]
    fn test_column_labels() {
        let header = vec![json!("a"), Value::Null, json!("a"), json!(" "), json!(2020), json!("a")];
        assert_eq!(
            column_labels(&header, 7),
            vec!["a", "Unnamed: 1", "a.1", "Unnamed: 3", "2020", "a.2", "Unnamed: 6"]
        );
    }

    #[test]
    fn test_sheet_table_drops_empty_rows_and_columns() {
        let raw = vec![
            vec![json!("name"), json!("empty"), Value::Null],
            vec![json!("x"), Value::Null, json!(1)],
            vec![Value::Null, Value::Null, Value::Null],
            vec![json!("y")],
        ];
        let table = SheetTable::from_rows(raw).unwrap();
        assert_eq!(table.columns, vec!["name", "Unnamed: 2"]);
        assert_eq!(table.rows, vec![vec![json!("x"), json!(1)], vec![json!("y"), Value::Null]]);
        assert_eq!(
            table.to_records_json().unwrap(),
            r#"[{"name":"x","Unnamed: 2":1},{"name":"y","Unnamed: 2":null}]"#
        );
    }

    #[test]
    fn test_header_only_sheet_is_empty() {
        assert!(SheetTable::from_rows(vec![vec![json!("a"), json!("b")]]).is_none());
        assert!(SheetTable::from_rows(Vec::new()).is_none());
    }

    #[test]
    fn test_cell_values() {
        assert_eq!(float_value(3.0), json!(3));
        assert_eq!(float_value(2.5), json!(2.5));
        assert_eq!(cell_value(&Data::Empty), Value::Null);
        assert_eq!(excel_serial_to_iso(45232.5).unwrap(), "2023-11-02T12:00:00");
    }

    #[test]
    fn test_corrupt_date_serial_keeps_raw_value() {
        assert_eq!(excel_serial_to_iso(1.0e300), None);
        assert_eq!(excel_serial_to_iso(-1.0e17), None);
        assert_eq!(excel_serial_to_iso(f64::NAN), None);
        assert_eq!(date_value(1.0e300), json!(1.0e300));
        assert_eq!(date_value(f64::INFINITY), Value::Null);
        assert_eq!(date_value(45232.0), json!("2023-11-02T00:00:00"));
    }

    #[test]
    fn test_extract_skips_empty_sheet() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stock.xlsx");
        write_workbook(&path, &[]);

        let chunks = XlsxExtractor.extract(&path).unwrap().unwrap();
        assert_eq!(chunks.len(), 1);

        let chunk = &chunks[0];
        assert_eq!(chunk.get("sheet_name").unwrap().to_string(), "Inventory");
        assert_eq!(chunk.get("file_name").unwrap().to_string(), "stock.xlsx");
        assert_eq!(chunk.source(), "stock.xlsx");
        assert_eq!(
            chunk.content,
            r#"[{"Item":"Crème brûlée","Count":3},{"Item":"Tea","Count":2.5}]"#
        );
    }

    #[test]
    fn test_extract_images() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("charts.xlsx");
        write_workbook(
            &path,
            &[("xl/media/image2.png", b"second"), ("xl/media/image1.png", b"first")],
        );

        let written = XlsxExtractor.extract_images(&path).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(fs::read(dir.path().join("charts_image_1.png")).unwrap(), b"first");
        assert_eq!(fs::read(dir.path().join("charts_image_2.png")).unwrap(), b"second");
    }

    #[test]
    fn test_not_a_workbook() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        fs::write(&path, b"not a zip").unwrap();
        assert!(XlsxExtractor.extract(&path).is_err());
    }
}

//! Spreadsheet reader: workbook bytes in, ordered sheets of header-keyed rows out.

use indexmap::IndexMap;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};
use umya_spreadsheet::reader::xlsx;
use umya_spreadsheet::{Spreadsheet, Worksheet};

use crate::error::{ImportError, ImportResult};
use crate::model::SheetKind;

/// Row number of the header line; data starts on the next row.
pub const HEADER_ROW: u32 = 1;

/// Literal the COBie templates use for "not applicable".
pub const NOT_APPLICABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Integer(i64),
    Number(f64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Integer(value) => write!(f, "{value}"),
            CellValue::Number(value) => write!(f, "{value}"),
            CellValue::Bool(value) => write!(f, "{value}"),
            CellValue::Text(value) => f.write_str(value),
        }
    }
}

/// Interprets raw cell text. Blank text is `None`.
pub fn cell_to_value(raw: &str) -> Option<CellValue> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(integer) = trimmed.parse::<i64>() {
        return Some(CellValue::Integer(integer));
    }
    if let Ok(number) = trimmed.parse::<f64>()
        && number.is_finite()
    {
        return Some(CellValue::Number(number));
    }

    let lower = trimmed.to_ascii_lowercase();
    if lower == "true" {
        return Some(CellValue::Bool(true));
    }
    if lower == "false" {
        return Some(CellValue::Bool(false));
    }

    Some(CellValue::Text(raw.to_string()))
}

/// One data row. `number` is the worksheet row the values came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub number: u32,
    pub cells: IndexMap<String, Option<String>>,
}

impl Row {
    /// Raw text of `column`, `None` when blank or the column does not exist.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).and_then(|value| value.as_deref())
    }

    pub fn value(&self, column: &str) -> Option<CellValue> {
        self.get(column).and_then(cell_to_value)
    }

    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column).map(str::to_string)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Sheet {
    /// 1-based worksheet column of `header`.
    pub fn column_index(&self, header: &str) -> Option<u32> {
        self.headers
            .iter()
            .position(|candidate| candidate == header)
            .map(|idx| idx as u32 + 1)
    }

    pub fn column_or(&self, header: &str, fallback: u32) -> u32 {
        self.column_index(header).unwrap_or(fallback)
    }

    pub fn values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = (&'a Row, Option<&'a str>)> {
        self.rows.iter().map(move |row| (row, row.get(column)))
    }
}

/// Table of tables keyed by sheet name, in workbook order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    sheets: IndexMap<String, Sheet>,
}

impl Document {
    pub fn from_sheets(sheets: impl IntoIterator<Item = Sheet>) -> Self {
        let sheets = sheets
            .into_iter()
            .map(|sheet| (sheet.name.clone(), sheet))
            .collect();
        Self { sheets }
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.get(name)
    }

    pub fn kind(&self, kind: SheetKind) -> Option<&Sheet> {
        self.sheet(kind.sheet_name())
    }

    pub fn require(&self, kind: SheetKind) -> ImportResult<&Sheet> {
        self.kind(kind)
            .ok_or(ImportError::IncompleteDocument(kind))
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(String::as_str)
    }

    pub fn missing_sheets(&self) -> Vec<SheetKind> {
        SheetKind::EXPECTED
            .into_iter()
            .filter(|kind| self.kind(*kind).is_none())
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.sheets.values().map(|sheet| sheet.rows.len()).sum()
    }
}

/// Parses workbook bytes. Any failure here means the bytes are not a workbook.
///
/// umya panics on some archives whose parts are not well-formed XML; those
/// panics are caught and reported as malformed input.
pub fn load_workbook(bytes: &[u8]) -> ImportResult<Spreadsheet> {
    match panic::catch_unwind(AssertUnwindSafe(|| {
        xlsx::read_reader(Cursor::new(bytes), true)
    })) {
        Ok(result) => result.map_err(|err| ImportError::MalformedDocument(err.to_string())),
        Err(payload) => {
            let reason = panic_message(&*payload);
            tracing::warn!(%reason, "workbook parser panicked");
            Err(ImportError::MalformedDocument(reason))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "workbook parser panicked".to_string()
    }
}

/// Reads every worksheet of `bytes` into rows.
pub fn read_document(bytes: &[u8]) -> ImportResult<Document> {
    let book = load_workbook(bytes)?;
    Ok(document_from_book(&book))
}

pub fn document_from_book(book: &Spreadsheet) -> Document {
    let document = Document::from_sheets(book.get_sheet_collection().iter().map(read_sheet));
    tracing::debug!(
        sheets = document.sheets.len(),
        rows = document.row_count(),
        "workbook read"
    );
    document
}

fn read_sheet(sheet: &Worksheet) -> Sheet {
    let (max_col, max_row) = sheet.get_highest_column_and_row();

    let headers: Vec<String> = (1..=max_col)
        .map(|col| cell_text(sheet, col, HEADER_ROW).unwrap_or_default())
        .collect();

    let mut rows = Vec::new();
    for row_number in (HEADER_ROW + 1)..=max_row {
        let mut cells = IndexMap::with_capacity(headers.len());
        let mut any_value = false;
        for (idx, header) in headers.iter().enumerate() {
            if header.is_empty() || cells.contains_key(header) {
                continue;
            }
            let value = cell_text(sheet, idx as u32 + 1, row_number);
            any_value |= value.is_some();
            cells.insert(header.clone(), value);
        }
        if any_value {
            rows.push(Row {
                number: row_number,
                cells,
            });
        }
    }

    Sheet {
        name: sheet.get_name().to_string(),
        headers,
        rows,
    }
}

fn cell_text(sheet: &Worksheet, col: u32, row: u32) -> Option<String> {
    let cell = sheet.get_cell((col, row))?;
    let raw = cell.get_value();
    if raw.trim().is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(number: u32, cells: &[(&str, Option<&str>)]) -> Row {
        Row {
            number,
            cells: cells
                .iter()
                .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
                .collect(),
        }
    }

    #[test]
    fn cell_values_are_typed() {
        assert_eq!(cell_to_value("  "), None);
        assert_eq!(cell_to_value("12"), Some(CellValue::Integer(12)));
        assert_eq!(cell_to_value("3.5"), Some(CellValue::Number(3.5)));
        assert_eq!(cell_to_value("TRUE"), Some(CellValue::Bool(true)));
        assert_eq!(
            cell_to_value("Office"),
            Some(CellValue::Text("Office".to_string()))
        );
        assert_eq!(cell_to_value("inf"), Some(CellValue::Text("inf".to_string())));
    }

    #[test]
    fn row_lookup_treats_missing_columns_as_blank() {
        let row = row(2, &[("Name", Some("L1")), ("Description", None)]);
        assert_eq!(row.get("Name"), Some("L1"));
        assert_eq!(row.get("Description"), None);
        assert_eq!(row.get("Elevation"), None);
    }

    #[test]
    fn column_index_is_one_based() {
        let sheet = Sheet {
            name: "Space".to_string(),
            headers: vec!["Name".into(), "CreatedBy".into(), "FloorName".into()],
            rows: vec![],
        };
        assert_eq!(sheet.column_index("Name"), Some(1));
        assert_eq!(sheet.column_index("FloorName"), Some(3));
        assert_eq!(sheet.column_or("Category", 4), 4);
    }

    #[test]
    fn garbage_bytes_are_malformed() {
        let err = read_document(b"definitely not a zip archive").unwrap_err();
        assert!(matches!(err, ImportError::MalformedDocument(_)));
    }
}

//! Red-fill highlighting of violating cells for the spreadsheet author.
//!
//! Always works on a freshly parsed workbook owned by this module, so the
//! caller's bytes are never touched.

use std::io::Cursor;
use umya_spreadsheet::{PatternValues, Spreadsheet};

use super::CellRef;
use crate::error::{ImportError, ImportResult};
use crate::workbook::load_workbook;

pub const HIGHLIGHT_ARGB: &str = "FFFF0000";

/// Returns a copy of `bytes` with every addressable cell in `cells` filled red.
pub fn annotate<'a>(
    bytes: &[u8],
    cells: impl IntoIterator<Item = &'a CellRef>,
) -> ImportResult<Vec<u8>> {
    let mut book = load_workbook(bytes)?;
    highlight(&mut book, cells);
    write_workbook(&book)
}

/// Fills each referenced cell. References without a row/column or pointing at
/// a sheet that does not exist are skipped. Returns the number of cells filled.
pub fn highlight<'a>(book: &mut Spreadsheet, cells: impl IntoIterator<Item = &'a CellRef>) -> usize {
    let mut filled = 0;
    for cell in cells {
        let (Some(row), Some(column)) = (cell.row, cell.column) else {
            continue;
        };
        let Some(sheet) = book.get_sheet_by_name_mut(&cell.sheet) else {
            tracing::debug!(sheet = %cell.sheet, "skipping highlight on absent sheet");
            continue;
        };
        sheet
            .get_style_mut((column, row))
            .get_fill_mut()
            .get_pattern_fill_mut()
            .set_pattern_type(PatternValues::Solid)
            .get_foreground_color_mut()
            .set_argb(HIGHLIGHT_ARGB);
        filled += 1;
    }
    filled
}

pub fn write_workbook(book: &Spreadsheet) -> ImportResult<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(book, &mut cursor)
        .map_err(|err| ImportError::SerializationFailure(format!("workbook write failed: {err}")))?;
    Ok(cursor.into_inner())
}

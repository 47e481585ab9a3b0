#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};
use umya_spreadsheet::{self, Spreadsheet};
use zip::ZipWriter;
use zip::write::FileOptions;

pub const FACILITY_URI: &str = "https://example.com/hq";

/// Standard COBie header rows for the sheets the importer reads.
pub fn standard_headers(sheet: &str) -> &'static [&'static str] {
    match sheet {
        "Facility" => &[
            "Name",
            "CreatedBy",
            "CreatedOn",
            "Category",
            "ProjectName",
            "SiteName",
            "Description",
            "Address",
        ],
        "Floor" => &[
            "Name",
            "CreatedBy",
            "CreatedOn",
            "Category",
            "ExtSystem",
            "ExtObject",
            "ExtIdentifier",
            "Description",
            "Elevation",
            "Height",
        ],
        "Space" => &[
            "Name",
            "CreatedBy",
            "CreatedOn",
            "Category",
            "FloorName",
            "Description",
            "ExtSystem",
            "ExtObject",
            "ExtIdentifier",
            "RoomTag",
            "UsableHeight",
            "GrossArea",
            "NetArea",
        ],
        "Type" => &[
            "Name",
            "CreatedBy",
            "CreatedOn",
            "Category",
            "Description",
            "AssetType",
            "Manufacturer",
            "ModelNumber",
            "ExtIdentifier",
        ],
        "Component" => &[
            "Name",
            "CreatedBy",
            "CreatedOn",
            "TypeName",
            "Space",
            "Description",
            "ExtSystem",
            "ExtObject",
            "ExtIdentifier",
            "SerialNumber",
        ],
        "Attribute" => &[
            "Name",
            "CreatedBy",
            "CreatedOn",
            "Category",
            "SheetName",
            "RowName",
            "Value",
            "Unit",
        ],
        "System" => &[
            "Name",
            "CreatedBy",
            "CreatedOn",
            "Category",
            "ComponentNames",
            "ExtSystem",
            "ExtObject",
            "ExtIdentifier",
            "Description",
        ],
        _ => &["Name"],
    }
}

#[derive(Debug, Clone)]
pub struct FixtureSheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<(String, String)>>,
}

/// In-memory description of a COBie workbook, written out with umya.
#[derive(Debug, Clone, Default)]
pub struct CobieFixture {
    sheets: Vec<FixtureSheet>,
}

impl CobieFixture {
    /// All seven sheets with standard headers and no data rows.
    pub fn empty() -> Self {
        let sheets = [
            "Facility",
            "Floor",
            "Space",
            "Type",
            "Component",
            "Attribute",
            "System",
        ]
        .into_iter()
        .map(|name| FixtureSheet {
            name: name.to_string(),
            headers: standard_headers(name).iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        })
        .collect();
        Self { sheets }
    }

    /// One Facility, Floor `L1`, Space `101` on `L1`, Type `T1` (Office),
    /// Component `C1` of `T1` in `101`, System `S1` containing `C1`.
    pub fn minimal() -> Self {
        Self::empty()
            .row("Facility", &[("Name", "HQ"), ("Category", "Office Building")])
            .row("Floor", &[("Name", "L1"), ("Elevation", "0")])
            .row("Space", &[("Name", "101"), ("FloorName", "L1")])
            .row("Type", &[("Name", "T1"), ("Category", "Office")])
            .row(
                "Component",
                &[("Name", "C1"), ("TypeName", "T1"), ("Space", "101")],
            )
            .row("System", &[("Name", "S1"), ("ComponentNames", "C1")])
    }

    pub fn row(mut self, sheet: &str, values: &[(&str, &str)]) -> Self {
        let sheet = self.sheet_mut(sheet);
        sheet.rows.push(
            values
                .iter()
                .map(|(header, value)| (header.to_string(), value.to_string()))
                .collect(),
        );
        self
    }

    pub fn without_sheet(mut self, name: &str) -> Self {
        self.sheets.retain(|sheet| sheet.name != name);
        self
    }

    pub fn without_column(mut self, sheet: &str, header: &str) -> Self {
        let sheet = self.sheet_mut(sheet);
        sheet.headers.retain(|h| h != header);
        self
    }

    fn sheet_mut(&mut self, name: &str) -> &mut FixtureSheet {
        let idx = self
            .sheets
            .iter()
            .position(|sheet| sheet.name == name)
            .unwrap_or_else(|| panic!("fixture has no sheet {name}"));
        &mut self.sheets[idx]
    }

    pub fn book(&self) -> Spreadsheet {
        let mut book = umya_spreadsheet::new_file_empty_worksheet();
        for fixture in &self.sheets {
            let sheet = book.new_sheet(&fixture.name).expect("new sheet");
            for (idx, header) in fixture.headers.iter().enumerate() {
                sheet
                    .get_cell_mut((idx as u32 + 1, 1))
                    .set_value(header.clone());
            }
            for (row_idx, row) in fixture.rows.iter().enumerate() {
                for (header, value) in row {
                    let Some(col) = fixture.headers.iter().position(|h| h == header) else {
                        continue;
                    };
                    sheet
                        .get_cell_mut((col as u32 + 1, row_idx as u32 + 2))
                        .set_value(value.clone());
                }
            }
        }
        book
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        umya_spreadsheet::writer::xlsx::write_writer(&self.book(), &mut cursor)
            .expect("write workbook");
        cursor.into_inner()
    }

    pub fn write_to(&self, path: &Path) -> PathBuf {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create dir");
        }
        std::fs::write(path, self.to_bytes()).expect("write workbook");
        path.to_path_buf()
    }
}

/// A well-formed zip archive whose workbook parts are not XML.
pub fn zip_with_garbage_parts() -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut cursor);
        for (name, content) in [
            ("[Content_Types].xml", "<Types><garbage"),
            ("xl/workbook.xml", "not xml at all"),
        ] {
            zip.start_file(name, FileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    cursor.into_inner()
}

/// Reads back the fill colour of a cell in a workbook produced by the validator.
pub fn fill_argb(bytes: &[u8], sheet: &str, column: u32, row: u32) -> Option<String> {
    let book = umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(bytes), true)
        .expect("read workbook");
    let sheet = book.get_sheet_by_name(sheet)?;
    let style = sheet.get_cell((column, row))?.get_style();
    let argb = style
        .get_fill()?
        .get_pattern_fill()?
        .get_foreground_color()?
        .get_argb()
        .to_string();
    Some(argb)
}

pub struct TestWorkspace {
    _tempdir: TempDir,
    root: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let tempdir = tempdir().expect("tempdir");
        let root = tempdir.path().to_path_buf();
        Self {
            _tempdir: tempdir,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn create_workbook(&self, name: &str, fixture: &CobieFixture) -> PathBuf {
        fixture.write_to(&self.path(name))
    }
}

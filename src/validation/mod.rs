//! Structural and referential validation of COBie workbooks.
//!
//! Every check runs independently and reports every offending cell; nothing here
//! stops at the first problem. The only exception is sheet presence: when an
//! expected sheet is missing the remaining checks have nothing to look at, so
//! the report contains that category alone.
//!
//! ```text
//! bytes ─► load_workbook ─► Document ─► checks::run_all ─► ValidationReport
//!              │                                               │
//!              └──── owned copy ──► annotate::highlight ◄──────┘ ─► annotated bytes
//! ```

pub mod annotate;
pub mod checks;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::collections::BTreeMap;
use std::fmt;
use strum::{Display, EnumString, IntoStaticStr};
use umya_spreadsheet::Spreadsheet;

use crate::error::ImportResult;
use crate::utils::cell_address;
use crate::workbook::{Document, document_from_book, load_workbook};

/// Kind of problem found in the workbook. Serialized as the human-readable
/// message so reports can be shown to spreadsheet authors as-is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, IntoStaticStr,
)]
pub enum ViolationCategory {
    #[strum(serialize = "Expected sheet not found in spreadsheet.")]
    SheetNotFound,
    #[strum(serialize = "Facility sheet must contain exactly one record.")]
    FacilityRecordCount,
    #[strum(serialize = "Empty or N/A cells found in column A of sheet.")]
    EmptyName,
    #[strum(serialize = "Duplicate names found in column A of sheet.")]
    DuplicateName,
    #[strum(serialize = "Space is not linked to a value in the first column of the Floor tab.")]
    SpaceWithoutFloor,
    #[strum(serialize = "Not every Type record has a category.")]
    TypeWithoutCategory,
    #[strum(serialize = "Component is not linked to an existing Type.")]
    ComponentWithoutType,
    #[strum(serialize = "Component is not linked to an existing Space.")]
    ComponentWithoutSpace,
    #[strum(serialize = "System is not linked to an existing Component.")]
    SystemWithoutComponent,
}

impl ViolationCategory {
    pub fn message(&self) -> &'static str {
        self.into()
    }
}

impl Serialize for ViolationCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.message())
    }
}

impl<'de> Deserialize<'de> for ViolationCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let message = String::deserialize(deserializer)?;
        message
            .parse()
            .map_err(|_| de::Error::custom(format!("unknown violation category {message:?}")))
    }
}

/// Location of a violation. Row and column are 1-based worksheet coordinates
/// (the header is row 1). A missing sheet has neither.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub sheet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl CellRef {
    pub fn cell(sheet: impl Into<String>, row: u32, column: u32) -> Self {
        Self {
            sheet: sheet.into(),
            row: Some(row),
            column: Some(column),
        }
    }

    pub fn sheet(sheet: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            row: None,
            column: None,
        }
    }

    /// `Sheet!A1` style address when the reference points at a cell.
    pub fn address(&self) -> Option<String> {
        match (self.row, self.column) {
            (Some(row), Some(column)) => Some(format!(
                "{}!{}",
                self.sheet,
                cell_address(column, row)
            )),
            _ => None,
        }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.address() {
            Some(address) => f.write_str(&address),
            None => f.write_str(&self.sheet),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub category: ViolationCategory,
    pub cell: CellRef,
}

impl Violation {
    pub fn new(category: ViolationCategory, cell: CellRef) -> Self {
        Self { category, cell }
    }
}

/// Violations grouped by category. Only categories with at least one
/// violation are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationReport {
    categories: BTreeMap<ViolationCategory, Vec<CellRef>>,
}

impl ValidationReport {
    pub fn from_violations(violations: impl IntoIterator<Item = Violation>) -> Self {
        let mut categories: BTreeMap<ViolationCategory, Vec<CellRef>> = BTreeMap::new();
        for violation in violations {
            categories
                .entry(violation.category)
                .or_default()
                .push(violation.cell);
        }
        Self { categories }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Total number of violations across categories.
    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn get(&self, category: ViolationCategory) -> &[CellRef] {
        self.categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn categories(&self) -> impl Iterator<Item = ViolationCategory> + '_ {
        self.categories.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ViolationCategory, &CellRef)> {
        self.categories
            .iter()
            .flat_map(|(category, cells)| cells.iter().map(move |cell| (*category, cell)))
    }

    pub fn cells(&self) -> impl Iterator<Item = &CellRef> {
        self.categories.values().flatten()
    }
}

/// Result of validating a workbook.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub has_errors: bool,
    pub report: ValidationReport,
    /// Copy of the input with every violating cell filled red. Identical to the
    /// input bytes when there is nothing to highlight.
    pub annotated: Vec<u8>,
}

/// Runs every check over already-parsed rows.
pub fn validate_document(document: &Document) -> ValidationReport {
    ValidationReport::from_violations(checks::run_all(document))
}

/// Validates raw workbook bytes. Fails only when the bytes are not a workbook;
/// everything else ends up in the report.
pub fn validate(bytes: &[u8]) -> ImportResult<ValidationOutcome> {
    let book = load_workbook(bytes)?;
    let document = document_from_book(&book);
    validate_parsed(bytes, book, &document)
}

/// Same as [`validate`] for callers that already parsed `bytes` into `book`
/// and `document`. `book` is consumed as the annotation scratch copy.
pub fn validate_parsed(
    bytes: &[u8],
    mut book: Spreadsheet,
    document: &Document,
) -> ImportResult<ValidationOutcome> {
    let report = validate_document(document);

    for category in report.categories() {
        tracing::debug!(
            category = %category,
            count = report.get(category).len(),
            "validation category failed"
        );
    }

    let highlighted = if report.is_empty() {
        0
    } else {
        annotate::highlight(&mut book, report.cells())
    };
    let annotated = if highlighted == 0 {
        bytes.to_vec()
    } else {
        annotate::write_workbook(&book)?
    };

    tracing::info!(
        has_errors = !report.is_empty(),
        violations = report.len(),
        highlighted,
        "spreadsheet validated"
    );

    Ok(ValidationOutcome {
        has_errors: !report.is_empty(),
        report,
        annotated,
    })
}

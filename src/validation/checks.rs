//! The individual workbook checks. Each is a pure function of the parsed
//! document returning every violation it finds.

use std::collections::HashSet;

use super::{CellRef, Violation, ViolationCategory};
use crate::model::SheetKind;
use crate::workbook::{Document, NOT_APPLICABLE, Sheet};

pub const NAME: &str = "Name";
pub const FLOOR_NAME: &str = "FloorName";
pub const CATEGORY: &str = "Category";
pub const TYPE_NAME: &str = "TypeName";
pub const SPACE: &str = "Space";
pub const COMPONENT_NAMES: &str = "ComponentNames";

// Standard COBie column positions, used when a header is absent.
const NAME_COLUMN: u32 = 1;
const SPACE_FLOOR_COLUMN: u32 = 5;
const TYPE_CATEGORY_COLUMN: u32 = 4;
const COMPONENT_TYPE_COLUMN: u32 = 4;
const COMPONENT_SPACE_COLUMN: u32 = 5;
const SYSTEM_COMPONENT_COLUMN: u32 = 5;

/// Sheets whose names must be unique.
const UNIQUE_NAME_SHEETS: [SheetKind; 4] = [
    SheetKind::Floor,
    SheetKind::Space,
    SheetKind::Type,
    SheetKind::Component,
];

type Check = fn(&Document) -> Vec<Violation>;

/// Checks that need every expected sheet to be present.
const CHECKS: [Check; 8] = [
    facility_record_count,
    empty_names,
    duplicate_names,
    space_floor_links,
    type_categories,
    component_type_links,
    component_space_links,
    system_component_links,
];

/// Runs sheet presence first; if anything is missing, that is the only result.
pub fn run_all(document: &Document) -> Vec<Violation> {
    let missing = sheet_presence(document);
    if !missing.is_empty() {
        return missing;
    }
    CHECKS.iter().flat_map(|check| check(document)).collect()
}

pub fn sheet_presence(document: &Document) -> Vec<Violation> {
    document
        .missing_sheets()
        .into_iter()
        .map(|kind| {
            Violation::new(
                ViolationCategory::SheetNotFound,
                CellRef::sheet(kind.sheet_name()),
            )
        })
        .collect()
}

pub fn facility_record_count(document: &Document) -> Vec<Violation> {
    let Some(facility) = document.kind(SheetKind::Facility) else {
        return Vec::new();
    };
    if facility.rows.len() == 1 {
        return Vec::new();
    }
    vec![Violation::new(
        ViolationCategory::FacilityRecordCount,
        CellRef::cell(&facility.name, 1, NAME_COLUMN),
    )]
}

pub fn empty_names(document: &Document) -> Vec<Violation> {
    SheetKind::EXPECTED
        .into_iter()
        .filter_map(|kind| document.kind(kind))
        .flat_map(|sheet| {
            let column = sheet.column_or(NAME, NAME_COLUMN);
            sheet
                .values(NAME)
                .filter(|(_, name)| is_blank_name(*name))
                .map(move |(row, _)| {
                    Violation::new(
                        ViolationCategory::EmptyName,
                        CellRef::cell(&sheet.name, row.number, column),
                    )
                })
        })
        .collect()
}

/// Reports every repeat after the first occurrence of a name.
pub fn duplicate_names(document: &Document) -> Vec<Violation> {
    let mut violations = Vec::new();
    for sheet in UNIQUE_NAME_SHEETS
        .into_iter()
        .filter_map(|kind| document.kind(kind))
    {
        let column = sheet.column_or(NAME, NAME_COLUMN);
        let mut seen = HashSet::new();
        for (row, name) in sheet.values(NAME) {
            let Some(name) = name else { continue };
            if !seen.insert(name) {
                violations.push(Violation::new(
                    ViolationCategory::DuplicateName,
                    CellRef::cell(&sheet.name, row.number, column),
                ));
            }
        }
    }
    violations
}

pub fn space_floor_links(document: &Document) -> Vec<Violation> {
    unresolved_links(
        document,
        SheetKind::Space,
        FLOOR_NAME,
        SPACE_FLOOR_COLUMN,
        SheetKind::Floor,
        ViolationCategory::SpaceWithoutFloor,
    )
}

pub fn type_categories(document: &Document) -> Vec<Violation> {
    let Some(types) = document.kind(SheetKind::Type) else {
        return Vec::new();
    };
    let column = types.column_or(CATEGORY, TYPE_CATEGORY_COLUMN);
    types
        .values(CATEGORY)
        .filter(|(_, category)| category.is_none())
        .map(|(row, _)| {
            Violation::new(
                ViolationCategory::TypeWithoutCategory,
                CellRef::cell(&types.name, row.number, column),
            )
        })
        .collect()
}

pub fn component_type_links(document: &Document) -> Vec<Violation> {
    unresolved_links(
        document,
        SheetKind::Component,
        TYPE_NAME,
        COMPONENT_TYPE_COLUMN,
        SheetKind::Type,
        ViolationCategory::ComponentWithoutType,
    )
}

/// The `Space` cell may list several spaces separated by commas; each one must
/// exist. A blank cell is itself a violation. One violation per row at most.
pub fn component_space_links(document: &Document) -> Vec<Violation> {
    let (Some(components), Some(spaces)) = (
        document.kind(SheetKind::Component),
        document.kind(SheetKind::Space),
    ) else {
        return Vec::new();
    };
    let known = names(spaces);
    let column = components.column_or(SPACE, COMPONENT_SPACE_COLUMN);

    components
        .values(SPACE)
        .filter(|(_, listed)| match listed {
            None => true,
            Some(listed) => split_list(listed).any(|space| !known.contains(space)),
        })
        .map(|(row, _)| {
            Violation::new(
                ViolationCategory::ComponentWithoutSpace,
                CellRef::cell(&components.name, row.number, column),
            )
        })
        .collect()
}

pub fn system_component_links(document: &Document) -> Vec<Violation> {
    unresolved_links(
        document,
        SheetKind::System,
        COMPONENT_NAMES,
        SYSTEM_COMPONENT_COLUMN,
        SheetKind::Component,
        ViolationCategory::SystemWithoutComponent,
    )
}

/// Splits a comma-separated cell into trimmed tokens.
pub fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim)
}

fn is_blank_name(name: Option<&str>) -> bool {
    match name {
        None => true,
        Some(name) => name.trim().is_empty() || name.trim() == NOT_APPLICABLE,
    }
}

fn names(sheet: &Sheet) -> HashSet<&str> {
    sheet.values(NAME).filter_map(|(_, name)| name).collect()
}

/// Rows of `source` whose `column` value is not a Name in `target`. Blank
/// values never resolve.
fn unresolved_links(
    document: &Document,
    source: SheetKind,
    column: &str,
    fallback_column: u32,
    target: SheetKind,
    category: ViolationCategory,
) -> Vec<Violation> {
    let (Some(source), Some(target)) = (document.kind(source), document.kind(target)) else {
        return Vec::new();
    };
    let known = names(target);
    let column_index = source.column_or(column, fallback_column);

    source
        .values(column)
        .filter(|(_, value)| !value.is_some_and(|value| known.contains(value)))
        .map(|(row, _)| Violation::new(category, CellRef::cell(&source.name, row.number, column_index)))
        .collect()
}

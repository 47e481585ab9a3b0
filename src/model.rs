//! Typed entities compiled from COBie rows.
//!
//! Entities are immutable once built. References between them are shared
//! (`Arc`) so a Space carries its Floor, a Component its Type and Space, and a
//! System its Components, without copying and without dangling name lookups.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString, IntoStaticStr};

use crate::workbook::CellValue;

/// Worksheets of a COBie exchange that this crate understands.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
pub enum SheetKind {
    Facility,
    Floor,
    Space,
    Type,
    Component,
    Attribute,
    System,
}

impl SheetKind {
    /// Sheets every document must contain, in workbook order.
    pub const EXPECTED: [SheetKind; 7] = [
        SheetKind::Facility,
        SheetKind::Floor,
        SheetKind::Space,
        SheetKind::Type,
        SheetKind::Component,
        SheetKind::Attribute,
        SheetKind::System,
    ];

    pub fn sheet_name(&self) -> &'static str {
        self.into()
    }

    /// Lowercase segment used inside entity URIs (`{facility}/{segment}/{name}`).
    pub fn uri_segment(&self) -> &'static str {
        match self {
            SheetKind::Facility => "facility",
            SheetKind::Floor => "floor",
            SheetKind::Space => "space",
            SheetKind::Type => "type",
            SheetKind::Component => "component",
            SheetKind::Attribute => "attribute",
            SheetKind::System => "system",
        }
    }

    /// Case-insensitive lookup used for the free-text `SheetName` column.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        SheetKind::EXPECTED
            .into_iter()
            .find(|kind| kind.sheet_name().eq_ignore_ascii_case(label))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Facility {
    pub uri: String,
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<CellValue>,
    pub longitude: Option<CellValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Floor {
    pub uri: String,
    pub name: String,
    pub description: Option<String>,
    pub elevation: Option<CellValue>,
    pub height: Option<CellValue>,
}

/// Which vocabulary a category label belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryScheme {
    Space,
    Product,
}

impl CategoryScheme {
    pub fn path(&self) -> &'static str {
        match self {
            CategoryScheme::Space => "categorySpace",
            CategoryScheme::Product => "categoryProduct",
        }
    }
}

/// Free-text classification label. Built fresh for every owning row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub uri: String,
    pub scheme: CategoryScheme,
    pub has_string_value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Space {
    pub uri: String,
    pub name: String,
    pub description: Option<String>,
    pub ext_identifier: Option<String>,
    pub gross_area: Option<CellValue>,
    pub net_area: Option<CellValue>,
    pub floor: Arc<Floor>,
    pub category: Option<Category>,
}

/// Row of the Type sheet (a product or equipment type).
#[derive(Debug, Clone, PartialEq)]
pub struct AssetType {
    pub uri: String,
    pub name: String,
    pub description: Option<String>,
    pub model_number: Option<String>,
    pub ext_identifier: Option<String>,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub uri: String,
    pub name: String,
    pub description: Option<String>,
    pub ext_identifier: Option<String>,
    pub serial_number: Option<String>,
    pub asset_type: Arc<AssetType>,
    /// Only the first space listed in the row is attached.
    pub space: Option<Arc<Space>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct System {
    pub uri: String,
    pub name: String,
    pub description: Option<String>,
    pub components: Vec<Arc<Component>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub uri: String,
    pub name: String,
    pub value: Option<CellValue>,
    pub unit: Option<String>,
    pub target_kind: SheetKind,
    pub target_uri: String,
}

/// Fully resolved result of one import run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityGraph {
    pub facility: Option<Facility>,
    pub floors: Vec<Arc<Floor>>,
    pub spaces: Vec<Arc<Space>>,
    pub types: Vec<Arc<AssetType>>,
    pub components: Vec<Arc<Component>>,
    pub systems: Vec<System>,
    pub attributes: Vec<Attribute>,
}

/// Borrowed view over one entity, one variant per sheet kind.
#[derive(Debug, Clone, Copy)]
pub enum EntityRef<'a> {
    Facility(&'a Facility),
    Floor(&'a Floor),
    Space(&'a Space),
    Type(&'a AssetType),
    Component(&'a Component),
    System(&'a System),
    Attribute(&'a Attribute),
}

impl EntityRef<'_> {
    pub fn kind(&self) -> SheetKind {
        match self {
            EntityRef::Facility(_) => SheetKind::Facility,
            EntityRef::Floor(_) => SheetKind::Floor,
            EntityRef::Space(_) => SheetKind::Space,
            EntityRef::Type(_) => SheetKind::Type,
            EntityRef::Component(_) => SheetKind::Component,
            EntityRef::System(_) => SheetKind::System,
            EntityRef::Attribute(_) => SheetKind::Attribute,
        }
    }

    pub fn uri(&self) -> &str {
        match self {
            EntityRef::Facility(e) => &e.uri,
            EntityRef::Floor(e) => &e.uri,
            EntityRef::Space(e) => &e.uri,
            EntityRef::Type(e) => &e.uri,
            EntityRef::Component(e) => &e.uri,
            EntityRef::System(e) => &e.uri,
            EntityRef::Attribute(e) => &e.uri,
        }
    }
}

impl EntityGraph {
    /// Every entity in compile order: Facility, Floor, Space, Type, Component,
    /// System, Attribute.
    pub fn entities(&self) -> impl Iterator<Item = EntityRef<'_>> {
        self.facility
            .iter()
            .map(EntityRef::Facility)
            .chain(self.floors.iter().map(|e| EntityRef::Floor(e)))
            .chain(self.spaces.iter().map(|e| EntityRef::Space(e)))
            .chain(self.types.iter().map(|e| EntityRef::Type(e)))
            .chain(self.components.iter().map(|e| EntityRef::Component(e)))
            .chain(self.systems.iter().map(EntityRef::System))
            .chain(self.attributes.iter().map(EntityRef::Attribute))
    }

    pub fn entity_count(&self) -> usize {
        self.facility.iter().count()
            + self.floors.len()
            + self.spaces.len()
            + self.types.len()
            + self.components.len()
            + self.systems.len()
            + self.attributes.len()
    }

    pub fn system(&self, name: &str) -> Option<&System> {
        self.systems.iter().find(|system| system.name == name)
    }

    pub fn component(&self, name: &str) -> Option<&Arc<Component>> {
        self.components.iter().find(|component| component.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn sheet_kind_round_trips_through_names() {
        for kind in SheetKind::EXPECTED {
            assert_eq!(SheetKind::from_str(kind.sheet_name()).ok(), Some(kind));
        }
        assert_eq!(SheetKind::Component.to_string(), "Component");
        assert_eq!(SheetKind::Type.uri_segment(), "type");
    }

    #[test]
    fn sheet_labels_match_case_insensitively() {
        assert_eq!(SheetKind::from_label(" space "), Some(SheetKind::Space));
        assert_eq!(SheetKind::from_label("COMPONENT"), Some(SheetKind::Component));
        assert_eq!(SheetKind::from_label("Zone"), None);
    }

    #[test]
    fn empty_graph_yields_no_entities() {
        let graph = EntityGraph::default();
        assert_eq!(graph.entities().count(), 0);
        assert_eq!(graph.entity_count(), 0);
    }
}

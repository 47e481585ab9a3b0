//! Entity graph construction from validated rows.
//!
//! Sheets are processed leaf-first (Floor, Space, Type, Component, System) and
//! each one is indexed by name before any dependent sheet is read, so every
//! cross-sheet lookup is a single hash probe. Callers must run
//! [`crate::validation::validate`] first; a lookup that still misses is
//! reported as [`ImportError::UnresolvedReference`], which means the validator
//! and this builder disagree.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ImportError, ImportResult};
use crate::model::{
    AssetType, Attribute, Category, CategoryScheme, Component, EntityGraph, Facility, Floor,
    SheetKind, Space, System,
};
use crate::uri::{attribute_uri, category_uri, entity_uri, normalize_anchor, normalize_namespace};
use crate::validation::checks::{
    CATEGORY, COMPONENT_NAMES, FLOOR_NAME, NAME, SPACE, TYPE_NAME, split_list,
};
use crate::workbook::{Document, Row};

pub const DEFAULT_CATEGORY_NAMESPACE: &str = "https://syyclops.com/";

const DESCRIPTION: &str = "Description";
const EXT_IDENTIFIER: &str = "ExtIdentifier";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Prefix for category nodes (`{namespace}categorySpace/...`).
    pub category_namespace: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            category_namespace: DEFAULT_CATEGORY_NAMESPACE.to_string(),
        }
    }
}

/// Builds the entity graph with default options.
pub fn build(facility_uri: &str, document: &Document) -> ImportResult<EntityGraph> {
    build_with(facility_uri, document, &BuildOptions::default())
}

#[tracing::instrument(skip_all, fields(facility = %facility_uri))]
pub fn build_with(
    facility_uri: &str,
    document: &Document,
    options: &BuildOptions,
) -> ImportResult<EntityGraph> {
    let builder = GraphBuilder {
        facility_uri: normalize_anchor(facility_uri)?,
        category_namespace: normalize_namespace(&options.category_namespace)?,
    };

    let facility = builder.facility(document)?;
    let (floors, floor_index) = builder.floors(document)?;
    let (spaces, space_index) = builder.spaces(document, &floor_index)?;
    let (types, type_index) = builder.types(document)?;
    let (components, component_index) =
        builder.components(document, &type_index, &space_index)?;
    let systems = builder.systems(document, &component_index)?;

    let targets = Targets {
        facility: &facility,
        floors: &floor_index,
        spaces: &space_index,
        types: &type_index,
        components: &component_index,
        systems: &systems,
    };
    let attributes = builder.attributes(document, &targets)?;

    let graph = EntityGraph {
        facility: Some(facility),
        floors,
        spaces,
        types,
        components,
        systems: systems.into_values().collect(),
        attributes,
    };

    tracing::info!(
        floors = graph.floors.len(),
        spaces = graph.spaces.len(),
        types = graph.types.len(),
        components = graph.components.len(),
        systems = graph.systems.len(),
        attributes = graph.attributes.len(),
        "entity graph built"
    );
    Ok(graph)
}

type Index<T> = HashMap<String, Arc<T>>;

struct GraphBuilder {
    facility_uri: String,
    category_namespace: String,
}

/// Everything an Attribute row may point at.
struct Targets<'a> {
    facility: &'a Facility,
    floors: &'a Index<Floor>,
    spaces: &'a Index<Space>,
    types: &'a Index<AssetType>,
    components: &'a Index<Component>,
    systems: &'a IndexMap<String, System>,
}

impl GraphBuilder {
    fn uri(&self, kind: SheetKind, name: &str) -> String {
        entity_uri(&self.facility_uri, kind, name)
    }

    fn category(&self, scheme: CategoryScheme, label: &str) -> Category {
        Category {
            uri: category_uri(&self.category_namespace, scheme, label),
            scheme,
            has_string_value: label.to_string(),
        }
    }

    fn facility(&self, document: &Document) -> ImportResult<Facility> {
        let sheet = document.require(SheetKind::Facility)?;
        let row = sheet.rows.first().ok_or_else(|| ImportError::MissingField {
            sheet: SheetKind::Facility,
            row: 2,
            column: NAME.to_string(),
        })?;
        Ok(Facility {
            uri: self.facility_uri.clone(),
            name: required(row, SheetKind::Facility, NAME)?.to_string(),
            description: row.text(DESCRIPTION),
            address: row.text("Address"),
            latitude: row.value("Latitude"),
            longitude: row.value("Longitude"),
        })
    }

    fn floors(&self, document: &Document) -> ImportResult<(Vec<Arc<Floor>>, Index<Floor>)> {
        let sheet = document.require(SheetKind::Floor)?;
        let mut floors = Vec::with_capacity(sheet.rows.len());
        let mut index = HashMap::with_capacity(sheet.rows.len());
        for row in &sheet.rows {
            let name = required(row, SheetKind::Floor, NAME)?;
            let floor = Arc::new(Floor {
                uri: self.uri(SheetKind::Floor, name),
                name: name.to_string(),
                description: row.text(DESCRIPTION),
                elevation: row.value("Elevation"),
                height: row.value("Height"),
            });
            index.insert(name.to_string(), Arc::clone(&floor));
            floors.push(floor);
        }
        Ok((floors, index))
    }

    fn spaces(
        &self,
        document: &Document,
        floors: &Index<Floor>,
    ) -> ImportResult<(Vec<Arc<Space>>, Index<Space>)> {
        let sheet = document.require(SheetKind::Space)?;
        let mut spaces = Vec::with_capacity(sheet.rows.len());
        let mut index = HashMap::with_capacity(sheet.rows.len());
        for row in &sheet.rows {
            let name = required(row, SheetKind::Space, NAME)?;
            let floor = resolve(floors, row, SheetKind::Space, FLOOR_NAME, SheetKind::Floor)?;
            let space = Arc::new(Space {
                uri: self.uri(SheetKind::Space, name),
                name: name.to_string(),
                description: row.text(DESCRIPTION),
                ext_identifier: row.text(EXT_IDENTIFIER),
                gross_area: row.value("GrossArea"),
                net_area: row.value("NetArea"),
                floor,
                category: row
                    .get(CATEGORY)
                    .map(|label| self.category(CategoryScheme::Space, label)),
            });
            index.insert(name.to_string(), Arc::clone(&space));
            spaces.push(space);
        }
        Ok((spaces, index))
    }

    fn types(&self, document: &Document) -> ImportResult<(Vec<Arc<AssetType>>, Index<AssetType>)> {
        let sheet = document.require(SheetKind::Type)?;
        let mut types = Vec::with_capacity(sheet.rows.len());
        let mut index = HashMap::with_capacity(sheet.rows.len());
        for row in &sheet.rows {
            let name = required(row, SheetKind::Type, NAME)?;
            let label = required(row, SheetKind::Type, CATEGORY)?;
            let asset_type = Arc::new(AssetType {
                uri: self.uri(SheetKind::Type, name),
                name: name.to_string(),
                description: row.text(DESCRIPTION),
                model_number: row.text("ModelNumber"),
                ext_identifier: row.text(EXT_IDENTIFIER),
                category: self.category(CategoryScheme::Product, label),
            });
            index.insert(name.to_string(), Arc::clone(&asset_type));
            types.push(asset_type);
        }
        Ok((types, index))
    }

    /// Attaches only the first space of a comma-separated `Space` cell, even
    /// though validation checks every listed space.
    fn components(
        &self,
        document: &Document,
        types: &Index<AssetType>,
        spaces: &Index<Space>,
    ) -> ImportResult<(Vec<Arc<Component>>, Index<Component>)> {
        let sheet = document.require(SheetKind::Component)?;
        let mut components = Vec::with_capacity(sheet.rows.len());
        let mut index = HashMap::with_capacity(sheet.rows.len());
        for row in &sheet.rows {
            let name = required(row, SheetKind::Component, NAME)?;
            let asset_type = resolve(types, row, SheetKind::Component, TYPE_NAME, SheetKind::Type)?;
            let space = match row
                .get(SPACE)
                .and_then(|listed| split_list(listed).next())
                .filter(|first| !first.is_empty())
            {
                Some(first) => Some(lookup(spaces, first, row, SheetKind::Component, SPACE, SheetKind::Space)?),
                None => None,
            };
            let component = Arc::new(Component {
                uri: self.uri(SheetKind::Component, name),
                name: name.to_string(),
                description: row.text(DESCRIPTION),
                ext_identifier: row.text(EXT_IDENTIFIER),
                serial_number: row.text("SerialNumber"),
                asset_type,
                space,
            });
            index.insert(name.to_string(), Arc::clone(&component));
            components.push(component);
        }
        Ok((components, index))
    }

    /// Rows sharing a System name fold into one System; each row appends its
    /// Component, in row order.
    fn systems(
        &self,
        document: &Document,
        components: &Index<Component>,
    ) -> ImportResult<IndexMap<String, System>> {
        let sheet = document.require(SheetKind::System)?;
        let mut systems: IndexMap<String, System> = IndexMap::new();
        for row in &sheet.rows {
            let name = required(row, SheetKind::System, NAME)?;
            let component = resolve(
                components,
                row,
                SheetKind::System,
                COMPONENT_NAMES,
                SheetKind::Component,
            )?;
            let system = systems.entry(name.to_string()).or_insert_with(|| System {
                uri: self.uri(SheetKind::System, name),
                name: name.to_string(),
                description: row.text(DESCRIPTION),
                components: Vec::new(),
            });
            system.components.push(component);
        }
        Ok(systems)
    }

    /// Attribute rows are not referentially validated, so a target that does
    /// not resolve is skipped rather than treated as builder drift.
    fn attributes(&self, document: &Document, targets: &Targets<'_>) -> ImportResult<Vec<Attribute>> {
        let sheet = document.require(SheetKind::Attribute)?;
        let mut attributes = Vec::with_capacity(sheet.rows.len());
        for row in &sheet.rows {
            let name = required(row, SheetKind::Attribute, NAME)?;
            let target = row
                .get("SheetName")
                .and_then(SheetKind::from_label)
                .zip(row.get("RowName"))
                .and_then(|(kind, row_name)| targets.uri_of(kind, row_name).map(|uri| (kind, uri)));
            let Some((target_kind, target_uri)) = target else {
                tracing::warn!(
                    row = row.number,
                    attribute = name,
                    sheet_name = row.get("SheetName").unwrap_or_default(),
                    row_name = row.get("RowName").unwrap_or_default(),
                    "attribute target does not resolve, skipping"
                );
                continue;
            };
            attributes.push(Attribute {
                uri: attribute_uri(&target_uri, name),
                name: name.to_string(),
                value: row.value("Value"),
                unit: row.text("Unit"),
                target_kind,
                target_uri,
            });
        }
        Ok(attributes)
    }
}

impl Targets<'_> {
    fn uri_of(&self, kind: SheetKind, name: &str) -> Option<String> {
        match kind {
            SheetKind::Facility => {
                (self.facility.name == name).then(|| self.facility.uri.clone())
            }
            SheetKind::Floor => self.floors.get(name).map(|e| e.uri.clone()),
            SheetKind::Space => self.spaces.get(name).map(|e| e.uri.clone()),
            SheetKind::Type => self.types.get(name).map(|e| e.uri.clone()),
            SheetKind::Component => self.components.get(name).map(|e| e.uri.clone()),
            SheetKind::System => self.systems.get(name).map(|e| e.uri.clone()),
            SheetKind::Attribute => None,
        }
    }
}

fn required<'r>(row: &'r Row, sheet: SheetKind, column: &str) -> ImportResult<&'r str> {
    row.get(column).ok_or_else(|| ImportError::MissingField {
        sheet,
        row: row.number,
        column: column.to_string(),
    })
}

fn resolve<T>(
    index: &Index<T>,
    row: &Row,
    sheet: SheetKind,
    column: &str,
    target: SheetKind,
) -> ImportResult<Arc<T>> {
    let name = required(row, sheet, column)?;
    lookup(index, name, row, sheet, column, target)
}

fn lookup<T>(
    index: &Index<T>,
    name: &str,
    row: &Row,
    sheet: SheetKind,
    column: &str,
    target: SheetKind,
) -> ImportResult<Arc<T>> {
    index
        .get(name)
        .cloned()
        .ok_or_else(|| ImportError::UnresolvedReference {
            sheet,
            row: row.number,
            column: column.to_string(),
            target,
            name: name.to_string(),
        })
}

//! Triple compiler: entity graph in, ordered and deduplicated triples out.
//!
//! Each entity contributes its `rdf:type`, one literal per present scalar, and
//! one edge per resolved reference. Absent scalars produce nothing. Concrete
//! text formats live in [`serialize`].

pub mod serialize;
pub mod vocab;

use indexmap::IndexSet;
use oxigraph::model::vocab::rdf;
use oxigraph::model::{Literal, NamedNode, Term, Triple};

use crate::error::{ImportError, ImportResult};
use crate::model::{
    AssetType, Attribute, Category, Component, EntityGraph, EntityRef, Facility, Floor, SheetKind,
    Space, System,
};
use crate::workbook::CellValue;

pub use serialize::{RdfOutputFormat, TripleDocument, serialize};

/// Insertion-ordered set of triples; re-adding a triple keeps its first position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripleSet {
    triples: IndexSet<Triple>,
}

impl TripleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the triple was already present.
    pub fn insert(&mut self, triple: Triple) -> bool {
        self.triples.insert(triple)
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    /// Triples whose subject is `subject`.
    pub fn about<'a>(&'a self, subject: &str) -> impl Iterator<Item = &'a Triple> + 'a {
        let subject = format!("<{subject}>");
        self.triples
            .iter()
            .filter(move |triple| triple.subject.to_string() == subject)
    }
}

impl<'a> IntoIterator for &'a TripleSet {
    type Item = &'a Triple;
    type IntoIter = indexmap::set::Iter<'a, Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.iter()
    }
}

/// Compiles every entity in graph order (Facility, Floor, Space, Type,
/// Component, System, Attribute).
pub fn compile(graph: &EntityGraph) -> ImportResult<TripleSet> {
    let mut emitter = Emitter::default();
    for entity in graph.entities() {
        match entity {
            EntityRef::Facility(facility) => emitter.facility(facility)?,
            EntityRef::Floor(floor) => emitter.floor(floor)?,
            EntityRef::Space(space) => emitter.space(space)?,
            EntityRef::Type(asset_type) => emitter.asset_type(asset_type)?,
            EntityRef::Component(component) => emitter.component(component)?,
            EntityRef::System(system) => emitter.system(system)?,
            EntityRef::Attribute(attribute) => emitter.attribute(attribute)?,
        }
    }

    tracing::info!(
        entities = graph.entity_count(),
        triples = emitter.set.len(),
        duplicates = emitter.duplicates,
        "entity graph compiled"
    );
    Ok(emitter.set)
}

#[derive(Default)]
struct Emitter {
    set: TripleSet,
    duplicates: usize,
}

impl Emitter {
    fn push(&mut self, subject: &NamedNode, predicate: NamedNode, object: impl Into<Term>) {
        if !self.set.insert(Triple::new(subject.clone(), predicate, object)) {
            self.duplicates += 1;
        }
    }

    fn typed(&mut self, uri: &str, class: NamedNode) -> ImportResult<NamedNode> {
        let subject = node(uri)?;
        self.push(&subject, rdf::TYPE.into_owned(), class);
        Ok(subject)
    }

    fn text(&mut self, subject: &NamedNode, predicate: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.push(subject, vocab::term(predicate), Literal::new_simple_literal(value));
        }
    }

    fn value(&mut self, subject: &NamedNode, predicate: &str, value: Option<&CellValue>) {
        if let Some(value) = value {
            self.push(subject, vocab::term(predicate), literal(value));
        }
    }

    fn link(&mut self, subject: &NamedNode, predicate: &str, target: &str) -> ImportResult<()> {
        let object = node(target)?;
        self.push(subject, vocab::term(predicate), object);
        Ok(())
    }

    fn category(&mut self, owner: &NamedNode, category: &Category) -> ImportResult<()> {
        let subject = self.typed(&category.uri, vocab::category_class(category.scheme))?;
        self.text(&subject, vocab::HAS_STRING_VALUE, Some(&category.has_string_value));
        self.link(owner, vocab::CATEGORY, &category.uri)
    }

    fn facility(&mut self, facility: &Facility) -> ImportResult<()> {
        let subject = self.typed(&facility.uri, vocab::class(SheetKind::Facility))?;
        self.text(&subject, vocab::NAME, Some(&facility.name));
        self.text(&subject, vocab::DESCRIPTION, facility.description.as_deref());
        self.text(&subject, vocab::ADDRESS, facility.address.as_deref());
        self.value(&subject, vocab::LATITUDE, facility.latitude.as_ref());
        self.value(&subject, vocab::LONGITUDE, facility.longitude.as_ref());
        Ok(())
    }

    fn floor(&mut self, floor: &Floor) -> ImportResult<()> {
        let subject = self.typed(&floor.uri, vocab::class(SheetKind::Floor))?;
        self.text(&subject, vocab::NAME, Some(&floor.name));
        self.text(&subject, vocab::DESCRIPTION, floor.description.as_deref());
        self.value(&subject, vocab::ELEVATION, floor.elevation.as_ref());
        self.value(&subject, vocab::HEIGHT, floor.height.as_ref());
        Ok(())
    }

    fn space(&mut self, space: &Space) -> ImportResult<()> {
        let subject = self.typed(&space.uri, vocab::class(SheetKind::Space))?;
        self.text(&subject, vocab::NAME, Some(&space.name));
        self.text(&subject, vocab::DESCRIPTION, space.description.as_deref());
        self.text(&subject, vocab::EXT_IDENTIFIER, space.ext_identifier.as_deref());
        self.value(&subject, vocab::GROSS_AREA, space.gross_area.as_ref());
        self.value(&subject, vocab::NET_AREA, space.net_area.as_ref());
        self.link(&subject, vocab::FLOOR_NAME, &space.floor.uri)?;
        if let Some(category) = &space.category {
            self.category(&subject, category)?;
        }
        Ok(())
    }

    fn asset_type(&mut self, asset_type: &AssetType) -> ImportResult<()> {
        let subject = self.typed(&asset_type.uri, vocab::class(SheetKind::Type))?;
        self.text(&subject, vocab::NAME, Some(&asset_type.name));
        self.text(&subject, vocab::DESCRIPTION, asset_type.description.as_deref());
        self.text(&subject, vocab::MODEL_NUMBER, asset_type.model_number.as_deref());
        self.text(&subject, vocab::EXT_IDENTIFIER, asset_type.ext_identifier.as_deref());
        self.category(&subject, &asset_type.category)
    }

    fn component(&mut self, component: &Component) -> ImportResult<()> {
        let subject = self.typed(&component.uri, vocab::class(SheetKind::Component))?;
        self.text(&subject, vocab::NAME, Some(&component.name));
        self.text(&subject, vocab::DESCRIPTION, component.description.as_deref());
        self.text(&subject, vocab::EXT_IDENTIFIER, component.ext_identifier.as_deref());
        self.text(&subject, vocab::SERIAL_NUMBER, component.serial_number.as_deref());
        self.link(&subject, vocab::TYPE_NAME, &component.asset_type.uri)?;
        if let Some(space) = &component.space {
            self.link(&subject, vocab::SPACE, &space.uri)?;
        }
        Ok(())
    }

    fn system(&mut self, system: &System) -> ImportResult<()> {
        let subject = self.typed(&system.uri, vocab::class(SheetKind::System))?;
        self.text(&subject, vocab::NAME, Some(&system.name));
        self.text(&subject, vocab::DESCRIPTION, system.description.as_deref());
        for component in &system.components {
            self.link(&subject, vocab::COMPONENT_NAMES, &component.uri)?;
        }
        Ok(())
    }

    fn attribute(&mut self, attribute: &Attribute) -> ImportResult<()> {
        let subject = self.typed(&attribute.uri, vocab::class(SheetKind::Attribute))?;
        self.text(&subject, vocab::NAME, Some(&attribute.name));
        self.value(&subject, vocab::VALUE, attribute.value.as_ref());
        self.text(&subject, vocab::UNIT, attribute.unit.as_deref());
        self.link(&subject, vocab::ATTRIBUTE_TO, &attribute.target_uri)
    }
}

fn node(uri: &str) -> ImportResult<NamedNode> {
    NamedNode::new(uri)
        .map_err(|err| ImportError::SerializationFailure(format!("node IRI '{uri}': {err}")))
}

fn literal(value: &CellValue) -> Literal {
    match value {
        CellValue::Integer(value) => Literal::from(*value),
        CellValue::Number(value) => Literal::from(*value),
        CellValue::Bool(value) => Literal::from(*value),
        CellValue::Text(value) => Literal::new_simple_literal(value),
    }
}

//! COBie 2.4 ontology terms.

use oxigraph::model::NamedNode;

use crate::model::{CategoryScheme, SheetKind};

pub const COBIE: &str = "http://checksem.u-bourgogne.fr/ontology/cobie24#";
pub const COBIE_PREFIX: &str = "cobie";

// Scalar properties.
pub const NAME: &str = "name";
pub const DESCRIPTION: &str = "description";
pub const ADDRESS: &str = "address";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";
pub const ELEVATION: &str = "elevation";
pub const HEIGHT: &str = "height";
pub const EXT_IDENTIFIER: &str = "extIdentifier";
pub const GROSS_AREA: &str = "grossArea";
pub const NET_AREA: &str = "netArea";
pub const MODEL_NUMBER: &str = "modelNumber";
pub const SERIAL_NUMBER: &str = "serialNumber";
pub const HAS_STRING_VALUE: &str = "hasStringValue";
pub const VALUE: &str = "value";
pub const UNIT: &str = "unit";

// Relationships.
pub const FLOOR_NAME: &str = "floorName";
pub const CATEGORY: &str = "category";
pub const TYPE_NAME: &str = "typeName";
pub const SPACE: &str = "space";
pub const COMPONENT_NAMES: &str = "componentNames";
pub const ATTRIBUTE_TO: &str = "attributeTo";

/// `cobie:{local}`. Local names are constants of this module, so the IRI is
/// always valid.
pub fn term(local: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("{COBIE}{local}"))
}

pub fn class(kind: SheetKind) -> NamedNode {
    term(kind.sheet_name())
}

pub fn category_class(scheme: CategoryScheme) -> NamedNode {
    match scheme {
        CategoryScheme::Space => term("CategorySpace"),
        CategoryScheme::Product => term("CategoryProduct"),
    }
}

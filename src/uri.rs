//! Deterministic URI derivation for entities.
//!
//! Identity is derived from the human-readable name only, so importing the same
//! spreadsheet twice yields the same node URIs. Names that differ only by case
//! collapse onto the same token; that collision is accepted, not detected.

use oxigraph::model::NamedNode;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::error::{ImportError, ImportResult};
use crate::model::{CategoryScheme, SheetKind};

/// Everything but the RFC 3986 unreserved set is escaped, including `/`.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Lowercases `name` and percent-encodes it into a single path segment.
pub fn url_safe(name: &str) -> String {
    utf8_percent_encode(&name.to_lowercase(), SEGMENT).to_string()
}

/// `{facility}/{sheet}/{urlSafe(name)}`
pub fn entity_uri(facility_uri: &str, kind: SheetKind, name: &str) -> String {
    format!("{}/{}/{}", facility_uri, kind.uri_segment(), url_safe(name))
}

/// `{namespace}{scheme}/{urlSafe(label)}`
pub fn category_uri(namespace: &str, scheme: CategoryScheme, label: &str) -> String {
    format!("{}{}/{}", namespace, scheme.path(), url_safe(label))
}

/// `{target}/attribute/{urlSafe(name)}`
pub fn attribute_uri(target_uri: &str, name: &str) -> String {
    format!(
        "{}/{}/{}",
        target_uri,
        SheetKind::Attribute.uri_segment(),
        url_safe(name)
    )
}

/// Checks that `value` is an absolute IRI and strips trailing slashes so
/// derived URIs never contain an empty segment.
pub fn normalize_anchor(value: &str) -> ImportResult<String> {
    let trimmed = value.trim().trim_end_matches('/');
    NamedNode::new(trimmed).map_err(|err| ImportError::InvalidUri {
        value: value.to_string(),
        reason: err.to_string(),
    })?;
    Ok(trimmed.to_string())
}

/// Like [`normalize_anchor`] but keeps the namespace's trailing separator, since
/// namespaces are concatenated directly with local names.
pub fn normalize_namespace(value: &str) -> ImportResult<String> {
    let trimmed = value.trim();
    NamedNode::new(trimmed).map_err(|err| ImportError::InvalidUri {
        value: value.to_string(),
        reason: err.to_string(),
    })?;
    if trimmed.ends_with('/') || trimmed.ends_with('#') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/"))
    }
}

/// Facility URI for a portfolio: `{namespace}{urlSafe(facilityName)}`.
pub fn facility_uri_in_portfolio(namespace: &str, facility_name: &str) -> ImportResult<String> {
    let namespace = normalize_namespace(namespace)?;
    normalize_anchor(&format!("{}{}", namespace, url_safe(facility_name)))
}

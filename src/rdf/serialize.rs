//! Text serialization of compiled triples.

use clap::ValueEnum;
use oxigraph::io::{RdfFormat, RdfSerializer};
use oxigraph::model::vocab::{rdf, xsd};
use serde::{Deserialize, Serialize};
use strum::Display;

use super::{TripleSet, vocab};
use crate::error::{ImportError, ImportResult};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RdfOutputFormat {
    #[default]
    Turtle,
    #[value(alias = "nt")]
    #[serde(alias = "nt")]
    Ntriples,
}

impl RdfOutputFormat {
    pub fn file_extension(&self) -> &'static str {
        match self {
            RdfOutputFormat::Turtle => "ttl",
            RdfOutputFormat::Ntriples => "nt",
        }
    }

    pub fn media_type(&self) -> &'static str {
        self.rdf_format().media_type()
    }

    fn rdf_format(&self) -> RdfFormat {
        match self {
            RdfOutputFormat::Turtle => RdfFormat::Turtle,
            RdfOutputFormat::Ntriples => RdfFormat::NTriples,
        }
    }
}

/// Serialized triples ready for the import collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TripleDocument {
    /// File stem the import collaborator stores the document under.
    pub name: String,
    pub facility_uri: String,
    pub format: RdfOutputFormat,
    pub triple_count: usize,
    pub content: String,
}

impl TripleDocument {
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.format.file_extension())
    }
}

/// Writes `triples` in `format`. Turtle output declares the `cobie`, `rdf`
/// and `xsd` prefixes.
pub fn serialize(triples: &TripleSet, format: RdfOutputFormat) -> ImportResult<String> {
    let mut serializer = RdfSerializer::from_format(format.rdf_format());
    if format == RdfOutputFormat::Turtle {
        serializer = serializer
            .with_prefix(vocab::COBIE_PREFIX, vocab::COBIE)
            .and_then(|s| s.with_prefix("rdf", rdf_namespace()))
            .and_then(|s| s.with_prefix("xsd", xsd_namespace()))
            .map_err(|err| ImportError::SerializationFailure(format!("prefix: {err}")))?;
    }

    let mut writer = serializer.for_writer(Vec::new());
    for triple in triples {
        writer
            .serialize_triple(triple)
            .map_err(|err| ImportError::SerializationFailure(err.to_string()))?;
    }
    let bytes = writer
        .finish()
        .map_err(|err| ImportError::SerializationFailure(err.to_string()))?;

    let content = String::from_utf8(bytes)
        .map_err(|err| ImportError::SerializationFailure(format!("non UTF-8 output: {err}")))?;
    tracing::debug!(%format, triples = triples.len(), bytes = content.len(), "triples serialized");
    Ok(content)
}

fn rdf_namespace() -> &'static str {
    rdf::TYPE.as_str().trim_end_matches("type")
}

fn xsd_namespace() -> &'static str {
    xsd::STRING.as_str().trim_end_matches("string")
}

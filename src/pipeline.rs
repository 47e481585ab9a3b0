//! Reader → Validator → Builder → Compiler, one workbook at a time.
//!
//! A pipeline holds only its options. Every call works on the bytes it is
//! given, so one pipeline can serve many concurrent conversions.

use serde::Serialize;

use crate::builder::{BuildOptions, DEFAULT_CATEGORY_NAMESPACE, build_with};
use crate::error::{ImportError, ImportResult};
use crate::model::{EntityGraph, SheetKind};
use crate::rdf::{RdfOutputFormat, TripleDocument, TripleSet, compile, serialize};
use crate::uri::{facility_uri_in_portfolio, normalize_anchor};
use crate::validation::checks::NAME;
use crate::validation::{ValidationOutcome, validate_parsed};
use crate::workbook::{Document, document_from_book, load_workbook};

/// Where entity URIs are rooted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityAnchor {
    /// Used as-is for every workbook.
    Uri(String),
    /// `{namespace}{urlSafe(Facility.Name)}`, derived per workbook.
    Portfolio(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub anchor: FacilityAnchor,
    pub category_namespace: String,
    pub format: RdfOutputFormat,
    /// Build straight from the rows without the validation gate.
    pub skip_validation: bool,
}

impl PipelineOptions {
    pub fn new(anchor: FacilityAnchor) -> Self {
        Self {
            anchor,
            category_namespace: DEFAULT_CATEGORY_NAMESPACE.to_string(),
            format: RdfOutputFormat::default(),
            skip_validation: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ConvertOutcome {
    /// Validation found problems; nothing was built.
    Rejected(ValidationOutcome),
    Compiled(TripleDocument),
}

impl ConvertOutcome {
    pub fn is_compiled(&self) -> bool {
        matches!(self, ConvertOutcome::Compiled(_))
    }
}

#[derive(Debug, Clone)]
pub struct ImportPipeline {
    options: PipelineOptions,
}

impl ImportPipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Runs the whole chain. Validation problems come back as
    /// [`ConvertOutcome::Rejected`]; only unreadable input or internal
    /// failures are errors.
    pub fn convert(&self, bytes: &[u8]) -> ImportResult<ConvertOutcome> {
        let book = load_workbook(bytes)?;
        let document = document_from_book(&book);

        if self.options.skip_validation {
            tracing::warn!("validation skipped by configuration");
        } else {
            let outcome = validate_parsed(bytes, book, &document)?;
            if outcome.has_errors {
                tracing::info!(violations = outcome.report.len(), "workbook rejected");
                return Ok(ConvertOutcome::Rejected(outcome));
            }
        }

        let facility_uri = self.facility_uri(&document)?;
        let triples = self.compile_document(&facility_uri, &document)?;
        let content = serialize(&triples, self.options.format)?;

        tracing::info!(
            facility = %facility_uri,
            format = %self.options.format,
            triples = triples.len(),
            bytes = content.len(),
            "workbook converted"
        );
        Ok(ConvertOutcome::Compiled(TripleDocument {
            name: document_name(&facility_uri),
            facility_uri,
            format: self.options.format,
            triple_count: triples.len(),
            content,
        }))
    }

    /// Builder and compiler over rows that already passed validation.
    pub fn compile_document(&self, facility_uri: &str, document: &Document) -> ImportResult<TripleSet> {
        let graph = self.build_graph(facility_uri, document)?;
        compile(&graph)
    }

    pub fn build_graph(&self, facility_uri: &str, document: &Document) -> ImportResult<EntityGraph> {
        let options = BuildOptions {
            category_namespace: self.options.category_namespace.clone(),
        };
        build_with(facility_uri, document, &options)
    }

    /// Resolves the anchor for one workbook.
    pub fn facility_uri(&self, document: &Document) -> ImportResult<String> {
        match &self.options.anchor {
            FacilityAnchor::Uri(uri) => normalize_anchor(uri),
            FacilityAnchor::Portfolio(namespace) => {
                let sheet = document.require(SheetKind::Facility)?;
                let name = sheet
                    .rows
                    .first()
                    .and_then(|row| row.get(NAME))
                    .ok_or_else(|| ImportError::MissingField {
                        sheet: SheetKind::Facility,
                        row: 2,
                        column: NAME.to_string(),
                    })?;
                facility_uri_in_portfolio(namespace, name)
            }
        }
    }
}

/// Last path segment of the facility URI (`https://x/hq` -> `hq`).
fn document_name(facility_uri: &str) -> String {
    facility_uri
        .rsplit(['/', '#'])
        .find(|segment| !segment.is_empty())
        .filter(|segment| !segment.contains(':'))
        .unwrap_or("facility")
        .to_string()
}

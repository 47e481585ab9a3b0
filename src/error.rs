//! Error taxonomy for the conversion pipeline.
//!
//! Validation problems are *not* represented here: they are collected into a
//! [`crate::validation::ValidationReport`] and returned as a value. Everything in
//! this module is a failure that stops the current import.

use crate::model::SheetKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable error codes used in structured log fields and CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Input bytes are not a readable workbook
    MalformedDocument,
    /// Builder could not resolve a name the validator should have guaranteed
    UnresolvedReference,
    /// Builder found a blank cell the validator should have rejected
    MissingField,
    /// A sheet required by the builder is absent
    IncompleteDocument,
    /// Triples could not be produced or written
    SerializationFailure,
    /// Facility or namespace anchor is not an absolute IRI
    InvalidUri,
    /// File I/O at the boundary
    IoError,
}

impl ErrorCode {
    /// Internal invariant violations point at a bug rather than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            ErrorCode::UnresolvedReference | ErrorCode::MissingField
        )
    }

    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::MalformedDocument | ErrorCode::InvalidUri => "client_error",
            ErrorCode::UnresolvedReference
            | ErrorCode::MissingField
            | ErrorCode::IncompleteDocument => "invariant_violation",
            ErrorCode::SerializationFailure => "serialization_error",
            ErrorCode::IoError => "io_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorCode::MalformedDocument => "malformed_document",
            ErrorCode::UnresolvedReference => "unresolved_reference",
            ErrorCode::MissingField => "missing_field",
            ErrorCode::IncompleteDocument => "incomplete_document",
            ErrorCode::SerializationFailure => "serialization_failure",
            ErrorCode::InvalidUri => "invalid_uri",
            ErrorCode::IoError => "io_error",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("spreadsheet could not be parsed: {0}")]
    MalformedDocument(String),

    #[error(
        "{sheet} row {row}: '{name}' in column {column} does not resolve to an existing {target}"
    )]
    UnresolvedReference {
        sheet: SheetKind,
        row: u32,
        column: String,
        target: SheetKind,
        name: String,
    },

    #[error("{sheet} row {row}: required column {column} is blank")]
    MissingField {
        sheet: SheetKind,
        row: u32,
        column: String,
    },

    #[error("sheet {0} is missing from the document")]
    IncompleteDocument(SheetKind),

    #[error("failed to produce triples: {0}")]
    SerializationFailure(String),

    #[error("'{value}' is not a valid absolute IRI: {reason}")]
    InvalidUri { value: String, reason: String },

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

impl ImportError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ImportError::MalformedDocument(_) => ErrorCode::MalformedDocument,
            ImportError::UnresolvedReference { .. } => ErrorCode::UnresolvedReference,
            ImportError::MissingField { .. } => ErrorCode::MissingField,
            ImportError::IncompleteDocument(_) => ErrorCode::IncompleteDocument,
            ImportError::SerializationFailure(_) => ErrorCode::SerializationFailure,
            ImportError::InvalidUri { .. } => ErrorCode::InvalidUri,
            ImportError::Io(_) => ErrorCode::IoError,
        }
    }
}

pub type ImportResult<T> = std::result::Result<T, ImportError>;

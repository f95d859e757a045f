//! Schema error types

use crate::serialisation::SerialisationError;
use std::path::PathBuf;
use thiserror::Error;

/// A single schema rule violation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("group names must not be empty")]
    EmptyGroupName,

    #[error("group '{group}' is declared as both an entity and an edge group")]
    DuplicateGroup { group: String },

    #[error("group '{group}' property '{property}' references undeclared type '{type_name}'")]
    UndeclaredType {
        group: String,
        property: String,
        type_name: String,
    },

    #[error("group '{group}' groupBy property '{property}' is not a declared property of the group")]
    UndeclaredGroupBy { group: String, property: String },

    #[error("timestamp property '{property}' in group '{group}' must use the Max (keep-maximum) aggregate function, found {found}")]
    TimestampAggregator {
        group: String,
        property: String,
        found: String,
    },

    #[error("group '{group}' is aggregated but property '{property}' has no aggregate function")]
    MissingAggregateFunction { group: String, property: String },

    #[error("type '{type_name}' uses serialiser {serialiser}, which cannot handle {kind}")]
    IncompatibleSerialiser {
        type_name: String,
        serialiser: String,
        kind: String,
    },

    #[error("vertex serialiser {serialiser} cannot handle identifier type '{type_name}' ({kind})")]
    IncompatibleVertexSerialiser {
        type_name: String,
        serialiser: String,
        kind: String,
    },

    #[error("invalid serialiser for {context}: {reason}")]
    InvalidSerialiser { context: String, reason: String },
}

#[derive(Error, Debug)]
pub enum SchemaError {
    /// Every violated rule, not just the first
    #[error("Schema is invalid ({} errors): {}", .errors.len(), join(.errors))]
    Invalid { errors: Vec<ValidationError> },

    /// Every conflict found while merging
    #[error("Schemas cannot be merged ({} conflicts): {}", .0.len(), .0.join("; "))]
    MergeConflicts(Vec<String>),

    #[error("Failed to read schema file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse schema: {0}")]
    Parse(String),

    #[error("Invalid element in group '{group}': {reason}")]
    InvalidElement { group: String, reason: String },

    #[error("Serialisation error: {0}")]
    Serialisation(#[from] SerialisationError),
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        SchemaError::Parse(err.to_string())
    }
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type SchemaResult<T> = Result<T, SchemaError>;

//! Store error types

use crate::function::FunctionError;
use crate::operation::{OperationError, OperationKind};
use crate::pipeline::PipelineError;
use crate::schema::SchemaError;
use crate::serialisation::SerialisationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// No handler is registered for the operation, or a trait it needs is missing
    #[error("Operation {operation} is not supported by the {store} store")]
    UnsupportedOperation {
        store: String,
        operation: OperationKind,
    },

    /// A handler failed; the rest of the chain was abandoned
    #[error("Operation {index} ({operation}) in the chain failed: {source}")]
    OperationFailed {
        index: usize,
        operation: OperationKind,
        #[source]
        source: Box<StoreError>,
    },

    /// A delegate of a federated store failed
    #[error("Delegate store '{delegate}' failed: {source}")]
    Delegate {
        delegate: String,
        #[source]
        source: Box<StoreError>,
    },

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Serialisation error: {0}")]
    Serialisation(#[from] SerialisationError),

    #[error("Function error: {0}")]
    Function(#[from] FunctionError),

    /// The store cannot run with the given schema or configuration
    #[error("Store initialisation failed: {0}")]
    Initialisation(String),

    #[error("Join input exceeded the limit of {limit} items")]
    JoinLimitExceeded { limit: usize },

    #[error("Limit of {limit} items exceeded and truncation is disabled")]
    LimitExceeded { limit: usize },

    #[error("Element validation failed: {0}")]
    Validation(String),
}

impl StoreError {
    /// The innermost error, unwrapping chain positions and delegates
    pub fn root_cause(&self) -> &StoreError {
        match self {
            StoreError::OperationFailed { source, .. } | StoreError::Delegate { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_names_the_operation() {
        let err = StoreError::OperationFailed {
            index: 2,
            operation: OperationKind::Limit,
            source: Box::new(StoreError::LimitExceeded { limit: 5 }),
        };
        assert_eq!(
            err.to_string(),
            "Operation 2 (Limit) in the chain failed: Limit of 5 items exceeded and truncation is disabled"
        );
        assert!(matches!(err.root_cause(), StoreError::LimitExceeded { limit: 5 }));
    }
}

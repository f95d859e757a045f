//! Operation error types

use crate::function::FunctionError;
use thiserror::Error;

/// Errors raised while decoding or running a single operation
#[derive(Error, Debug)]
pub enum OperationError {
    #[error("{operation} received invalid input: {reason}")]
    InvalidInput { operation: String, reason: String },

    #[error("{operation} requires an input")]
    MissingInput { operation: String },

    #[error("{operation} is invalid: {reason}")]
    Invalid { operation: String, reason: String },

    /// A predicate was handed a value it cannot test
    #[error("The predicate '{predicate}' cannot accept an input of type '{input_type}'")]
    Predicate { predicate: String, input_type: String },

    #[error("Variable '{0}' is not set")]
    MissingVariable(String),

    #[error("Function error: {0}")]
    Function(#[from] FunctionError),

    /// Ill-formed JSON payload
    #[error("Wire format error: {0}")]
    Wire(String),
}

impl OperationError {
    pub fn invalid_input(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        OperationError::InvalidInput {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Rewrite a predicate type mismatch into the predicate-specific form
    pub fn from_predicate(err: FunctionError) -> Self {
        match err {
            FunctionError::TypeMismatch {
                function, actual, ..
            } => OperationError::Predicate {
                predicate: function,
                input_type: actual,
            },
            other => OperationError::Function(other),
        }
    }
}

impl From<serde_json::Error> for OperationError {
    fn from(err: serde_json::Error) -> Self {
        OperationError::Wire(err.to_string())
    }
}

pub type OperationResult<T> = Result<T, OperationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_mismatch_message() {
        let err = OperationError::from_predicate(FunctionError::TypeMismatch {
            function: "IsMoreThan".into(),
            expected: "Long".into(),
            actual: "String".into(),
        });
        assert_eq!(
            err.to_string(),
            "The predicate 'IsMoreThan' cannot accept an input of type 'String'"
        );
    }
}

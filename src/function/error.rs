//! Function error types

use thiserror::Error;

/// Errors raised while applying predicates, functions and aggregators
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FunctionError {
    /// The function cannot accept the runtime type of its input
    #[error("{function} cannot accept an input of type {actual} (expected {expected})")]
    TypeMismatch {
        function: String,
        expected: String,
        actual: String,
    },

    /// Two inputs to a binary operator have different types
    #[error("{function} cannot combine {left} with {right}")]
    IncompatibleOperands {
        function: String,
        left: String,
        right: String,
    },

    /// Arithmetic overflow or unparseable conversion
    #[error("{function} failed: {reason}")]
    Failed { function: String, reason: String },
}

impl FunctionError {
    pub fn type_mismatch(function: &str, expected: &str, actual: &str) -> Self {
        FunctionError::TypeMismatch {
            function: function.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Result type alias for function evaluation
pub type FunctionResult<T> = Result<T, FunctionError>;

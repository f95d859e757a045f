//! Functions
//!
//! The pluggable logic referenced by schemas, views and operations:
//!
//! - **predicate**: `Predicate` tests used by filters and control flow
//! - **unary**: `Function` mappings used by `Map`, join keys and transformers
//! - **binary**: `BinaryOperator` aggregate functions
//!
//! All three have a JSON form tagged by `"class"`.

pub mod binary;
pub mod error;
pub mod predicate;
pub mod unary;

pub use binary::BinaryOperator;
pub use error::{FunctionError, FunctionResult};
pub use predicate::Predicate;
pub use unary::Function;

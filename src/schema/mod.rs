//! Schema
//!
//! The schema declares every entity and edge group, the types of their
//! identifiers and properties, how each type is serialised and aggregated,
//! and which properties carry timestamps and visibility.
//!
//! - **definition**: `GroupDefinition` and `TypeDefinition`
//! - **model**: `Schema` and its builder, element validation
//! - **validation**: schema rule checks, reported all at once
//! - **merge**: combining schemas from several stores
//!
//! # Example
//!
//! ```rust
//! use trellis::element::ValueKind;
//! use trellis::function::BinaryOperator;
//! use trellis::schema::{GroupDefinition, Schema, TypeDefinition};
//!
//! let schema = Schema::builder()
//!     .edge(
//!         "road",
//!         GroupDefinition::new()
//!             .endpoints("junction", "junction")
//!             .property("count", "count.long"),
//!     )
//!     .type_definition("junction", TypeDefinition::new(ValueKind::String))
//!     .type_definition(
//!         "count.long",
//!         TypeDefinition::new(ValueKind::Long).aggregate_function(BinaryOperator::Sum),
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert!(schema.get_edge("road").is_some());
//! ```

pub mod definition;
pub mod error;
pub mod merge;
pub mod model;
pub mod validation;

pub use definition::{GroupDefinition, TypeDefinition};
pub use error::{SchemaError, SchemaResult, ValidationError};
pub use model::{Schema, SchemaBuilder};

//! # Trellis
//!
//! A schema-governed graph store. Typed entities and edges are written and
//! queried through chains of operations, with the schema's aggregation,
//! filtering, transformation and visibility rules applied the same way on
//! every backend.
//!
//! ## Modules
//!
//! - [`element`]: values, entities, edges and seeds
//! - [`schema`]: group and type definitions, validation and merging
//! - [`serialisation`]: byte encodings, including the multiplexed serialiser
//! - [`function`]: predicates, functions and aggregate operators
//! - [`operation`]: the operation set, chains, views and the JSON wire form
//! - [`pipeline`]: the staged filter/aggregate/transform/visibility pipeline
//! - [`store`]: chain execution, handlers and the map and federated backends
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use trellis::element::{Element, Entity, ValueKind};
//! use trellis::function::BinaryOperator;
//! use trellis::operation::{AddElements, GetElements, Item};
//! use trellis::schema::{GroupDefinition, Schema, TypeDefinition};
//! use trellis::store::{MapStore, User};
//! use trellis::config::StoreProperties;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let schema = Schema::builder()
//!         .entity("person", GroupDefinition::new().vertex("string").property("visits", "long"))
//!         .type_definition("string", TypeDefinition::new(ValueKind::String))
//!         .type_definition(
//!             "long",
//!             TypeDefinition::new(ValueKind::Long).aggregate_function(BinaryOperator::Sum),
//!         )
//!         .build()?;
//!     let store = MapStore::create(StoreProperties::named("demo"), schema)?;
//!     let mut context = store.create_context(User::new("alice"));
//!
//!     let visit = Entity::new("person", "v1").property("visits", 3i64);
//!     let visits: Vec<Element> = vec![visit.clone().into(), visit.into()];
//!     store
//!         .execute_operation(AddElements::new(visits), &mut context)
//!         .await?;
//!
//!     let found = store
//!         .execute_operation(GetElements::new(vec![Item::Value("v1".into())]), &mut context)
//!         .await?;
//!     println!("{:?}", found.into_item());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod element;
pub mod function;
pub mod operation;
pub mod pipeline;
pub mod schema;
pub mod serialisation;
pub mod store;
pub mod telemetry;

// Re-export top-level types for convenience
pub use config::{Config, ConfigError, LoggingConfig, StoreProperties};

pub use element::{Edge, Element, ElementSeed, Entity, Value, ValueKind};

pub use schema::{GroupDefinition, Schema, SchemaError, TypeDefinition};

pub use operation::{Data, Item, Operation, OperationChain, OperationKind, View};

pub use store::{Context, FederatedStore, MapStore, Store, StoreError, StoreResult, StoreTrait, User};

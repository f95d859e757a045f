//! Trellis Store
//!
//! Executes operation chains against a backend:
//!
//! - **engine**: `Store`, the `StoreBackend` seam and chain execution
//! - **handler**: the `OperationHandler` trait, registry and `Execution`
//! - **handlers**: handlers every store registers
//! - **traits**: capability flags gating operations and pipeline stages
//! - **context**: the requesting user and chain variables
//! - **map**: in-memory backend
//! - **federated**: a store composed of named delegate stores
//! - **error**: error types
//!
//! # Architecture
//!
//! ```text
//! OperationChain → validate → for each operation:
//!   thread previous output → lookup handler by exact kind → handle
//!                                  ↓
//!              backend handlers → Pipeline (view stages) → ItemStream
//! ```

// `handlers` defines `unpack!`, used by the backends below it
#[macro_use]
pub mod handlers;

pub mod context;
pub mod engine;
pub mod error;
pub mod federated;
pub mod handler;
pub mod map;
pub mod traits;

pub use context::{Context, User};
pub use engine::{Store, StoreBackend, StoreState};
pub use error::{StoreError, StoreResult};
pub use federated::{Delegate, FederatedStore};
pub use handler::{Execution, HandlerRegistry, OperationHandler};
pub use map::{MapStore, MapStoreConfig};
pub use traits::{StoreTrait, TraitSet};

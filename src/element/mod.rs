//! Element Model
//!
//! - **value**: `Value` and `ValueKind`, the typed values held by elements
//! - **model**: `Entity`, `Edge`, `Element` and normalised `ElementKey` identity
//! - **seed**: `ElementSeed` for looking elements up
//!
//! # Example
//!
//! ```rust
//! use trellis::element::{Edge, Element};
//!
//! let a: Element = Edge::new("road", "A", "B", false).into();
//! let b: Element = Edge::new("road", "B", "A", false).into();
//! assert_eq!(a, b);
//! ```

pub mod model;
pub mod seed;
pub mod value;

pub use model::{Edge, Element, ElementKey, Entity, IdentifierType, Properties};
pub use seed::{DirectedType, ElementSeed, IncludeIncomingOutgoing};
pub use value::{Value, ValueKind};

//! Serialisation
//!
//! Byte-level encoding of values for backends:
//!
//! - **primitive**: String, Boolean and Bytes serialisers
//! - **number**: compact (variable-length) and ordered (fixed-width) numerics
//! - **object**: FreqMap and the bincode-backed Object fallback
//! - **multi**: `MultiSerialiser`, a key-byte multiplexed table
//! - **config**: `SerialiserConfig`, the declarative form used by schemas
//!
//! # Properties
//!
//! A serialiser is *consistent* when equal values always give equal bytes.
//! It *preserves ordering* when byte-lexicographic order of its output
//! matches the natural order of the values. Ordering implies consistency,
//! not the other way around.

pub mod config;
pub mod error;
pub mod multi;
pub mod number;
pub mod object;
pub mod primitive;
pub mod varint;

pub use config::{MultiEntryConfig, SerialiserConfig};
pub use error::{SerialisationError, SerialisationResult};
pub use multi::MultiSerialiser;
pub use number::{
    CompactRawIntegerSerialiser, CompactRawLongSerialiser, OrderedDoubleSerialiser,
    OrderedIntegerSerialiser, OrderedLongSerialiser, RawFloatSerialiser,
};
pub use object::{FreqMapSerialiser, ObjectSerialiser};
pub use primitive::{BooleanSerialiser, BytesSerialiser, StringSerialiser};

use crate::element::{Value, ValueKind};
use std::fmt::Debug;

/// Encodes values of one or more kinds to bytes and back
pub trait Serialiser: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    fn can_handle(&self, kind: ValueKind) -> bool;

    fn serialise(&self, value: &Value) -> SerialisationResult<Vec<u8>>;

    fn deserialise(&self, bytes: &[u8]) -> SerialisationResult<Value>;

    /// Value represented by zero bytes, if the serialiser has one
    fn deserialise_empty(&self) -> Option<Value> {
        None
    }

    fn preserves_object_ordering(&self) -> bool;

    fn is_consistent(&self) -> bool {
        true
    }

    fn unsupported(&self, value: &Value) -> SerialisationError {
        SerialisationError::UnsupportedKind {
            serialiser: self.name(),
            kind: value.kind(),
        }
    }
}

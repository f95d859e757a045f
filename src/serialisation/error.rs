//! Serialisation error types

use crate::element::ValueKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SerialisationError {
    /// No registered serialiser handles the value's type
    #[error("No serialiser registered for values of type {0}")]
    NoSerialiserForKind(ValueKind),

    /// The key byte at the head of multiplexed bytes is not registered
    #[error("No serialiser registered for key {0}")]
    NoSerialiserForKey(u8),

    /// A serialiser was handed a value it does not support
    #[error("{serialiser} cannot handle values of type {kind}")]
    UnsupportedKind {
        serialiser: &'static str,
        kind: ValueKind,
    },

    /// Bytes could not be decoded
    #[error("Corrupt bytes for {serialiser}: {reason}")]
    Corrupt {
        serialiser: &'static str,
        reason: String,
    },

    /// Deserialising an empty byte array where a value is required
    #[error("Cannot deserialise empty bytes with {0}")]
    EmptyInput(&'static str),

    /// Every key in 0..=255 is in use
    #[error("All 256 serialiser keys are in use")]
    KeySpaceExhausted,

    /// Object fallback encoding failed
    #[error("Object encoding error: {0}")]
    Bincode(String),
}

impl From<bincode::Error> for SerialisationError {
    fn from(err: bincode::Error) -> Self {
        SerialisationError::Bincode(err.to_string())
    }
}

pub type SerialisationResult<T> = Result<T, SerialisationError>;

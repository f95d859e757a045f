//! String, boolean and raw byte serialisers

use crate::element::{Value, ValueKind};
use crate::serialisation::error::{SerialisationError, SerialisationResult};
use crate::serialisation::Serialiser;

/// UTF-8 bytes. Byte order of UTF-8 matches code point order.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringSerialiser;

impl Serialiser for StringSerialiser {
    fn name(&self) -> &'static str {
        "String"
    }

    fn can_handle(&self, kind: ValueKind) -> bool {
        kind == ValueKind::String
    }

    fn serialise(&self, value: &Value) -> SerialisationResult<Vec<u8>> {
        match value {
            Value::String(s) => Ok(s.as_bytes().to_vec()),
            other => Err(self.unsupported(other)),
        }
    }

    fn deserialise(&self, bytes: &[u8]) -> SerialisationResult<Value> {
        String::from_utf8(bytes.to_vec())
            .map(Value::String)
            .map_err(|e| SerialisationError::Corrupt {
                serialiser: self.name(),
                reason: e.to_string(),
            })
    }

    fn deserialise_empty(&self) -> Option<Value> {
        Some(Value::String(String::new()))
    }

    fn preserves_object_ordering(&self) -> bool {
        true
    }
}

/// One byte: 0 for false, 1 for true
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanSerialiser;

impl Serialiser for BooleanSerialiser {
    fn name(&self) -> &'static str {
        "Boolean"
    }

    fn can_handle(&self, kind: ValueKind) -> bool {
        kind == ValueKind::Boolean
    }

    fn serialise(&self, value: &Value) -> SerialisationResult<Vec<u8>> {
        match value {
            Value::Boolean(b) => Ok(vec![u8::from(*b)]),
            other => Err(self.unsupported(other)),
        }
    }

    fn deserialise(&self, bytes: &[u8]) -> SerialisationResult<Value> {
        match bytes {
            [0] => Ok(Value::Boolean(false)),
            [1] => Ok(Value::Boolean(true)),
            [] => Err(SerialisationError::EmptyInput(self.name())),
            _ => Err(SerialisationError::Corrupt {
                serialiser: self.name(),
                reason: format!("expected a single 0 or 1 byte, got {:?}", bytes),
            }),
        }
    }

    fn preserves_object_ordering(&self) -> bool {
        true
    }
}

/// Identity encoding for byte arrays
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesSerialiser;

impl Serialiser for BytesSerialiser {
    fn name(&self) -> &'static str {
        "Bytes"
    }

    fn can_handle(&self, kind: ValueKind) -> bool {
        kind == ValueKind::Bytes
    }

    fn serialise(&self, value: &Value) -> SerialisationResult<Vec<u8>> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            other => Err(self.unsupported(other)),
        }
    }

    fn deserialise(&self, bytes: &[u8]) -> SerialisationResult<Value> {
        Ok(Value::Bytes(bytes.to_vec()))
    }

    fn deserialise_empty(&self) -> Option<Value> {
        Some(Value::Bytes(Vec::new()))
    }

    fn preserves_object_ordering(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_round_trip() {
        let s = StringSerialiser;
        for v in ["", "hello world", "ünïcødé"] {
            let bytes = s.serialise(&Value::from(v)).unwrap();
            assert_eq!(s.deserialise(&bytes).unwrap(), Value::from(v));
        }
        assert_eq!(s.serialise(&Value::from("hello world")).unwrap(), b"hello world");
        assert!(s.serialise(&Value::Long(1)).is_err());
    }

    #[test]
    fn test_boolean_rejects_garbage() {
        let s = BooleanSerialiser;
        assert_eq!(s.deserialise(&[1]).unwrap(), Value::Boolean(true));
        assert!(s.deserialise(&[2]).is_err());
        assert!(s.deserialise(&[]).is_err());
    }
}

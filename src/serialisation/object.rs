//! Frequency map and generic object serialisers

use crate::element::{Value, ValueKind};
use crate::serialisation::error::{SerialisationError, SerialisationResult};
use crate::serialisation::varint::{write_vlong, Reader};
use crate::serialisation::Serialiser;
use std::collections::BTreeMap;

/// `[count][keylen key value]*` with vlong lengths and counts.
/// Keys are written in sorted order, so equal maps give equal bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreqMapSerialiser;

impl Serialiser for FreqMapSerialiser {
    fn name(&self) -> &'static str {
        "FreqMap"
    }

    fn can_handle(&self, kind: ValueKind) -> bool {
        kind == ValueKind::FreqMap
    }

    fn serialise(&self, value: &Value) -> SerialisationResult<Vec<u8>> {
        let Value::FreqMap(map) = value else {
            return Err(self.unsupported(value));
        };
        let mut out = Vec::new();
        write_vlong(&mut out, map.len() as i64);
        for (key, count) in map {
            write_vlong(&mut out, key.len() as i64);
            out.extend_from_slice(key.as_bytes());
            write_vlong(&mut out, *count);
        }
        Ok(out)
    }

    fn deserialise(&self, bytes: &[u8]) -> SerialisationResult<Value> {
        if bytes.is_empty() {
            return Ok(Value::FreqMap(BTreeMap::new()));
        }
        let mut reader = Reader::new(bytes, self.name());
        let entries = reader.read_vlong("entry count")?;
        let mut map = BTreeMap::new();
        for _ in 0..entries {
            let len = reader.read_vlong("key length")?;
            let len = usize::try_from(len).map_err(|_| SerialisationError::Corrupt {
                serialiser: self.name(),
                reason: format!("negative key length {}", len),
            })?;
            let key = std::str::from_utf8(reader.read_bytes(len, "key")?)
                .map_err(|e| SerialisationError::Corrupt {
                    serialiser: self.name(),
                    reason: e.to_string(),
                })?
                .to_string();
            let count = reader.read_vlong("count")?;
            map.insert(key, count);
        }
        reader.finish()?;
        Ok(Value::FreqMap(map))
    }

    fn deserialise_empty(&self) -> Option<Value> {
        Some(Value::FreqMap(BTreeMap::new()))
    }

    fn preserves_object_ordering(&self) -> bool {
        false
    }
}

/// Fallback for any value via bincode. Not consistent: the encoding is an
/// implementation detail and may change between versions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectSerialiser;

impl Serialiser for ObjectSerialiser {
    fn name(&self) -> &'static str {
        "Object"
    }

    fn can_handle(&self, _kind: ValueKind) -> bool {
        true
    }

    fn serialise(&self, value: &Value) -> SerialisationResult<Vec<u8>> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialise(&self, bytes: &[u8]) -> SerialisationResult<Value> {
        if bytes.is_empty() {
            return Err(SerialisationError::EmptyInput(self.name()));
        }
        Ok(bincode::deserialize(bytes)?)
    }

    fn preserves_object_ordering(&self) -> bool {
        false
    }

    fn is_consistent(&self) -> bool {
        false
    }
}

//! Numeric serialisers
//!
//! Compact encodings are variable-length and consistent but do not sort.
//! Ordered encodings are fixed-width, big-endian with the sign bit flipped,
//! so byte order equals numeric order.

use crate::element::{Value, ValueKind};
use crate::serialisation::error::{SerialisationError, SerialisationResult};
use crate::serialisation::varint::{write_vlong, Reader};
use crate::serialisation::Serialiser;

#[derive(Debug, Clone, Copy, Default)]
pub struct CompactRawLongSerialiser;

impl Serialiser for CompactRawLongSerialiser {
    fn name(&self) -> &'static str {
        "CompactRawLong"
    }

    fn can_handle(&self, kind: ValueKind) -> bool {
        kind == ValueKind::Long
    }

    fn serialise(&self, value: &Value) -> SerialisationResult<Vec<u8>> {
        match value {
            Value::Long(v) => {
                let mut out = Vec::with_capacity(9);
                write_vlong(&mut out, *v);
                Ok(out)
            }
            other => Err(self.unsupported(other)),
        }
    }

    fn deserialise(&self, bytes: &[u8]) -> SerialisationResult<Value> {
        if bytes.is_empty() {
            return Err(SerialisationError::EmptyInput(self.name()));
        }
        let mut reader = Reader::new(bytes, self.name());
        let v = reader.read_vlong("long")?;
        reader.finish()?;
        Ok(Value::Long(v))
    }

    fn preserves_object_ordering(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CompactRawIntegerSerialiser;

impl Serialiser for CompactRawIntegerSerialiser {
    fn name(&self) -> &'static str {
        "CompactRawInteger"
    }

    fn can_handle(&self, kind: ValueKind) -> bool {
        kind == ValueKind::Integer
    }

    fn serialise(&self, value: &Value) -> SerialisationResult<Vec<u8>> {
        match value {
            Value::Integer(v) => {
                let mut out = Vec::with_capacity(5);
                write_vlong(&mut out, *v as i64);
                Ok(out)
            }
            other => Err(self.unsupported(other)),
        }
    }

    fn deserialise(&self, bytes: &[u8]) -> SerialisationResult<Value> {
        if bytes.is_empty() {
            return Err(SerialisationError::EmptyInput(self.name()));
        }
        let mut reader = Reader::new(bytes, self.name());
        let v = reader.read_vlong("integer")?;
        reader.finish()?;
        i32::try_from(v)
            .map(Value::Integer)
            .map_err(|_| SerialisationError::Corrupt {
                serialiser: self.name(),
                reason: format!("{} does not fit in an integer", v),
            })
    }

    fn preserves_object_ordering(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrderedLongSerialiser;

impl Serialiser for OrderedLongSerialiser {
    fn name(&self) -> &'static str {
        "OrderedLong"
    }

    fn can_handle(&self, kind: ValueKind) -> bool {
        kind == ValueKind::Long
    }

    fn serialise(&self, value: &Value) -> SerialisationResult<Vec<u8>> {
        match value {
            Value::Long(v) => Ok(((*v as u64) ^ (1 << 63)).to_be_bytes().to_vec()),
            other => Err(self.unsupported(other)),
        }
    }

    fn deserialise(&self, bytes: &[u8]) -> SerialisationResult<Value> {
        let raw = fixed::<8>(self.name(), bytes)?;
        Ok(Value::Long((u64::from_be_bytes(raw) ^ (1 << 63)) as i64))
    }

    fn preserves_object_ordering(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrderedIntegerSerialiser;

impl Serialiser for OrderedIntegerSerialiser {
    fn name(&self) -> &'static str {
        "OrderedInteger"
    }

    fn can_handle(&self, kind: ValueKind) -> bool {
        kind == ValueKind::Integer
    }

    fn serialise(&self, value: &Value) -> SerialisationResult<Vec<u8>> {
        match value {
            Value::Integer(v) => Ok(((*v as u32) ^ (1 << 31)).to_be_bytes().to_vec()),
            other => Err(self.unsupported(other)),
        }
    }

    fn deserialise(&self, bytes: &[u8]) -> SerialisationResult<Value> {
        let raw = fixed::<4>(self.name(), bytes)?;
        Ok(Value::Integer((u32::from_be_bytes(raw) ^ (1 << 31)) as i32))
    }

    fn preserves_object_ordering(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrderedDoubleSerialiser;

impl Serialiser for OrderedDoubleSerialiser {
    fn name(&self) -> &'static str {
        "OrderedDouble"
    }

    fn can_handle(&self, kind: ValueKind) -> bool {
        kind == ValueKind::Double
    }

    fn serialise(&self, value: &Value) -> SerialisationResult<Vec<u8>> {
        match value {
            Value::Double(v) => {
                let bits = v.to_bits();
                // negatives: invert everything; positives: flip the sign bit
                let ordered = if bits >> 63 == 1 { !bits } else { bits ^ (1 << 63) };
                Ok(ordered.to_be_bytes().to_vec())
            }
            other => Err(self.unsupported(other)),
        }
    }

    fn deserialise(&self, bytes: &[u8]) -> SerialisationResult<Value> {
        let ordered = u64::from_be_bytes(fixed::<8>(self.name(), bytes)?);
        let bits = if ordered >> 63 == 1 {
            ordered ^ (1 << 63)
        } else {
            !ordered
        };
        Ok(Value::Double(f64::from_bits(bits)))
    }

    fn preserves_object_ordering(&self) -> bool {
        true
    }
}

/// Four little-endian bytes of the IEEE 754 bit pattern
#[derive(Debug, Clone, Copy, Default)]
pub struct RawFloatSerialiser;

impl Serialiser for RawFloatSerialiser {
    fn name(&self) -> &'static str {
        "RawFloat"
    }

    fn can_handle(&self, kind: ValueKind) -> bool {
        kind == ValueKind::Float
    }

    fn serialise(&self, value: &Value) -> SerialisationResult<Vec<u8>> {
        match value {
            Value::Float(v) => Ok(v.to_bits().to_le_bytes().to_vec()),
            other => Err(self.unsupported(other)),
        }
    }

    fn deserialise(&self, bytes: &[u8]) -> SerialisationResult<Value> {
        let raw = fixed::<4>(self.name(), bytes)?;
        Ok(Value::Float(f32::from_bits(u32::from_le_bytes(raw))))
    }

    fn preserves_object_ordering(&self) -> bool {
        false
    }
}

fn fixed<const N: usize>(serialiser: &'static str, bytes: &[u8]) -> SerialisationResult<[u8; N]> {
    if bytes.is_empty() {
        return Err(SerialisationError::EmptyInput(serialiser));
    }
    bytes.try_into().map_err(|_| SerialisationError::Corrupt {
        serialiser,
        reason: format!("expected {} bytes, got {}", N, bytes.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(s: &dyn Serialiser, v: Value) {
        let bytes = s.serialise(&v).unwrap();
        assert_eq!(s.deserialise(&bytes).unwrap(), v, "{} via {}", v, s.name());
    }

    #[test]
    fn test_boundary_round_trips() {
        for v in [i64::MIN, -1, 0, 1, 420, i64::MAX] {
            round_trip(&CompactRawLongSerialiser, Value::Long(v));
            round_trip(&OrderedLongSerialiser, Value::Long(v));
        }
        for v in [i32::MIN, 0, i32::MAX] {
            round_trip(&CompactRawIntegerSerialiser, Value::Integer(v));
            round_trip(&OrderedIntegerSerialiser, Value::Integer(v));
        }
        for v in [f64::MIN, -0.5, 0.0, 0.5, f64::MAX, f64::INFINITY] {
            round_trip(&OrderedDoubleSerialiser, Value::Double(v));
        }
        for v in [f32::MIN, 0.0, 1.5, f32::MAX] {
            round_trip(&RawFloatSerialiser, Value::Float(v));
        }
    }

    #[test]
    fn test_ordered_encodings_sort() {
        let longs = [i64::MIN, -1000, -1, 0, 1, 1000, i64::MAX];
        let encoded: Vec<Vec<u8>> = longs
            .iter()
            .map(|v| OrderedLongSerialiser.serialise(&Value::Long(*v)).unwrap())
            .collect();
        assert!(encoded.windows(2).all(|w| w[0] < w[1]));

        let doubles = [f64::NEG_INFINITY, -2.5, -0.1, 0.0, 0.1, 2.5, f64::INFINITY];
        let encoded: Vec<Vec<u8>> = doubles
            .iter()
            .map(|v| OrderedDoubleSerialiser.serialise(&Value::Double(*v)).unwrap())
            .collect();
        assert!(encoded.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_raw_float_layout() {
        let bytes = RawFloatSerialiser.serialise(&Value::Float(1.0)).unwrap();
        assert_eq!(bytes, vec![0x00, 0x00, 0x80, 0x3F]);
    }

    #[test]
    fn test_compact_long_layout() {
        let bytes = CompactRawLongSerialiser.serialise(&Value::Long(420)).unwrap();
        assert_eq!(bytes, vec![0x8E, 0x01, 0xA4]);
        assert!(CompactRawLongSerialiser.deserialise(&[]).is_err());
    }
}

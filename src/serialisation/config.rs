//! Declarative serialiser configuration, as found in schema documents

use crate::element::ValueKind;
use crate::serialisation::error::SerialisationResult;
use crate::serialisation::{
    BooleanSerialiser, BytesSerialiser, CompactRawIntegerSerialiser, CompactRawLongSerialiser,
    FreqMapSerialiser, MultiSerialiser, ObjectSerialiser, OrderedDoubleSerialiser,
    OrderedIntegerSerialiser, OrderedLongSerialiser, RawFloatSerialiser, Serialiser,
    StringSerialiser,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum SerialiserConfig {
    #[default]
    String,
    Boolean,
    Bytes,
    CompactRawLong,
    CompactRawInteger,
    OrderedLong,
    OrderedInteger,
    OrderedDouble,
    RawFloat,
    FreqMap,
    Object,
    Multi { entries: Vec<MultiEntryConfig> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiEntryConfig {
    /// Omit to take the next free key
    #[serde(default)]
    pub key: Option<u8>,
    pub kind: ValueKind,
    pub serialiser: SerialiserConfig,
}

impl SerialiserConfig {
    /// The serialiser used when a type declares none
    pub fn default_for(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Boolean => SerialiserConfig::Boolean,
            ValueKind::Integer => SerialiserConfig::CompactRawInteger,
            ValueKind::Long => SerialiserConfig::CompactRawLong,
            ValueKind::Float => SerialiserConfig::RawFloat,
            ValueKind::Double => SerialiserConfig::OrderedDouble,
            ValueKind::String => SerialiserConfig::String,
            ValueKind::Bytes => SerialiserConfig::Bytes,
            ValueKind::FreqMap => SerialiserConfig::FreqMap,
            ValueKind::List => SerialiserConfig::Object,
        }
    }

    pub fn build(&self) -> SerialisationResult<Arc<dyn Serialiser>> {
        let serialiser: Arc<dyn Serialiser> = match self {
            SerialiserConfig::String => Arc::new(StringSerialiser),
            SerialiserConfig::Boolean => Arc::new(BooleanSerialiser),
            SerialiserConfig::Bytes => Arc::new(BytesSerialiser),
            SerialiserConfig::CompactRawLong => Arc::new(CompactRawLongSerialiser),
            SerialiserConfig::CompactRawInteger => Arc::new(CompactRawIntegerSerialiser),
            SerialiserConfig::OrderedLong => Arc::new(OrderedLongSerialiser),
            SerialiserConfig::OrderedInteger => Arc::new(OrderedIntegerSerialiser),
            SerialiserConfig::OrderedDouble => Arc::new(OrderedDoubleSerialiser),
            SerialiserConfig::RawFloat => Arc::new(RawFloatSerialiser),
            SerialiserConfig::FreqMap => Arc::new(FreqMapSerialiser),
            SerialiserConfig::Object => Arc::new(ObjectSerialiser),
            SerialiserConfig::Multi { entries } => {
                let mut multi = MultiSerialiser::new();
                for entry in entries {
                    let inner = entry.serialiser.build()?;
                    match entry.key {
                        Some(key) => multi.add(key, inner, entry.kind)?,
                        None => {
                            multi.add_auto(inner, entry.kind)?;
                        }
                    }
                }
                Arc::new(multi)
            }
        };
        Ok(serialiser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Value;

    #[test]
    fn test_multi_from_json() {
        let json = r#"{
            "class": "Multi",
            "entries": [
                {"key": 0, "kind": "String", "serialiser": {"class": "String"}},
                {"kind": "Long", "serialiser": {"class": "CompactRawLong"}}
            ]
        }"#;
        let config: SerialiserConfig = serde_json::from_str(json).unwrap();
        let serialiser = config.build().unwrap();
        assert_eq!(
            serialiser.serialise(&Value::Long(420)).unwrap(),
            vec![1, 0x8E, 1, 0xA4]
        );
    }

    #[test]
    fn test_defaults_handle_their_kind() {
        for kind in ValueKind::ALL {
            let serialiser = SerialiserConfig::default_for(kind).build().unwrap();
            assert!(serialiser.can_handle(kind), "{}", kind);
        }
    }
}

//! Multiplexed serialisation
//!
//! A table of `(key, kind, serialiser)` entries. Output layout is
//! `[key:1][payload:N]`.
//!
//! Lookup rules:
//! - encoding picks the most recently registered entry for the value's kind
//! - decoding picks the entry registered under the leading key byte
//! - re-registering a key evicts only that key's entry; other kinds keep
//!   resolving to their remaining entries

use crate::element::{Value, ValueKind};
use crate::serialisation::error::{SerialisationError, SerialisationResult};
use crate::serialisation::Serialiser;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct MultiEntry {
    key: u8,
    kind: ValueKind,
    serialiser: Arc<dyn Serialiser>,
}

#[derive(Debug, Clone, Default)]
pub struct MultiSerialiser {
    /// Registration order, oldest first
    entries: Vec<MultiEntry>,
}

impl MultiSerialiser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `serialiser` for `kind` under `key`, evicting whatever the
    /// key held before
    pub fn add(
        &mut self,
        key: u8,
        serialiser: Arc<dyn Serialiser>,
        kind: ValueKind,
    ) -> SerialisationResult<()> {
        if !serialiser.can_handle(kind) {
            return Err(SerialisationError::UnsupportedKind {
                serialiser: serialiser.name(),
                kind,
            });
        }
        if let Some(pos) = self.entries.iter().position(|e| e.key == key) {
            let evicted = self.entries.remove(pos);
            tracing::debug!(
                key,
                evicted = evicted.serialiser.name(),
                replacement = serialiser.name(),
                "Replacing multi-serialiser key"
            );
        }
        self.entries.push(MultiEntry {
            key,
            kind,
            serialiser,
        });
        Ok(())
    }

    /// Register under the next key after the highest one in use
    pub fn add_auto(&mut self, serialiser: Arc<dyn Serialiser>, kind: ValueKind) -> SerialisationResult<u8> {
        let key = match self.entries.iter().map(|e| e.key).max() {
            None => 0,
            Some(u8::MAX) => return Err(SerialisationError::KeySpaceExhausted),
            Some(max) => max + 1,
        };
        self.add(key, serialiser, kind)?;
        Ok(key)
    }

    /// Builder method: register and return self
    pub fn with(mut self, key: u8, serialiser: Arc<dyn Serialiser>, kind: ValueKind) -> SerialisationResult<Self> {
        self.add(key, serialiser, kind)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key currently used to encode values of `kind`
    pub fn key_for(&self, kind: ValueKind) -> Option<u8> {
        self.entry_for_kind(kind).map(|e| e.key)
    }

    fn entry_for_kind(&self, kind: ValueKind) -> Option<&MultiEntry> {
        self.entries.iter().rev().find(|e| e.kind == kind)
    }

    fn entry_for_key(&self, key: u8) -> Option<&MultiEntry> {
        self.entries.iter().find(|e| e.key == key)
    }
}

impl Serialiser for MultiSerialiser {
    fn name(&self) -> &'static str {
        "Multi"
    }

    fn can_handle(&self, kind: ValueKind) -> bool {
        self.entry_for_kind(kind).is_some()
    }

    fn serialise(&self, value: &Value) -> SerialisationResult<Vec<u8>> {
        let entry = self
            .entry_for_kind(value.kind())
            .ok_or(SerialisationError::NoSerialiserForKind(value.kind()))?;
        let payload = entry.serialiser.serialise(value)?;
        let mut out = Vec::with_capacity(payload.len() + 1);
        out.push(entry.key);
        out.extend_from_slice(&payload);
        Ok(out)
    }

    fn deserialise(&self, bytes: &[u8]) -> SerialisationResult<Value> {
        let (&key, payload) = bytes
            .split_first()
            .ok_or(SerialisationError::EmptyInput(self.name()))?;
        let entry = self
            .entry_for_key(key)
            .ok_or(SerialisationError::NoSerialiserForKey(key))?;
        entry.serialiser.deserialise(payload)
    }

    /// Interleaving value domains behind a key byte does not preserve a
    /// global order, so only a single-entry table qualifies
    fn preserves_object_ordering(&self) -> bool {
        match self.entries.as_slice() {
            [only] => only.serialiser.preserves_object_ordering(),
            _ => false,
        }
    }

    fn is_consistent(&self) -> bool {
        self.entries.iter().all(|e| e.serialiser.is_consistent())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialisation::{
        CompactRawLongSerialiser, OrderedIntegerSerialiser, OrderedLongSerialiser,
        StringSerialiser, ObjectSerialiser,
    };

    fn historic() -> MultiSerialiser {
        MultiSerialiser::new()
            .with(0, Arc::new(StringSerialiser), ValueKind::String)
            .and_then(|m| m.with(1, Arc::new(CompactRawLongSerialiser), ValueKind::Long))
            .unwrap()
    }

    #[test]
    fn test_historic_layouts() {
        let multi = historic();

        let mut expected = vec![0u8];
        expected.extend_from_slice(b"hello world");
        assert_eq!(multi.serialise(&Value::from("hello world")).unwrap(), expected);
        assert_eq!(multi.deserialise(&expected).unwrap(), Value::from("hello world"));

        // 420L as signed bytes: [1, -114, 1, -92]
        let bytes = multi.serialise(&Value::Long(420)).unwrap();
        assert_eq!(bytes, vec![1, 0x8E, 1, 0xA4]);
        assert_eq!(multi.deserialise(&bytes).unwrap(), Value::Long(420));
    }

    #[test]
    fn test_latest_registration_wins_for_encoding() {
        let mut multi = historic();
        let old_bytes = multi.serialise(&Value::Long(420)).unwrap();

        multi.add(2, Arc::new(OrderedLongSerialiser), ValueKind::Long).unwrap();
        let new_bytes = multi.serialise(&Value::Long(420)).unwrap();
        assert_eq!(new_bytes[0], 2);
        assert_eq!(new_bytes.len(), 9);

        // bytes under the old key still decode
        assert_eq!(multi.deserialise(&old_bytes).unwrap(), Value::Long(420));
        assert_eq!(multi.deserialise(&new_bytes).unwrap(), Value::Long(420));
    }

    #[test]
    fn test_key_reuse_evicts_only_that_key() {
        let mut multi = MultiSerialiser::new()
            .with(0, Arc::new(CompactRawLongSerialiser), ValueKind::Long)
            .and_then(|m| m.with(1, Arc::new(OrderedLongSerialiser), ValueKind::Long))
            .unwrap();
        assert_eq!(multi.key_for(ValueKind::Long), Some(1));

        multi.add(1, Arc::new(StringSerialiser), ValueKind::String).unwrap();
        assert_eq!(multi.key_for(ValueKind::Long), Some(0));
        assert_eq!(multi.key_for(ValueKind::String), Some(1));
        assert_eq!(
            multi.deserialise(&multi.serialise(&Value::Long(-5)).unwrap()).unwrap(),
            Value::Long(-5)
        );
    }

    #[test]
    fn test_missing_lookups() {
        let multi = historic();
        assert!(matches!(
            multi.serialise(&Value::Double(1.0)),
            Err(SerialisationError::NoSerialiserForKind(ValueKind::Double))
        ));
        assert!(matches!(
            multi.deserialise(&[9, 1, 2]),
            Err(SerialisationError::NoSerialiserForKey(9))
        ));
        assert!(matches!(multi.deserialise(&[]), Err(SerialisationError::EmptyInput(_))));
    }

    #[test]
    fn test_auto_keys() {
        let mut multi = MultiSerialiser::new();
        assert_eq!(multi.add_auto(Arc::new(StringSerialiser), ValueKind::String).unwrap(), 0);
        assert_eq!(
            multi.add_auto(Arc::new(OrderedIntegerSerialiser), ValueKind::Integer).unwrap(),
            1
        );
        multi.add(u8::MAX, Arc::new(ObjectSerialiser), ValueKind::List).unwrap();
        assert!(matches!(
            multi.add_auto(Arc::new(OrderedLongSerialiser), ValueKind::Long),
            Err(SerialisationError::KeySpaceExhausted)
        ));
    }

    #[test]
    fn test_ordering_and_consistency() {
        let single = MultiSerialiser::new()
            .with(0, Arc::new(OrderedLongSerialiser), ValueKind::Long)
            .unwrap();
        assert!(single.preserves_object_ordering());
        assert!(!historic().preserves_object_ordering());
        assert!(historic().is_consistent());

        let with_object = historic()
            .with(2, Arc::new(ObjectSerialiser), ValueKind::List)
            .unwrap();
        assert!(!with_object.is_consistent());
    }

    #[test]
    fn test_rejects_mismatched_registration() {
        let mut multi = MultiSerialiser::new();
        assert!(multi.add(0, Arc::new(StringSerialiser), ValueKind::Long).is_err());
    }
}

//! Map Index - in-memory element storage
//!
//! Elements live in a slot vector. Two lookups point into it:
//! - merge key → slot, so ingest aggregation folds duplicates in place
//! - serialised vertex → slots, ordered by the vertex bytes so range scans
//!   follow the serialiser's ordering

use crate::element::{Element, Value};
use crate::pipeline::{AggregationKey, ElementAggregator};
use crate::serialisation::Serialiser;
use crate::store::error::StoreResult;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;

#[derive(Debug, Default)]
pub struct MapIndex {
    /// Stored elements in insertion order
    elements: Vec<Element>,
    /// Merge key → slot of the element it merged into
    aggregated: HashMap<AggregationKey, usize>,
    /// Serialised vertex → slots of elements at or touching it
    by_vertex: BTreeMap<Vec<u8>, BTreeSet<usize>>,
}

impl MapIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a batch of elements. With an aggregator, an element whose merge
    /// key is already present is folded into the stored one.
    ///
    /// The batch is all-or-nothing: if any element fails to serialise or
    /// merge, the index is restored to its state before the call.
    pub fn insert_all(
        &mut self,
        elements: impl IntoIterator<Item = Element>,
        aggregator: Option<&ElementAggregator>,
        serialiser: &dyn Serialiser,
    ) -> StoreResult<()> {
        let mut checkpoint = Checkpoint::new(self.elements.len());
        for element in elements {
            if let Err(e) = self.insert_one(element, aggregator, serialiser, &mut checkpoint) {
                self.restore(checkpoint);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Store a single element, all-or-nothing
    pub fn insert(
        &mut self,
        element: Element,
        aggregator: Option<&ElementAggregator>,
        serialiser: &dyn Serialiser,
    ) -> StoreResult<()> {
        self.insert_all([element], aggregator, serialiser)
    }

    fn insert_one(
        &mut self,
        element: Element,
        aggregator: Option<&ElementAggregator>,
        serialiser: &dyn Serialiser,
        checkpoint: &mut Checkpoint,
    ) -> StoreResult<()> {
        let key = match aggregator {
            Some(aggregator) if aggregator.is_aggregated(&element) => Some(aggregator.key(&element)),
            _ => None,
        };

        if let (Some(key), Some(aggregator)) = (&key, aggregator) {
            if let Some(&slot) = self.aggregated.get(key) {
                if slot < checkpoint.len && !checkpoint.merged.contains_key(&slot) {
                    checkpoint.merged.insert(slot, self.elements[slot].clone());
                }
                aggregator.merge_into(&mut self.elements[slot], element)?;
                return Ok(());
            }
        }

        // Encode every vertex before touching the lookups
        let vertices = element
            .vertices()
            .into_iter()
            .map(|vertex| serialiser.serialise(vertex))
            .collect::<Result<Vec<_>, _>>()?;

        let slot = self.elements.len();
        for bytes in vertices {
            self.by_vertex.entry(bytes).or_default().insert(slot);
        }
        if let Some(key) = key {
            self.aggregated.insert(key, slot);
        }
        self.elements.push(element);
        Ok(())
    }

    /// Undo everything since `checkpoint` was taken
    fn restore(&mut self, checkpoint: Checkpoint) {
        let len = checkpoint.len;
        if self.elements.len() > len {
            self.elements.truncate(len);
            self.aggregated.retain(|_, slot| *slot < len);
            self.by_vertex.retain(|_, slots| {
                slots.retain(|slot| *slot < len);
                !slots.is_empty()
            });
        }
        for (slot, element) in checkpoint.merged {
            self.elements[slot] = element;
        }
    }

    pub fn get(&self, slot: usize) -> Option<&Element> {
        self.elements.get(slot)
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Slots of elements indexed under `vertex`
    pub fn slots_at(&self, vertex: &Value, serialiser: &dyn Serialiser) -> StoreResult<Vec<usize>> {
        let bytes = serialiser.serialise(vertex)?;
        Ok(self
            .by_vertex
            .get(&bytes)
            .map(|slots| slots.iter().copied().collect())
            .unwrap_or_default())
    }

    /// Slots of elements indexed under any vertex in `[start, end]`, compared
    /// by serialised bytes. An inverted range is empty.
    pub fn slots_in_range(&self, start: &[u8], end: &[u8]) -> BTreeSet<usize> {
        if start > end {
            return BTreeSet::new();
        }
        self.by_vertex
            .range::<[u8], _>((Bound::Included(start), Bound::Included(end)))
            .flat_map(|(_, slots)| slots.iter().copied())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of distinct serialised vertices indexed
    pub fn vertex_count(&self) -> usize {
        self.by_vertex.len()
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.aggregated.clear();
        self.by_vertex.clear();
    }
}

/// Index state at the start of a batch
struct Checkpoint {
    /// Element count before the batch
    len: usize,
    /// Pre-merge copies of elements stored before the batch
    merged: HashMap<usize, Element>,
}

impl Checkpoint {
    fn new(len: usize) -> Self {
        Self {
            len,
            merged: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Edge, Entity, ValueKind};
    use crate::function::BinaryOperator;
    use crate::schema::{GroupDefinition, Schema, TypeDefinition};
    use crate::serialisation::StringSerialiser;

    fn schema() -> Schema {
        Schema::builder()
            .entity("person", GroupDefinition::new().vertex("string").property("count", "long"))
            .edge(
                "knows",
                GroupDefinition::new().endpoints("string", "string").property("count", "long"),
            )
            .type_definition("string", TypeDefinition::new(ValueKind::String))
            .type_definition(
                "long",
                TypeDefinition::new(ValueKind::Long).aggregate_function(BinaryOperator::Sum),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_insert_merges_duplicates() {
        let schema = schema();
        let aggregator = ElementAggregator::new(&schema);
        let mut index = MapIndex::new();
        for _ in 0..2 {
            let element: Element = Entity::new("person", "v1").property("count", 3i64).into();
            index.insert(element, Some(&aggregator), &StringSerialiser).unwrap();
        }
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(0).unwrap().get_property("count"), Some(&Value::Long(6)));

        let element: Element = Entity::new("person", "v1").property("count", 3i64).into();
        index.insert(element, None, &StringSerialiser).unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_vertex_lookups() {
        let mut index = MapIndex::new();
        let edge: Element = Edge::new("knows", "a", "c", true).into();
        index.insert(edge, None, &StringSerialiser).unwrap();
        index
            .insert(Entity::new("person", "b").into(), None, &StringSerialiser)
            .unwrap();

        assert_eq!(index.slots_at(&"c".into(), &StringSerialiser).unwrap(), vec![0]);
        assert!(index.slots_at(&"d".into(), &StringSerialiser).unwrap().is_empty());

        let range = index.slots_in_range(b"b", b"c");
        assert_eq!(range.into_iter().collect::<Vec<_>>(), vec![0, 1]);
        assert!(index.slots_in_range(b"c", b"a").is_empty());

        index.clear();
        assert!(index.is_empty());
    }

    #[test]
    fn test_failed_insert_leaves_no_vertex_entries() {
        let mut index = MapIndex::new();
        index
            .insert(Entity::new("person", "a").into(), None, &StringSerialiser)
            .unwrap();

        // "b" encodes, 5 does not
        let edge: Element = Edge::new("knows", "b", 5i64, true).into();
        assert!(index.insert(edge, None, &StringSerialiser).is_err());

        assert_eq!(index.len(), 1);
        assert_eq!(index.vertex_count(), 1);
        assert!(index.slots_at(&"b".into(), &StringSerialiser).unwrap().is_empty());
        assert_eq!(index.slots_in_range(b"a", b"z").into_iter().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_failed_batch_is_rolled_back() {
        let schema = schema();
        let aggregator = ElementAggregator::new(&schema);
        let mut index = MapIndex::new();
        let stored: Element = Entity::new("person", "a").property("count", 1i64).into();
        index.insert(stored, Some(&aggregator), &StringSerialiser).unwrap();

        let batch: Vec<Element> = vec![
            Entity::new("person", "a").property("count", 2i64).into(),
            Entity::new("person", "c").property("count", 3i64).into(),
            Edge::new("knows", "c", "d", true).into(),
            Entity::new("person", 7i64).into(),
        ];
        assert!(index.insert_all(batch, Some(&aggregator), &StringSerialiser).is_err());

        assert_eq!(index.len(), 1);
        assert_eq!(index.vertex_count(), 1);
        assert_eq!(index.get(0).unwrap().get_property("count"), Some(&Value::Long(1)));
        assert!(index.slots_at(&"c".into(), &StringSerialiser).unwrap().is_empty());

        // Merge keys from the failed batch are gone too
        let again: Element = Entity::new("person", "c").property("count", 4i64).into();
        index.insert(again, Some(&aggregator), &StringSerialiser).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(1).unwrap().get_property("count"), Some(&Value::Long(4)));
    }
}

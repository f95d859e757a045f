//! Element aggregation
//!
//! Elements sharing a group, a normalised identity and the same groupBy
//! values merge into one. Every other property is folded pairwise, in
//! arrival order, with its aggregate function.

use crate::element::{Element, ElementKey, Value};
use crate::function::{BinaryOperator, FunctionResult};
use crate::operation::view::View;
use crate::schema::{GroupDefinition, Schema};
use std::collections::HashMap;

/// Merge key: identity plus the groupBy values, in groupBy order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregationKey {
    pub element: ElementKey,
    pub group_by: Vec<Option<Value>>,
}

#[derive(Debug, Clone, Default)]
struct GroupRules {
    aggregate: bool,
    group_by: Vec<String>,
    functions: HashMap<String, BinaryOperator>,
}

/// Aggregation rules for every schema group, with optional view overrides
#[derive(Debug, Clone, Default)]
pub struct ElementAggregator {
    rules: HashMap<(bool, String), GroupRules>,
}

impl ElementAggregator {
    pub fn new(schema: &Schema) -> Self {
        Self::build(schema, None)
    }

    /// Apply the view's groupBy and aggregator overrides
    pub fn with_view(schema: &Schema, view: &View) -> Self {
        Self::build(schema, Some(view))
    }

    fn build(schema: &Schema, view: Option<&View>) -> Self {
        let groups = schema
            .entities()
            .iter()
            .map(|(g, d)| (false, g, d))
            .chain(schema.edges().iter().map(|(g, d)| (true, g, d)));

        let mut rules = HashMap::new();
        for (is_edge, group, definition) in groups {
            let mut group_rules = Self::schema_rules(schema, definition);
            if let Some(overrides) = view.and_then(|v| v.definition(group, is_edge)) {
                if let Some(group_by) = overrides.group_by {
                    group_rules.group_by = group_by;
                }
                group_rules.functions.extend(overrides.aggregator);
            }
            rules.insert((is_edge, group.clone()), group_rules);
        }
        Self { rules }
    }

    fn schema_rules(schema: &Schema, definition: &GroupDefinition) -> GroupRules {
        let functions = definition
            .properties
            .iter()
            .filter_map(|(name, type_name)| {
                let op = schema.get_type(type_name)?.aggregate_function.clone()?;
                Some((name.clone(), op))
            })
            .collect();
        GroupRules {
            aggregate: definition.aggregate,
            group_by: definition.group_by.clone(),
            functions,
        }
    }

    fn rules_for(&self, element: &Element) -> Option<&GroupRules> {
        self.rules
            .get(&(element.is_edge(), element.group().to_string()))
    }

    /// Whether elements of this group merge at all
    pub fn is_aggregated(&self, element: &Element) -> bool {
        self.rules_for(element).is_some_and(|r| r.aggregate)
    }

    pub fn key(&self, element: &Element) -> AggregationKey {
        let group_by = self
            .rules_for(element)
            .map(|r| {
                r.group_by
                    .iter()
                    .map(|p| element.get_property(p).cloned())
                    .collect()
            })
            .unwrap_or_default();
        AggregationKey {
            element: element.key(),
            group_by,
        }
    }

    /// Fold `incoming` into `existing`; both must share a key
    pub fn merge_into(&self, existing: &mut Element, incoming: Element) -> FunctionResult<()> {
        let rules = self.rules_for(existing);
        let incoming_properties = match incoming {
            Element::Entity(e) => e.properties,
            Element::Edge(e) => e.properties,
        };

        for (name, value) in incoming_properties {
            if rules.is_some_and(|r| r.group_by.contains(&name)) {
                continue;
            }
            let properties = existing.properties_mut();
            match properties.get_mut(&name) {
                Some(current) => {
                    if let Some(op) = rules.and_then(|r| r.functions.get(&name)) {
                        *current = op.apply(current, &value)?;
                    }
                }
                None => {
                    properties.insert(name, value);
                }
            }
        }
        Ok(())
    }

    /// Merge a batch, keeping the order in which keys first appear.
    /// Elements of non-aggregating groups pass through unchanged.
    pub fn aggregate(&self, elements: impl IntoIterator<Item = Element>) -> FunctionResult<Vec<Element>> {
        let mut output: Vec<Element> = Vec::new();
        let mut slots: HashMap<AggregationKey, usize> = HashMap::new();

        for element in elements {
            if !self.is_aggregated(&element) {
                output.push(element);
                continue;
            }
            let key = self.key(&element);
            match slots.get(&key) {
                Some(&slot) => self.merge_into(&mut output[slot], element)?,
                None => {
                    slots.insert(key, output.len());
                    output.push(element);
                }
            }
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Edge, Entity, ValueKind};
    use crate::operation::view::ViewElementDefinition;
    use crate::schema::TypeDefinition;

    fn schema() -> Schema {
        Schema::builder()
            .entity(
                "visit",
                GroupDefinition::new()
                    .vertex("string")
                    .property("count", "long")
                    .property("day", "string.first")
                    .group_by("day"),
            )
            .edge(
                "road",
                GroupDefinition::new()
                    .endpoints("string", "string")
                    .property("count", "long"),
            )
            .edge(
                "log",
                GroupDefinition::new()
                    .endpoints("string", "string")
                    .property("count", "long")
                    .aggregate(false),
            )
            .type_definition("string", TypeDefinition::new(ValueKind::String))
            .type_definition(
                "string.first",
                TypeDefinition::new(ValueKind::String).aggregate_function(BinaryOperator::First),
            )
            .type_definition(
                "long",
                TypeDefinition::new(ValueKind::Long).aggregate_function(BinaryOperator::Sum),
            )
            .build()
            .unwrap()
    }

    fn visit(vertex: &str, day: &str, count: i64) -> Element {
        Entity::new("visit", vertex)
            .property("day", day)
            .property("count", count)
            .into()
    }

    #[test]
    fn test_group_by_splits_merges() {
        let aggregator = ElementAggregator::new(&schema());
        let merged = aggregator
            .aggregate(vec![
                visit("a", "mon", 1),
                visit("a", "tue", 2),
                visit("a", "mon", 3),
            ])
            .unwrap();
        assert_eq!(merged, vec![visit("a", "mon", 4), visit("a", "tue", 2)]);
    }

    #[test]
    fn test_undirected_edges_merge_across_orientation() {
        let aggregator = ElementAggregator::new(&schema());
        let ab: Element = Edge::new("road", "A", "B", false).property("count", 1i64).into();
        let ba: Element = Edge::new("road", "B", "A", false).property("count", 2i64).into();
        let directed: Element = Edge::new("road", "B", "A", true).property("count", 5i64).into();

        let merged = aggregator.aggregate(vec![ab, ba, directed.clone()]).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].get_property("count"), Some(&Value::Long(3)));
        assert_eq!(merged[1], directed);
    }

    #[test]
    fn test_non_aggregating_groups_pass_through() {
        let aggregator = ElementAggregator::new(&schema());
        let log: Element = Edge::new("log", "A", "B", true).property("count", 1i64).into();
        let merged = aggregator.aggregate(vec![log.clone(), log]).unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_reaggregation_is_idempotent() {
        let aggregator = ElementAggregator::new(&schema());
        let once = aggregator
            .aggregate(vec![visit("a", "mon", 1), visit("a", "mon", 3), visit("b", "mon", 1)])
            .unwrap();
        let twice = aggregator.aggregate(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_view_overrides_group_by_and_function() {
        let view = View::new().entity(
            "visit",
            ViewElementDefinition::new()
                .group_by(vec![])
                .aggregator("count", BinaryOperator::Max)
                .aggregator("day", BinaryOperator::Max),
        );
        let aggregator = ElementAggregator::with_view(&schema(), &view);
        let merged = aggregator
            .aggregate(vec![visit("a", "mon", 1), visit("a", "tue", 7), visit("a", "mon", 3)])
            .unwrap();
        assert_eq!(merged, vec![visit("a", "tue", 7)]);
    }

    #[test]
    fn test_incompatible_values_fail() {
        let aggregator = ElementAggregator::new(&schema());
        let bad: Element = Entity::new("visit", "a")
            .property("day", "mon")
            .property("count", "many")
            .into();
        assert!(aggregator.aggregate(vec![visit("a", "mon", 1), bad]).is_err());
    }
}

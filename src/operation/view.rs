//! Views
//!
//! A view narrows a query to some groups and layers per-group processing on
//! top of the schema: property selection, groupBy and aggregator overrides,
//! and the three filter stages around aggregation and transformation.
//!
//! A view that lists no groups covers every group in the schema. The
//! `globalElements` definition is merged into every group's definition.

use crate::element::Element;
use crate::function::BinaryOperator;
use crate::pipeline::{ElementFilter, ElementTransformer};
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewElementDefinition {
    /// Replaces the schema's groupBy for query-time aggregation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<String>>,

    /// Properties to keep; `None` keeps all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_properties: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_aggregation_filter: Option<ElementFilter>,

    /// Per-property aggregate function overrides
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aggregator: BTreeMap<String, BinaryOperator>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_aggregation_filter: Option<ElementFilter>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformer: Option<ElementTransformer>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_transformation_filter: Option<ElementFilter>,
}

impl ViewElementDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group_by(mut self, properties: Vec<String>) -> Self {
        self.group_by = Some(properties);
        self
    }

    pub fn properties(mut self, properties: Vec<String>) -> Self {
        self.properties = Some(properties);
        self
    }

    pub fn exclude_properties(mut self, properties: Vec<String>) -> Self {
        self.exclude_properties = properties;
        self
    }

    pub fn pre_aggregation_filter(mut self, filter: ElementFilter) -> Self {
        self.pre_aggregation_filter = Some(filter);
        self
    }

    pub fn aggregator(mut self, property: impl Into<String>, op: BinaryOperator) -> Self {
        self.aggregator.insert(property.into(), op);
        self
    }

    pub fn post_aggregation_filter(mut self, filter: ElementFilter) -> Self {
        self.post_aggregation_filter = Some(filter);
        self
    }

    pub fn transformer(mut self, transformer: ElementTransformer) -> Self {
        self.transformer = Some(transformer);
        self
    }

    pub fn post_transformation_filter(mut self, filter: ElementFilter) -> Self {
        self.post_transformation_filter = Some(filter);
        self
    }

    /// Whether the property survives selection
    pub fn keeps_property(&self, name: &str) -> bool {
        if self.exclude_properties.iter().any(|p| p == name) {
            return false;
        }
        match &self.properties {
            Some(kept) => kept.iter().any(|p| p == name),
            None => true,
        }
    }

    /// Global settings underneath this definition. Filters and transformers
    /// from both apply, global first; selections and groupBy prefer `self`.
    pub fn merged_with(&self, global: &ViewElementDefinition) -> ViewElementDefinition {
        let combine_filters = |g: &Option<ElementFilter>, s: &Option<ElementFilter>| match (g, s) {
            (Some(g), Some(s)) => Some(g.clone().and(s)),
            (g, s) => s.clone().or_else(|| g.clone()),
        };

        let mut exclude_properties = global.exclude_properties.clone();
        for p in &self.exclude_properties {
            if !exclude_properties.contains(p) {
                exclude_properties.push(p.clone());
            }
        }

        let mut aggregator = global.aggregator.clone();
        aggregator.extend(self.aggregator.iter().map(|(k, v)| (k.clone(), v.clone())));

        ViewElementDefinition {
            group_by: self.group_by.clone().or_else(|| global.group_by.clone()),
            properties: self.properties.clone().or_else(|| global.properties.clone()),
            exclude_properties,
            pre_aggregation_filter: combine_filters(&global.pre_aggregation_filter, &self.pre_aggregation_filter),
            aggregator,
            post_aggregation_filter: combine_filters(&global.post_aggregation_filter, &self.post_aggregation_filter),
            transformer: match (&global.transformer, &self.transformer) {
                (Some(g), Some(s)) => Some(g.clone().then(s)),
                (g, s) => s.clone().or_else(|| g.clone()),
            },
            post_transformation_filter: combine_filters(
                &global.post_transformation_filter,
                &self.post_transformation_filter,
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub entities: BTreeMap<String, ViewElementDefinition>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub edges: BTreeMap<String, ViewElementDefinition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_elements: Option<ViewElementDefinition>,
}

impl View {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: include an entity group
    pub fn entity(mut self, group: impl Into<String>, definition: ViewElementDefinition) -> Self {
        self.entities.insert(group.into(), definition);
        self
    }

    /// Builder method: include an edge group
    pub fn edge(mut self, group: impl Into<String>, definition: ViewElementDefinition) -> Self {
        self.edges.insert(group.into(), definition);
        self
    }

    /// Builder method: settings applied to every group
    pub fn global(mut self, definition: ViewElementDefinition) -> Self {
        self.global_elements = Some(definition);
        self
    }

    /// True when no group is named, so every schema group is in scope
    pub fn covers_all_groups(&self) -> bool {
        self.entities.is_empty() && self.edges.is_empty()
    }

    /// Effective definition for a group, or `None` when the group is out
    /// of view
    pub fn definition(&self, group: &str, is_edge: bool) -> Option<ViewElementDefinition> {
        let specific = if self.covers_all_groups() {
            ViewElementDefinition::default()
        } else if is_edge {
            self.edges.get(group)?.clone()
        } else {
            self.entities.get(group)?.clone()
        };
        Some(match &self.global_elements {
            Some(global) => specific.merged_with(global),
            None => specific,
        })
    }

    pub fn includes(&self, element: &Element) -> bool {
        if self.covers_all_groups() {
            return true;
        }
        if element.is_edge() {
            self.edges.contains_key(element.group())
        } else {
            self.entities.contains_key(element.group())
        }
    }

    /// Entity groups in scope for a schema
    pub fn entity_groups<'a>(&'a self, schema: &'a Schema) -> Vec<&'a str> {
        if self.covers_all_groups() {
            schema.entities().keys().map(String::as_str).collect()
        } else {
            self.entities.keys().map(String::as_str).collect()
        }
    }

    /// Edge groups in scope for a schema
    pub fn edge_groups<'a>(&'a self, schema: &'a Schema) -> Vec<&'a str> {
        if self.covers_all_groups() {
            schema.edges().keys().map(String::as_str).collect()
        } else {
            self.edges.keys().map(String::as_str).collect()
        }
    }

    /// Groups named by the view that the schema does not declare
    pub fn unknown_groups(&self, schema: &Schema) -> Vec<String> {
        let entities = self
            .entities
            .keys()
            .filter(|g| schema.get_entity(g).is_none());
        let edges = self.edges.keys().filter(|g| schema.get_edge(g).is_none());
        entities.chain(edges).cloned().collect()
    }

    /// Whether any group definition uses the given stage
    pub fn has_pre_aggregation_filters(&self) -> bool {
        self.any_definition(|d| d.pre_aggregation_filter.as_ref().is_some_and(|f| !f.is_empty()))
    }

    pub fn has_post_aggregation_filters(&self) -> bool {
        self.any_definition(|d| d.post_aggregation_filter.as_ref().is_some_and(|f| !f.is_empty()))
    }

    pub fn has_transformers(&self) -> bool {
        self.any_definition(|d| d.transformer.as_ref().is_some_and(|t| !t.is_empty()))
    }

    pub fn has_post_transformation_filters(&self) -> bool {
        self.any_definition(|d| {
            d.post_transformation_filter
                .as_ref()
                .is_some_and(|f| !f.is_empty())
        })
    }

    fn any_definition(&self, test: impl Fn(&ViewElementDefinition) -> bool) -> bool {
        self.entities
            .values()
            .chain(self.edges.values())
            .chain(self.global_elements.iter())
            .any(test)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Edge, Entity};
    use crate::function::Predicate;

    #[test]
    fn test_empty_view_covers_everything() {
        let view = View::new();
        let element: Element = Entity::new("anything", "v").into();
        assert!(view.includes(&element));
        assert!(view.definition("anything", false).is_some());
    }

    #[test]
    fn test_named_groups_restrict_scope() {
        let view = View::new().edge("road", ViewElementDefinition::new());
        let road: Element = Edge::new("road", "A", "B", true).into();
        let junction: Element = Entity::new("junction", "A").into();
        assert!(view.includes(&road));
        assert!(!view.includes(&junction));
        assert!(view.definition("road", false).is_none());
    }

    #[test]
    fn test_global_definition_is_merged() {
        let view = View::new()
            .entity(
                "person",
                ViewElementDefinition::new()
                    .pre_aggregation_filter(ElementFilter::new().select("age", Predicate::Exists))
                    .exclude_properties(vec!["secret".into()]),
            )
            .global(
                ViewElementDefinition::new()
                    .pre_aggregation_filter(ElementFilter::new().select("name", Predicate::Exists))
                    .exclude_properties(vec!["internal".into()]),
            );

        let definition = view.definition("person", false).unwrap();
        assert_eq!(definition.pre_aggregation_filter.as_ref().unwrap().components.len(), 2);
        assert!(!definition.keeps_property("secret"));
        assert!(!definition.keeps_property("internal"));
        assert!(definition.keeps_property("age"));
        assert!(view.has_pre_aggregation_filters());
        assert!(!view.has_transformers());
    }

    #[test]
    fn test_view_json() {
        let json = r#"{
            "edges": {
                "road": {
                    "groupBy": [],
                    "postAggregationFilter": {
                        "components": [
                            {"selection": ["count"], "predicate": {"class": "IsMoreThan", "value": 1}}
                        ]
                    }
                }
            }
        }"#;
        let view: View = serde_json::from_str(json).unwrap();
        let definition = view.definition("road", true).unwrap();
        assert_eq!(definition.group_by, Some(vec![]));
        assert!(view.has_post_aggregation_filters());
    }
}

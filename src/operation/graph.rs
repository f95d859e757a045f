//! Operations that read, write and process graph elements

use crate::element::{DirectedType, IncludeIncomingOutgoing};
use crate::function::BinaryOperator;
use crate::operation::data::Data;
use crate::operation::view::{View, ViewElementDefinition};
use crate::operation::wire;
use crate::operation::Options;
use crate::pipeline::{ElementFilter, ElementTransformer};
use serde::Deserialize;
use std::collections::BTreeMap;

fn default_true() -> bool {
    true
}

/// Write elements, merging duplicates where the store aggregates on ingest
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddElements {
    #[serde(default, deserialize_with = "wire::multi_input")]
    pub input: Data,

    /// Check elements against the schema before writing
    #[serde(default = "default_true")]
    pub validate: bool,

    /// Drop invalid elements instead of failing
    #[serde(default)]
    pub skip_invalid_elements: bool,

    #[serde(default)]
    pub options: Options,
}

impl AddElements {
    pub fn new(input: impl Into<Data>) -> Self {
        Self {
            input: input.into(),
            validate: true,
            skip_invalid_elements: false,
            options: Options::new(),
        }
    }

    pub fn skip_invalid_elements(mut self, skip: bool) -> Self {
        self.skip_invalid_elements = skip;
        self
    }

    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }
}

/// Elements related to the input seeds
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetElements {
    #[serde(default, deserialize_with = "wire::multi_input")]
    pub input: Data,

    #[serde(default)]
    pub view: View,

    /// For entity seeds: which edges count as related
    #[serde(default)]
    pub include_incoming_outgoing: IncludeIncomingOutgoing,

    /// Restrict returned edges by direction
    #[serde(default)]
    pub directed_type: DirectedType,

    #[serde(default)]
    pub options: Options,
}

impl GetElements {
    pub fn new(input: impl Into<Data>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    /// Seeds supplied by the previous operation
    pub fn chained() -> Self {
        Self::default()
    }

    pub fn view(mut self, view: View) -> Self {
        self.view = view;
        self
    }

    pub fn include_incoming_outgoing(mut self, direction: IncludeIncomingOutgoing) -> Self {
        self.include_incoming_outgoing = direction;
        self
    }

    pub fn directed_type(mut self, directed: DirectedType) -> Self {
        self.directed_type = directed;
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetAllElements {
    #[serde(default)]
    pub view: View,

    #[serde(default)]
    pub directed_type: DirectedType,

    #[serde(default)]
    pub options: Options,
}

impl GetAllElements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(mut self, view: View) -> Self {
        self.view = view;
        self
    }
}

/// Vertices one hop from the input seeds, as entity seeds
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetAdjacentIds {
    #[serde(default, deserialize_with = "wire::multi_input")]
    pub input: Data,

    #[serde(default)]
    pub view: View,

    #[serde(default)]
    pub include_incoming_outgoing: IncludeIncomingOutgoing,

    #[serde(default)]
    pub options: Options,
}

impl GetAdjacentIds {
    pub fn new(input: impl Into<Data>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    pub fn chained() -> Self {
        Self::default()
    }

    pub fn view(mut self, view: View) -> Self {
        self.view = view;
        self
    }

    pub fn include_incoming_outgoing(mut self, direction: IncludeIncomingOutgoing) -> Self {
        self.include_incoming_outgoing = direction;
        self
    }
}

/// Elements whose vertices fall within inclusive seed ranges. Each input
/// item is a `Pair` (or two-item list) of entity seeds or values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetElementsInRanges {
    #[serde(default, deserialize_with = "wire::multi_input")]
    pub input: Data,

    #[serde(default)]
    pub view: View,

    #[serde(default)]
    pub options: Options,
}

impl GetElementsInRanges {
    pub fn new(input: impl Into<Data>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    pub fn view(mut self, view: View) -> Self {
        self.view = view;
        self
    }
}

/// Count every stored element visible through the default view
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountAllElementsDefaultView {
    #[serde(default)]
    pub options: Options,
}

/// Check elements against the schema
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validate {
    #[serde(default, deserialize_with = "wire::multi_input")]
    pub input: Data,

    #[serde(default)]
    pub skip_invalid_elements: bool,

    #[serde(default)]
    pub options: Options,
}

impl Validate {
    pub fn new(input: impl Into<Data>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    pub fn skip_invalid_elements(mut self, skip: bool) -> Self {
        self.skip_invalid_elements = skip;
        self
    }
}

/// GroupBy and aggregate function overrides for one group
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatePair {
    #[serde(default)]
    pub group_by: Option<Vec<String>>,

    #[serde(default)]
    pub aggregator: BTreeMap<String, BinaryOperator>,
}

/// Aggregate the input elements. Groups without overrides use the schema.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    #[serde(default, deserialize_with = "wire::multi_input")]
    pub input: Data,

    #[serde(default)]
    pub entities: BTreeMap<String, AggregatePair>,

    #[serde(default)]
    pub edges: BTreeMap<String, AggregatePair>,

    #[serde(default)]
    pub options: Options,
}

impl Aggregate {
    pub fn new(input: impl Into<Data>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    pub fn chained() -> Self {
        Self::default()
    }

    pub fn entity(mut self, group: impl Into<String>, pair: AggregatePair) -> Self {
        self.entities.insert(group.into(), pair);
        self
    }

    pub fn edge(mut self, group: impl Into<String>, pair: AggregatePair) -> Self {
        self.edges.insert(group.into(), pair);
        self
    }

    /// The overrides as a view for the aggregation stage
    pub fn overrides(&self) -> View {
        let definition = |pair: &AggregatePair| ViewElementDefinition {
            group_by: pair.group_by.clone(),
            aggregator: pair.aggregator.clone(),
            ..Default::default()
        };
        View {
            entities: self.entities.iter().map(|(g, p)| (g.clone(), definition(p))).collect(),
            edges: self.edges.iter().map(|(g, p)| (g.clone(), definition(p))).collect(),
            global_elements: None,
        }
    }
}

/// Filter the input elements. When any group filter is given, elements of
/// unlisted groups are dropped.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(default, deserialize_with = "wire::multi_input")]
    pub input: Data,

    #[serde(default)]
    pub global_elements: Option<ElementFilter>,

    #[serde(default)]
    pub entities: BTreeMap<String, ElementFilter>,

    #[serde(default)]
    pub edges: BTreeMap<String, ElementFilter>,

    #[serde(default)]
    pub options: Options,
}

impl Filter {
    pub fn new(input: impl Into<Data>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    pub fn chained() -> Self {
        Self::default()
    }

    pub fn global(mut self, filter: ElementFilter) -> Self {
        self.global_elements = Some(filter);
        self
    }

    pub fn entity(mut self, group: impl Into<String>, filter: ElementFilter) -> Self {
        self.entities.insert(group.into(), filter);
        self
    }

    pub fn edge(mut self, group: impl Into<String>, filter: ElementFilter) -> Self {
        self.edges.insert(group.into(), filter);
        self
    }
}

/// Transform the input elements. Unlisted groups pass through.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    #[serde(default, deserialize_with = "wire::multi_input")]
    pub input: Data,

    #[serde(default)]
    pub entities: BTreeMap<String, ElementTransformer>,

    #[serde(default)]
    pub edges: BTreeMap<String, ElementTransformer>,

    #[serde(default)]
    pub options: Options,
}

impl Transform {
    pub fn new(input: impl Into<Data>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    pub fn chained() -> Self {
        Self::default()
    }

    pub fn entity(mut self, group: impl Into<String>, transformer: ElementTransformer) -> Self {
        self.entities.insert(group.into(), transformer);
        self
    }

    pub fn edge(mut self, group: impl Into<String>, transformer: ElementTransformer) -> Self {
        self.edges.insert(group.into(), transformer);
        self
    }
}

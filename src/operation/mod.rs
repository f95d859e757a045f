//! Operations
//!
//! Typed commands executed by a store:
//!
//! - **graph**: element reads and writes, and the element processing
//!   operations `Aggregate`, `Filter`, `Transform` and `Validate`
//! - **collection**: `Count`, `Limit`, `ToList`, `DiscardOutput` and chain
//!   variables
//! - **control**: `While`, `If`, `Map`, `ForEach` and `Reduce`
//! - **join**: `Join` and its match methods
//! - **chain**: `OperationChain`
//! - **view**: per-query `View`s
//! - **data**: `Data`, `Item` and `ItemStream`, the values passed between
//!   operations
//! - **wire**: the JSON codec
//!
//! Operations are a closed enum. Handlers are registered per
//! `OperationKind` and dispatch is by exact kind: a handler for one kind
//! never serves another.
//!
//! # JSON
//!
//! Each operation is an object tagged by `"class"`:
//!
//! ```json
//! {
//!   "class": "OperationChain",
//!   "operations": [
//!     {"class": "GetElements", "input": [{"class": "EntitySeed", "vertex": "v1"}]},
//!     {"class": "Count"}
//!   ]
//! }
//! ```

pub mod chain;
pub mod collection;
pub mod control;
pub mod data;
pub mod error;
pub mod graph;
pub mod join;
pub mod view;
pub mod wire;

pub use chain::OperationChain;
pub use collection::{Count, DiscardOutput, GetVariable, GetVariables, Limit, SetVariable, ToList};
pub use control::{Conditional, ForEach, If, Map, Reduce, While, MAX_REPEATS_CEILING};
pub use data::{Data, Item, ItemStream};
pub use error::{OperationError, OperationResult};
pub use graph::{
    Aggregate, AggregatePair, AddElements, CountAllElementsDefaultView, Filter, GetAdjacentIds, GetAllElements,
    GetElements, GetElementsInRanges, Transform, Validate,
};
pub use join::{Join, JoinType, Match, MatchKey};
pub use view::{View, ViewElementDefinition};

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// Free-form per-operation options, passed through to handlers
pub type Options = BTreeMap<String, String>;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "class")]
pub enum Operation {
    AddElements(AddElements),
    GetElements(GetElements),
    GetAllElements(GetAllElements),
    GetAdjacentIds(GetAdjacentIds),
    GetElementsInRanges(GetElementsInRanges),
    CountAllElementsDefaultView(CountAllElementsDefaultView),
    Validate(Validate),
    Aggregate(Aggregate),
    Filter(Filter),
    Transform(Transform),
    Count(Count),
    Limit(Limit),
    DiscardOutput(DiscardOutput),
    ToList(ToList),
    SetVariable(SetVariable),
    GetVariable(GetVariable),
    GetVariables(GetVariables),
    While(While),
    If(If),
    Map(Map),
    ForEach(ForEach),
    Reduce(Reduce),
    Join(Join),
    #[serde(rename = "OperationChain")]
    Chain(OperationChain),
}

/// Runs `$body` with `$op` bound to the variant's payload
macro_rules! with_operation {
    ($operation:expr, $op:ident => $body:expr) => {
        match $operation {
            Operation::AddElements($op) => $body,
            Operation::GetElements($op) => $body,
            Operation::GetAllElements($op) => $body,
            Operation::GetAdjacentIds($op) => $body,
            Operation::GetElementsInRanges($op) => $body,
            Operation::CountAllElementsDefaultView($op) => $body,
            Operation::Validate($op) => $body,
            Operation::Aggregate($op) => $body,
            Operation::Filter($op) => $body,
            Operation::Transform($op) => $body,
            Operation::Count($op) => $body,
            Operation::Limit($op) => $body,
            Operation::DiscardOutput($op) => $body,
            Operation::ToList($op) => $body,
            Operation::SetVariable($op) => $body,
            Operation::GetVariable($op) => $body,
            Operation::GetVariables($op) => $body,
            Operation::While($op) => $body,
            Operation::If($op) => $body,
            Operation::Map($op) => $body,
            Operation::ForEach($op) => $body,
            Operation::Reduce($op) => $body,
            Operation::Join($op) => $body,
            Operation::Chain($op) => $body,
        }
    };
}

/// Runs `$body` with `$input` bound to the input slot of input-capable
/// operations, or evaluates `$otherwise`
macro_rules! with_input {
    ($operation:expr, $input:ident => $body:expr, _ => $otherwise:expr) => {
        match $operation {
            Operation::AddElements(op) => { let $input = &mut op.input; $body }
            Operation::GetElements(op) => { let $input = &mut op.input; $body }
            Operation::GetAdjacentIds(op) => { let $input = &mut op.input; $body }
            Operation::GetElementsInRanges(op) => { let $input = &mut op.input; $body }
            Operation::Validate(op) => { let $input = &mut op.input; $body }
            Operation::Aggregate(op) => { let $input = &mut op.input; $body }
            Operation::Filter(op) => { let $input = &mut op.input; $body }
            Operation::Transform(op) => { let $input = &mut op.input; $body }
            Operation::Count(op) => { let $input = &mut op.input; $body }
            Operation::Limit(op) => { let $input = &mut op.input; $body }
            Operation::DiscardOutput(op) => { let $input = &mut op.input; $body }
            Operation::ToList(op) => { let $input = &mut op.input; $body }
            Operation::SetVariable(op) => { let $input = &mut op.input; $body }
            Operation::While(op) => { let $input = &mut op.input; $body }
            Operation::If(op) => { let $input = &mut op.input; $body }
            Operation::Map(op) => { let $input = &mut op.input; $body }
            Operation::ForEach(op) => { let $input = &mut op.input; $body }
            Operation::Reduce(op) => { let $input = &mut op.input; $body }
            Operation::Join(op) => { let $input = &mut op.input; $body }
            Operation::GetAllElements(_)
            | Operation::CountAllElementsDefaultView(_)
            | Operation::GetVariable(_)
            | Operation::GetVariables(_)
            | Operation::Chain(_) => $otherwise,
        }
    };
}

/// Operation discriminant, the handler registry key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationKind {
    AddElements,
    GetElements,
    GetAllElements,
    GetAdjacentIds,
    GetElementsInRanges,
    CountAllElementsDefaultView,
    Validate,
    Aggregate,
    Filter,
    Transform,
    Count,
    Limit,
    DiscardOutput,
    ToList,
    SetVariable,
    GetVariable,
    GetVariables,
    While,
    If,
    Map,
    ForEach,
    Reduce,
    Join,
    OperationChain,
}

impl OperationKind {
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::AddElements => "AddElements",
            OperationKind::GetElements => "GetElements",
            OperationKind::GetAllElements => "GetAllElements",
            OperationKind::GetAdjacentIds => "GetAdjacentIds",
            OperationKind::GetElementsInRanges => "GetElementsInRanges",
            OperationKind::CountAllElementsDefaultView => "CountAllElementsDefaultView",
            OperationKind::Validate => "Validate",
            OperationKind::Aggregate => "Aggregate",
            OperationKind::Filter => "Filter",
            OperationKind::Transform => "Transform",
            OperationKind::Count => "Count",
            OperationKind::Limit => "Limit",
            OperationKind::DiscardOutput => "DiscardOutput",
            OperationKind::ToList => "ToList",
            OperationKind::SetVariable => "SetVariable",
            OperationKind::GetVariable => "GetVariable",
            OperationKind::GetVariables => "GetVariables",
            OperationKind::While => "While",
            OperationKind::If => "If",
            OperationKind::Map => "Map",
            OperationKind::ForEach => "ForEach",
            OperationKind::Reduce => "Reduce",
            OperationKind::Join => "Join",
            OperationKind::OperationChain => "OperationChain",
        }
    }

    /// Whether the operation produces a result for the next operation
    pub fn has_output(&self) -> bool {
        !matches!(
            self,
            OperationKind::AddElements | OperationKind::DiscardOutput | OperationKind::SetVariable
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::AddElements(_) => OperationKind::AddElements,
            Operation::GetElements(_) => OperationKind::GetElements,
            Operation::GetAllElements(_) => OperationKind::GetAllElements,
            Operation::GetAdjacentIds(_) => OperationKind::GetAdjacentIds,
            Operation::GetElementsInRanges(_) => OperationKind::GetElementsInRanges,
            Operation::CountAllElementsDefaultView(_) => OperationKind::CountAllElementsDefaultView,
            Operation::Validate(_) => OperationKind::Validate,
            Operation::Aggregate(_) => OperationKind::Aggregate,
            Operation::Filter(_) => OperationKind::Filter,
            Operation::Transform(_) => OperationKind::Transform,
            Operation::Count(_) => OperationKind::Count,
            Operation::Limit(_) => OperationKind::Limit,
            Operation::DiscardOutput(_) => OperationKind::DiscardOutput,
            Operation::ToList(_) => OperationKind::ToList,
            Operation::SetVariable(_) => OperationKind::SetVariable,
            Operation::GetVariable(_) => OperationKind::GetVariable,
            Operation::GetVariables(_) => OperationKind::GetVariables,
            Operation::While(_) => OperationKind::While,
            Operation::If(_) => OperationKind::If,
            Operation::Map(_) => OperationKind::Map,
            Operation::ForEach(_) => OperationKind::ForEach,
            Operation::Reduce(_) => OperationKind::Reduce,
            Operation::Join(_) => OperationKind::Join,
            Operation::Chain(_) => OperationKind::OperationChain,
        }
    }

    pub fn options(&self) -> &Options {
        with_operation!(self, op => &op.options)
    }

    pub fn options_mut(&mut self) -> &mut Options {
        with_operation!(self, op => &mut op.options)
    }

    /// Builder method: set one option
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options_mut().insert(key.into(), value.into());
        self
    }

    pub fn accepts_input(&self) -> bool {
        match self {
            Operation::Chain(chain) => chain.operations.first().is_some_and(Operation::accepts_input),
            _ => self.input().is_some(),
        }
    }

    /// Current input, for operations that take one
    pub fn input(&self) -> Option<&Data> {
        match self {
            Operation::AddElements(op) => Some(&op.input),
            Operation::GetElements(op) => Some(&op.input),
            Operation::GetAdjacentIds(op) => Some(&op.input),
            Operation::GetElementsInRanges(op) => Some(&op.input),
            Operation::Validate(op) => Some(&op.input),
            Operation::Aggregate(op) => Some(&op.input),
            Operation::Filter(op) => Some(&op.input),
            Operation::Transform(op) => Some(&op.input),
            Operation::Count(op) => Some(&op.input),
            Operation::Limit(op) => Some(&op.input),
            Operation::DiscardOutput(op) => Some(&op.input),
            Operation::ToList(op) => Some(&op.input),
            Operation::SetVariable(op) => Some(&op.input),
            Operation::While(op) => Some(&op.input),
            Operation::If(op) => Some(&op.input),
            Operation::Map(op) => Some(&op.input),
            Operation::ForEach(op) => Some(&op.input),
            Operation::Reduce(op) => Some(&op.input),
            Operation::Join(op) => Some(&op.input),
            _ => None,
        }
    }

    /// Take the input out, leaving the slot empty
    pub fn take_input(&mut self) -> Data {
        with_input!(self, input => std::mem::take(input), _ => Data::Empty)
    }

    /// Set the input only if none is present. A nested chain passes the
    /// value to its first operation. Caller-supplied input is never
    /// overwritten; unused data is dropped, releasing any stream.
    pub fn update_operation_input(&mut self, data: Data) {
        if data.is_empty() {
            return;
        }
        if let Operation::Chain(chain) = self {
            if let Some(first) = chain.operations.first_mut() {
                first.update_operation_input(data);
            }
            return;
        }
        with_input!(self, input => {
            if input.is_empty() {
                *input = data;
            }
        }, _ => ())
    }
}

macro_rules! impl_from_operation {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Operation {
                fn from(op: $variant) -> Self {
                    Operation::$variant(op)
                }
            }
        )*
    };
}

impl_from_operation!(
    AddElements,
    GetElements,
    GetAllElements,
    GetAdjacentIds,
    GetElementsInRanges,
    CountAllElementsDefaultView,
    Validate,
    Aggregate,
    Filter,
    Transform,
    Count,
    Limit,
    DiscardOutput,
    ToList,
    SetVariable,
    GetVariable,
    GetVariables,
    While,
    If,
    Map,
    ForEach,
    Reduce,
    Join,
);

impl From<OperationChain> for Operation {
    fn from(chain: OperationChain) -> Self {
        Operation::Chain(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementSeed, Value};

    fn seeds(data: &Data) -> usize {
        data.clone().materialise().into_items().count()
    }

    #[test]
    fn test_update_input_never_overwrites() {
        let mut op: Operation = GetElements::new(vec![Item::Seed(ElementSeed::entity("a"))]).into();
        op.update_operation_input(Data::list(vec![Item::Null, Item::Null]));
        assert_eq!(op.input().map(seeds), Some(1));

        let mut op: Operation = GetElements::chained().into();
        op.update_operation_input(Data::list(vec![Item::Null, Item::Null]));
        assert_eq!(op.input().map(seeds), Some(2));
    }

    #[test]
    fn test_update_input_targets_nested_chain_head() {
        let mut op: Operation = OperationChain::new()
            .then(Count::default())
            .then(Limit::new(1))
            .into();
        op.update_operation_input(Data::from(vec![Value::Long(1), Value::Long(2)]));
        let Operation::Chain(chain) = &op else {
            panic!("expected a chain");
        };
        assert_eq!(chain.operations[0].input().map(seeds), Some(2));
        assert!(chain.operations[1].input().is_some_and(Data::is_empty));
    }

    #[test]
    fn test_operations_without_input_ignore_updates() {
        let mut op: Operation = GetAllElements::new().into();
        op.update_operation_input(Data::list(vec![Item::Null]));
        assert!(op.input().is_none());
        assert!(!op.accepts_input());
    }

    #[test]
    fn test_kinds_and_options() {
        let op: Operation = Operation::from(Count::default()).option("trace", "on");
        assert_eq!(op.kind(), OperationKind::Count);
        assert_eq!(op.options().get("trace").map(String::as_str), Some("on"));
        assert!(!OperationKind::AddElements.has_output());
        assert!(OperationKind::Join.has_output());
    }

    #[test]
    fn test_operation_json() {
        let op: Operation = serde_json::from_str(
            r#"{
                "class": "While",
                "input": ["Long", 1],
                "maxRepeats": 5,
                "conditional": {"predicate": {"class": "IsLessThan", "value": 10}},
                "operation": {"class": "Map", "functions": [{"class": "Increment", "by": 1}]}
            }"#,
        )
        .unwrap();
        let Operation::While(op) = op else {
            panic!("expected While");
        };
        assert_eq!(op.max_repeats, 5);
        assert!(matches!(op.input, Data::Item(Item::Value(Value::Long(1)))));
        assert_eq!(op.operation.kind(), OperationKind::Map);
    }
}

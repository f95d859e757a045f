//! Core operation handlers
//!
//! Handlers every store registers, whatever its backend:
//!
//! - **collection**: `Count`, `Limit`, `DiscardOutput`, `ToList` and the
//!   chain variable operations
//! - **control**: `While`, `If`, `Map`, `ForEach`, `Reduce` and nested
//!   `OperationChain`s
//! - **join**: `Join`
//! - **element**: `Validate`, `Aggregate`, `Filter` and `Transform`
//!
//! Backends add the handlers that read and write elements.

/// Take the payload out of an operation of the expected variant
macro_rules! unpack {
    ($operation:expr, $variant:ident) => {
        match $operation {
            crate::operation::Operation::$variant(op) => op,
            other => {
                return Err(crate::store::handlers::wrong_operation(
                    crate::operation::OperationKind::$variant,
                    &other,
                ))
            }
        }
    };
}

pub mod collection;
pub mod control;
pub mod element;
pub mod join;

use crate::config::StoreProperties;
use crate::element::Element;
use crate::operation::{Data, Item, ItemStream, Operation, OperationError, OperationKind};
use crate::store::error::{StoreError, StoreResult};
use crate::store::handler::OperationHandler;
use std::sync::Arc;

pub fn core_handlers(properties: &StoreProperties) -> Vec<(OperationKind, Arc<dyn OperationHandler>)> {
    vec![
        entry(OperationKind::Count, collection::CountHandler),
        entry(OperationKind::Limit, collection::LimitHandler),
        entry(OperationKind::DiscardOutput, collection::DiscardOutputHandler),
        entry(OperationKind::ToList, collection::ToListHandler),
        entry(OperationKind::SetVariable, collection::SetVariableHandler),
        entry(OperationKind::GetVariable, collection::GetVariableHandler),
        entry(OperationKind::GetVariables, collection::GetVariablesHandler),
        entry(OperationKind::While, control::WhileHandler::new(properties.max_repeats())),
        entry(OperationKind::If, control::IfHandler),
        entry(OperationKind::Map, control::MapHandler),
        entry(OperationKind::ForEach, control::ForEachHandler),
        entry(OperationKind::Reduce, control::ReduceHandler),
        entry(OperationKind::OperationChain, control::OperationChainHandler),
        entry(OperationKind::Join, join::JoinHandler::new(properties.join_limit)),
        entry(OperationKind::Validate, element::ValidateHandler),
        entry(OperationKind::Aggregate, element::AggregateHandler),
        entry(OperationKind::Filter, element::FilterHandler),
        entry(OperationKind::Transform, element::TransformHandler),
    ]
}

pub(crate) fn entry(
    kind: OperationKind,
    handler: impl OperationHandler + 'static,
) -> (OperationKind, Arc<dyn OperationHandler>) {
    (kind, Arc::new(handler))
}

/// A handler was given an operation of another kind
pub(crate) fn wrong_operation(expected: OperationKind, operation: &Operation) -> StoreError {
    OperationError::Invalid {
        operation: expected.to_string(),
        reason: format!("handler received a {} operation", operation.kind()),
    }
    .into()
}

/// Collect the input as elements; any other item is an input error
pub(crate) fn into_elements(data: Data, kind: OperationKind) -> StoreResult<Vec<Element>> {
    let mut elements = Vec::new();
    for item in data.into_items() {
        match item {
            Item::Element(element) => elements.push(element),
            other => {
                return Err(OperationError::invalid_input(
                    kind.name(),
                    format!("expected elements, found {}", other.type_name()),
                )
                .into())
            }
        }
    }
    Ok(elements)
}

/// Elements as a lazily consumed output stream
pub(crate) fn element_stream(elements: Vec<Element>) -> Data {
    Data::stream(ItemStream::new(elements.into_iter().map(Item::Element)))
}

//! Handlers that process elements already in the chain
//!
//! These run the same stages a view applies at read time, but over the
//! operation's input rather than over stored elements.

use super::{element_stream, into_elements};
use crate::element::Element;
use crate::operation::{Data, Operation, OperationKind};
use crate::pipeline::{ElementAggregator, ElementFilter};
use crate::store::context::Context;
use crate::store::error::{StoreError, StoreResult};
use crate::store::handler::{Execution, OperationHandler};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::warn;

/// Checks elements against the schema, optionally dropping invalid ones
pub struct ValidateHandler;

#[async_trait]
impl OperationHandler for ValidateHandler {
    async fn handle(
        &self,
        operation: Operation,
        _context: &mut Context,
        execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let op = unpack!(operation, Validate);
        let elements = into_elements(op.input, OperationKind::Validate)?;
        let valid = validate_elements(execution.schema(), elements, op.skip_invalid_elements)?;
        Ok(element_stream(valid))
    }
}

/// Shared by `Validate` and validating `AddElements`
pub(crate) fn validate_elements(
    schema: &crate::schema::Schema,
    elements: Vec<Element>,
    skip_invalid: bool,
) -> StoreResult<Vec<Element>> {
    let mut valid = Vec::with_capacity(elements.len());
    for element in elements {
        match schema.validate_element(&element) {
            Ok(()) => valid.push(element),
            Err(e) if skip_invalid => {
                warn!(group = element.group(), error = %e, "Skipping invalid element");
            }
            Err(e) => return Err(StoreError::Validation(e.to_string())),
        }
    }
    Ok(valid)
}

/// Merges the input with the schema's aggregation rules, applying any
/// groupBy or aggregator overrides the operation carries
pub struct AggregateHandler;

#[async_trait]
impl OperationHandler for AggregateHandler {
    async fn handle(
        &self,
        operation: Operation,
        _context: &mut Context,
        execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let op = unpack!(operation, Aggregate);
        let overrides = op.overrides();
        let elements = into_elements(op.input, OperationKind::Aggregate)?;
        let aggregated = ElementAggregator::with_view(execution.schema(), &overrides).aggregate(elements)?;
        Ok(element_stream(aggregated))
    }
}

pub struct FilterHandler;

#[async_trait]
impl OperationHandler for FilterHandler {
    async fn handle(
        &self,
        operation: Operation,
        _context: &mut Context,
        _execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let op = unpack!(operation, Filter);
        let restrict_groups = !op.entities.is_empty() || !op.edges.is_empty();
        let elements = into_elements(op.input, OperationKind::Filter)?;

        let mut kept = Vec::with_capacity(elements.len());
        for element in elements {
            let group_filter = group_entry(&op.entities, &op.edges, &element);
            if restrict_groups && group_filter.is_none() {
                continue;
            }
            if passes(group_filter, &element)? && passes(op.global_elements.as_ref(), &element)? {
                kept.push(element);
            }
        }
        Ok(element_stream(kept))
    }
}

fn passes(filter: Option<&ElementFilter>, element: &Element) -> StoreResult<bool> {
    match filter {
        Some(filter) => Ok(filter.test(element)?),
        None => Ok(true),
    }
}

fn group_entry<'a, T>(
    entities: &'a BTreeMap<String, T>,
    edges: &'a BTreeMap<String, T>,
    element: &Element,
) -> Option<&'a T> {
    let groups = if element.is_edge() { edges } else { entities };
    groups.get(element.group())
}

/// Applies per-group transformers. Elements of other groups pass unchanged.
pub struct TransformHandler;

#[async_trait]
impl OperationHandler for TransformHandler {
    async fn handle(
        &self,
        operation: Operation,
        _context: &mut Context,
        _execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let op = unpack!(operation, Transform);
        let mut elements = into_elements(op.input, OperationKind::Transform)?;
        for element in elements.iter_mut() {
            if let Some(transformer) = group_entry(&op.entities, &op.edges, element) {
                transformer.apply(element)?;
            }
        }
        Ok(element_stream(elements))
    }
}

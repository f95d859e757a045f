//! Handlers for generic collection operations and chain variables

use crate::element::Value;
use crate::operation::{Data, Item, ItemStream, Operation, OperationError};
use crate::store::context::Context;
use crate::store::error::{StoreError, StoreResult};
use crate::store::handler::{Execution, OperationHandler};
use async_trait::async_trait;

pub struct CountHandler;

#[async_trait]
impl OperationHandler for CountHandler {
    async fn handle(
        &self,
        operation: Operation,
        _context: &mut Context,
        _execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let op = unpack!(operation, Count);
        let count = op.input.into_items().count();
        Ok(Data::Item(Item::Value(Value::Long(count as i64))))
    }
}

pub struct LimitHandler;

#[async_trait]
impl OperationHandler for LimitHandler {
    async fn handle(
        &self,
        operation: Operation,
        _context: &mut Context,
        _execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let op = unpack!(operation, Limit);
        let limit = op.result_limit;
        if op.truncate {
            // Dropping the partly read upstream releases it
            return Ok(Data::stream(ItemStream::new(op.input.into_items().take(limit))));
        }

        let items: Vec<Item> = op.input.into_items().take(limit.saturating_add(1)).collect();
        if items.len() > limit {
            return Err(StoreError::LimitExceeded { limit });
        }
        Ok(Data::list(items))
    }
}

pub struct DiscardOutputHandler;

#[async_trait]
impl OperationHandler for DiscardOutputHandler {
    async fn handle(
        &self,
        operation: Operation,
        _context: &mut Context,
        _execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let op = unpack!(operation, DiscardOutput);
        op.input.close();
        Ok(Data::Empty)
    }
}

pub struct ToListHandler;

#[async_trait]
impl OperationHandler for ToListHandler {
    async fn handle(
        &self,
        operation: Operation,
        _context: &mut Context,
        _execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let op = unpack!(operation, ToList);
        Ok(Data::list(op.input.into_items().collect()))
    }
}

pub struct SetVariableHandler;

#[async_trait]
impl OperationHandler for SetVariableHandler {
    async fn handle(
        &self,
        operation: Operation,
        context: &mut Context,
        _execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let op = unpack!(operation, SetVariable);
        if op.variable_name.is_empty() {
            return Err(OperationError::Invalid {
                operation: "SetVariable".to_string(),
                reason: "variable name must not be empty".to_string(),
            }
            .into());
        }
        context.set_variable(op.variable_name, op.input);
        Ok(Data::Empty)
    }
}

pub struct GetVariableHandler;

#[async_trait]
impl OperationHandler for GetVariableHandler {
    async fn handle(
        &self,
        operation: Operation,
        context: &mut Context,
        _execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let op = unpack!(operation, GetVariable);
        context
            .variable(&op.variable_name)
            .cloned()
            .ok_or_else(|| OperationError::MissingVariable(op.variable_name).into())
    }
}

/// Unset names give an empty value list rather than an error
pub struct GetVariablesHandler;

#[async_trait]
impl OperationHandler for GetVariablesHandler {
    async fn handle(
        &self,
        operation: Operation,
        context: &mut Context,
        _execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let op = unpack!(operation, GetVariables);
        let items = op
            .variable_names
            .into_iter()
            .map(|name| {
                let values = context
                    .variable(&name)
                    .cloned()
                    .and_then(Data::into_item)
                    .into_iter()
                    .collect();
                Item::keyed(Item::Value(Value::String(name)), values)
            })
            .collect();
        Ok(Data::list(items))
    }
}

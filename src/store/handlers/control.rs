//! Control-flow handlers
//!
//! Delegate operations run back through the `Execution`, so they see the
//! same handlers, traits and limits as the enclosing chain.

use crate::function::Function;
use crate::operation::{Conditional, Data, Item, Operation, OperationError};
use crate::store::context::Context;
use crate::store::error::StoreResult;
use crate::store::handler::{Execution, OperationHandler};
use async_trait::async_trait;
use tracing::debug;

/// Evaluate a loop or branch condition against the running value.
///
/// A conditional transform runs first and its output replaces the running
/// value. A predicate that cannot accept the value's type fails with an
/// error naming both.
async fn test_condition(
    condition: Option<bool>,
    conditional: Option<&Conditional>,
    value: &mut Data,
    context: &mut Context,
    execution: &Execution<'_>,
) -> StoreResult<bool> {
    let Some(conditional) = conditional else {
        return Ok(condition.unwrap_or(true));
    };

    if let Some(transform) = &conditional.transform {
        let mut transform = (**transform).clone();
        transform.update_operation_input(value.clone());
        *value = execution.run_operation(transform, context).await?.materialise();
    }

    let item = match &*value {
        Data::Item(item) => Some(item),
        _ => None,
    };
    conditional
        .predicate
        .test_item(item)
        .map_err(|e| OperationError::from_predicate(e).into())
}

/// Repeats the delegate while the condition holds, up to the store's
/// iteration limit
pub struct WhileHandler {
    max_repeats: usize,
}

impl WhileHandler {
    pub fn new(max_repeats: usize) -> Self {
        Self { max_repeats }
    }
}

#[async_trait]
impl OperationHandler for WhileHandler {
    async fn handle(
        &self,
        operation: Operation,
        context: &mut Context,
        execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let op = unpack!(operation, While);
        let max_repeats = op.effective_max_repeats().min(self.max_repeats);
        let delegate_has_output = op.operation.kind().has_output();

        let mut value = op.input.materialise();
        let mut repeats = 0;
        while repeats < max_repeats {
            let holds = test_condition(op.condition, op.conditional.as_ref(), &mut value, context, execution).await?;
            if !holds {
                break;
            }

            let mut delegate = (*op.operation).clone();
            delegate.update_operation_input(value.clone());
            let output = execution.run_operation(delegate, context).await?;
            if delegate_has_output {
                value = output.materialise();
            }
            repeats += 1;
        }

        debug!(repeats, max_repeats, "While finished");
        Ok(value)
    }
}

/// Runs `then` or `otherwise`. A missing branch passes the input through.
pub struct IfHandler;

#[async_trait]
impl OperationHandler for IfHandler {
    async fn handle(
        &self,
        operation: Operation,
        context: &mut Context,
        execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let op = unpack!(operation, If);
        let input = op.input.materialise();

        let mut tested = input.clone();
        let holds = test_condition(op.condition, op.conditional.as_ref(), &mut tested, context, execution).await?;
        let branch = if holds { op.then } else { op.otherwise };

        match branch {
            Some(branch) => {
                let mut branch = *branch;
                branch.update_operation_input(input);
                execution.run_operation(branch, context).await
            }
            None => Ok(input),
        }
    }
}

/// Applies functions to the whole input
pub struct MapHandler;

#[async_trait]
impl OperationHandler for MapHandler {
    async fn handle(
        &self,
        operation: Operation,
        _context: &mut Context,
        _execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let op = unpack!(operation, Map);
        let input = op.input.into_item().unwrap_or(Item::Null);
        let output = Function::apply_all(&op.functions, input)?;
        Ok(Data::Item(output))
    }
}

/// Runs the delegate once per input item
pub struct ForEachHandler;

#[async_trait]
impl OperationHandler for ForEachHandler {
    async fn handle(
        &self,
        operation: Operation,
        context: &mut Context,
        execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let op = unpack!(operation, ForEach);
        let mut outputs = Vec::new();
        for item in op.input.into_items() {
            let mut delegate = (*op.operation).clone();
            delegate.update_operation_input(Data::Item(item));
            let output = execution.run_operation(delegate, context).await?;
            outputs.push(output.into_item().unwrap_or(Item::Null));
        }
        Ok(Data::list(outputs))
    }
}

/// Folds input values, starting from the identity when one is given
pub struct ReduceHandler;

#[async_trait]
impl OperationHandler for ReduceHandler {
    async fn handle(
        &self,
        operation: Operation,
        _context: &mut Context,
        _execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let op = unpack!(operation, Reduce);
        let mut accumulator = op.identity;
        for item in op.input.into_items() {
            let value = item.to_value().ok_or_else(|| {
                OperationError::invalid_input("Reduce", format!("cannot reduce a {}", item.type_name()))
            })?;
            accumulator = Some(match accumulator {
                Some(acc) => op.aggregate_function.apply(&acc, &value)?,
                None => value,
            });
        }
        Ok(Data::from(accumulator.map(Item::Value)))
    }
}

/// Runs a nested chain as a single operation
pub struct OperationChainHandler;

#[async_trait]
impl OperationHandler for OperationChainHandler {
    async fn handle(
        &self,
        operation: Operation,
        context: &mut Context,
        execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let chain = match operation {
            Operation::Chain(chain) => chain,
            other => {
                return Err(super::wrong_operation(
                    crate::operation::OperationKind::OperationChain,
                    &other,
                ))
            }
        };
        execution.run_chain(chain, context).await
    }
}

#[cfg(test)]
mod tests {
    use crate::config::StoreProperties;
    use crate::element::{Value, ValueKind};
    use crate::function::{BinaryOperator, Function, Predicate};
    use crate::operation::{
        Conditional, Count, Data, ForEach, If, Item, Map, OperationChain, Reduce, ToList, While,
    };
    use crate::schema::{GroupDefinition, Schema, TypeDefinition};
    use crate::store::context::Context;
    use crate::store::map::MapStore;
    use crate::store::Store;

    fn store() -> Store {
        let schema = Schema::builder()
            .entity("person", GroupDefinition::new().vertex("string"))
            .type_definition("string", TypeDefinition::new(ValueKind::String))
            .build_unchecked();
        MapStore::create(StoreProperties::named("control"), schema).unwrap()
    }

    fn long(v: i64) -> Item {
        Item::Value(Value::Long(v))
    }

    fn less_than(v: i64) -> Predicate {
        Predicate::IsLessThan {
            value: Value::Long(v),
            or_equal_to: false,
        }
    }

    #[tokio::test]
    async fn test_while_stops_when_the_predicate_fails() {
        let store = store();
        let mut context = Context::default();
        let op = While::new(Map::new(vec![Function::Increment { by: 1 }]))
            .input(long(0))
            .conditional(Conditional::new(less_than(5)));
        let output = store.execute_operation(op, &mut context).await.unwrap();
        assert_eq!(output.into_item(), Some(long(5)));
    }

    #[tokio::test]
    async fn test_while_conditional_transform_replaces_the_value() {
        let store = store();
        let mut context = Context::default();
        let conditional = Conditional::new(less_than(100))
            .transform(Map::new(vec![Function::Multiply { by: 2 }]));
        let op = While::new(Map::new(vec![Function::Increment { by: 1 }]))
            .input(long(1))
            .max_repeats(3)
            .conditional(conditional);
        // 1 -> 2 -> 3 -> 6 -> 7 -> 14 -> 15
        let output = store.execute_operation(op, &mut context).await.unwrap();
        assert_eq!(output.into_item(), Some(long(15)));
    }

    #[tokio::test]
    async fn test_if_branches() {
        let store = store();
        let mut context = Context::default();

        let op = If::new()
            .input(long(3))
            .conditional(Conditional::new(less_than(5)))
            .then(Map::new(vec![Function::Multiply { by: 10 }]))
            .otherwise(Map::new(vec![Function::Increment { by: 1 }]));
        let output = store.execute_operation(op, &mut context).await.unwrap();
        assert_eq!(output.into_item(), Some(long(30)));

        let op = If::new()
            .input(long(3))
            .condition(false)
            .then(Map::new(vec![Function::Multiply { by: 10 }]));
        let output = store.execute_operation(op, &mut context).await.unwrap();
        assert_eq!(output.into_item(), Some(long(3)));
    }

    #[tokio::test]
    async fn test_for_each_and_reduce() {
        let store = store();
        let mut context = Context::default();
        let values = Data::from(vec![Value::Long(1), Value::Long(2), Value::Long(3)]);

        let chain = OperationChain::new()
            .then(ForEach::new(Map::new(vec![Function::Multiply { by: 2 }])).input(values.clone()))
            .then(Reduce::new(BinaryOperator::Sum).identity(100i64));
        let output = store.execute(chain, &mut context).await.unwrap();
        assert_eq!(output.into_item(), Some(long(112)));

        let output = store
            .execute_operation(Reduce::new(BinaryOperator::Max), &mut context)
            .await
            .unwrap();
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_nested_chain_receives_input() {
        let store = store();
        let mut context = Context::default();
        let nested = OperationChain::new().then(ToList::default()).then(Count::default());
        let chain = OperationChain::new()
            .then(Map::new(vec![Function::Identity]).input(Data::list(vec![long(1), long(2)])))
            .then(nested);
        let output = store.execute(chain, &mut context).await.unwrap();
        assert_eq!(output.into_item(), Some(long(2)));
    }
}

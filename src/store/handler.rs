//! Operation handlers and chain execution
//!
//! Handlers are registered per `OperationKind`. Lookup is by exact kind: a
//! handler never serves an operation of another kind, even a closely
//! related one.

use crate::operation::{Data, Operation, OperationChain, OperationKind};
use crate::schema::Schema;
use crate::store::context::Context;
use crate::store::error::{StoreError, StoreResult};
use crate::store::engine::{Store, StoreState};
use crate::store::traits::TraitSet;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// Runs one kind of operation
#[async_trait]
pub trait OperationHandler: Send + Sync {
    /// Execute `operation`. Nested operations go back through `execution`
    /// so they see the same handler registry.
    async fn handle(
        &self,
        operation: Operation,
        context: &mut Context,
        execution: &Execution<'_>,
    ) -> StoreResult<Data>;
}

/// Handlers keyed by exact operation kind
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<OperationKind, Arc<dyn OperationHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: OperationKind, handler: Arc<dyn OperationHandler>) {
        self.handlers.insert(kind, handler);
    }

    pub fn remove(&mut self, kind: OperationKind) -> Option<Arc<dyn OperationHandler>> {
        self.handlers.remove(&kind)
    }

    pub fn get(&self, kind: OperationKind) -> Option<&Arc<dyn OperationHandler>> {
        self.handlers.get(&kind)
    }

    pub fn contains(&self, kind: OperationKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<OperationKind> {
        let mut kinds: Vec<OperationKind> = self.handlers.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.kinds()).finish()
    }
}

/// One `execute` call's view of the store. Holds the registry snapshot the
/// call started with; registration waits until every execution finishes.
pub struct Execution<'a> {
    store: &'a Store,
    state: &'a StoreState,
}

impl<'a> Execution<'a> {
    pub(crate) fn new(store: &'a Store, state: &'a StoreState) -> Self {
        Self { store, state }
    }

    pub fn store(&self) -> &Store {
        self.store
    }

    pub fn schema(&self) -> &Schema {
        &self.state.schema
    }

    pub fn traits(&self) -> &TraitSet {
        self.store.traits()
    }

    pub fn is_supported(&self, kind: OperationKind) -> bool {
        self.store.supported_in(self.state, kind)
    }

    /// Dispatch one operation to its handler
    pub async fn run_operation(&self, operation: Operation, context: &mut Context) -> StoreResult<Data> {
        let kind = operation.kind();
        let handler = match self.state.registry.get(kind) {
            Some(handler) if self.is_supported(kind) => Arc::clone(handler),
            _ => {
                return Err(StoreError::UnsupportedOperation {
                    store: self.store.name().to_string(),
                    operation: kind,
                })
            }
        };

        debug!(
            execution_id = %context.execution_id(),
            operation = %kind,
            "Dispatching operation"
        );
        handler.handle(operation, context, self).await
    }

    /// Run a chain, threading each output into the next input.
    ///
    /// On failure the remaining operations are dropped along with the
    /// output held so far, which releases any open streams.
    pub async fn run_chain(&self, chain: OperationChain, context: &mut Context) -> StoreResult<Data> {
        let mut output = Data::Empty;
        for (index, mut operation) in chain.operations.into_iter().enumerate() {
            let kind = operation.kind();
            operation.update_operation_input(std::mem::take(&mut output));

            debug!(
                execution_id = %context.execution_id(),
                index,
                operation = %kind,
                "Running chain operation"
            );

            match self.run_operation(operation, context).await {
                Ok(data) if kind.has_output() => output = data,
                Ok(data) => data.close(),
                Err(source) => {
                    error!(
                        execution_id = %context.execution_id(),
                        index,
                        operation = %kind,
                        error = %source,
                        "Operation chain aborted"
                    );
                    return Err(StoreError::OperationFailed {
                        index,
                        operation: kind,
                        source: Box::new(source),
                    });
                }
            }
        }
        Ok(output)
    }
}

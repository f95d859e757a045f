//! Trellis Store
//!
//! A store owns a schema, the handler registry and a backend:
//! - Initialise: validate schema → backend checks → register handlers
//! - Execute: validate chain → dispatch each operation by exact kind
//!
//! Concurrent executions share the registry through a read lock.
//! Registration and re-initialisation take the write lock, so they wait for
//! in-flight executions and block new ones until done.

use crate::config::StoreProperties;
use crate::operation::{Data, Operation, OperationChain, OperationKind};
use crate::schema::{Schema, SchemaError};
use crate::store::context::{Context, User};
use crate::store::error::{StoreError, StoreResult};
use crate::store::handler::{Execution, HandlerRegistry, OperationHandler};
use crate::store::handlers;
use crate::store::traits::{StoreTrait, TraitSet};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A storage backend plugged into a `Store`
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Short backend name used in logs
    fn backend_type(&self) -> &'static str;

    fn traits(&self) -> TraitSet;

    /// Reject schemas the backend cannot honour. Runs before any handler is
    /// registered.
    fn pre_initialise(&self, _schema: &Schema) -> StoreResult<()> {
        Ok(())
    }

    /// Backend-specific handlers, registered over the core ones
    fn handlers(&self, schema: &Arc<Schema>) -> Vec<(OperationKind, Arc<dyn OperationHandler>)>;

    /// Release everything the backend holds
    async fn reset(&self);
}

/// Schema and handlers, swapped as a unit on re-initialisation
#[derive(Debug)]
pub struct StoreState {
    pub(crate) schema: Arc<Schema>,
    pub(crate) registry: HandlerRegistry,
}

pub struct Store {
    properties: StoreProperties,
    traits: TraitSet,
    backend: Arc<dyn StoreBackend>,
    state: RwLock<StoreState>,
}

impl Store {
    /// Validate the schema against the backend and register handlers.
    /// Any failure is reported before a handler exists.
    pub fn initialise(
        properties: StoreProperties,
        schema: Schema,
        backend: Arc<dyn StoreBackend>,
    ) -> StoreResult<Self> {
        let state = Self::build_state(&properties, schema, backend.as_ref())?;
        let traits = backend.traits();

        tracing::info!(
            store = %properties.name,
            backend = backend.backend_type(),
            handlers = state.registry.len(),
            traits = ?traits,
            "Store initialised"
        );

        Ok(Self {
            properties,
            traits,
            backend,
            state: RwLock::new(state),
        })
    }

    fn build_state(
        properties: &StoreProperties,
        schema: Schema,
        backend: &dyn StoreBackend,
    ) -> StoreResult<StoreState> {
        let errors = schema.validate();
        if !errors.is_empty() {
            return Err(SchemaError::Invalid { errors }.into());
        }
        backend.pre_initialise(&schema)?;

        let schema = Arc::new(schema);
        let mut registry = HandlerRegistry::new();
        for (kind, handler) in handlers::core_handlers(properties) {
            registry.register(kind, handler);
        }
        for (kind, handler) in backend.handlers(&schema) {
            registry.register(kind, handler);
        }
        Ok(StoreState { schema, registry })
    }

    /// Replace the schema, dropping held data and every handler registered
    /// since initialisation. On failure the store is left unchanged.
    pub async fn reinitialise(&self, schema: Schema) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let fresh = Self::build_state(&self.properties, schema, self.backend.as_ref())?;
        self.backend.reset().await;
        *state = fresh;
        tracing::info!(store = %self.properties.name, "Store re-initialised");
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.properties.name
    }

    pub fn properties(&self) -> &StoreProperties {
        &self.properties
    }

    pub fn traits(&self) -> &TraitSet {
        &self.traits
    }

    pub fn has_trait(&self, store_trait: StoreTrait) -> bool {
        self.traits.contains(&store_trait)
    }

    pub async fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.state.read().await.schema)
    }

    /// Register a handler for an exact operation kind, or remove it with `None`
    pub async fn add_operation_handler(&self, kind: OperationKind, handler: Option<Arc<dyn OperationHandler>>) {
        let mut state = self.state.write().await;
        match handler {
            Some(handler) => {
                state.registry.register(kind, handler);
                tracing::info!(store = %self.properties.name, operation = %kind, "Registered handler");
            }
            None => {
                state.registry.remove(kind);
                tracing::info!(store = %self.properties.name, operation = %kind, "Removed handler");
            }
        }
    }

    pub async fn is_supported(&self, kind: OperationKind) -> bool {
        let state = self.state.read().await;
        self.supported_in(&state, kind)
    }

    pub async fn supported_operations(&self) -> Vec<OperationKind> {
        let state = self.state.read().await;
        state
            .registry
            .kinds()
            .into_iter()
            .filter(|kind| self.supported_in(&state, *kind))
            .collect()
    }

    /// A handler is registered and the operation's trait preconditions hold
    pub(crate) fn supported_in(&self, state: &StoreState, kind: OperationKind) -> bool {
        state.registry.contains(kind) && self.preconditions_met(&state.schema, kind)
    }

    fn preconditions_met(&self, schema: &Schema, kind: OperationKind) -> bool {
        match kind {
            OperationKind::GetElementsInRanges => {
                self.has_trait(StoreTrait::Ordered)
                    && schema
                        .vertex_serialiser()
                        .map(|s| s.is_consistent() && s.preserves_object_ordering())
                        .unwrap_or(false)
            }
            _ => true,
        }
    }

    pub fn create_context(&self, user: User) -> Context {
        Context::new(user)
    }

    /// Run a chain. The result is the output of the last operation.
    pub async fn execute(&self, chain: OperationChain, context: &mut Context) -> StoreResult<Data> {
        chain.validate()?;
        let state = self.state.read().await;
        tracing::debug!(
            store = %self.properties.name,
            execution_id = %context.execution_id(),
            user = %context.user().user_id,
            operations = chain.len(),
            "Executing chain"
        );
        Execution::new(self, &state).run_chain(chain, context).await
    }

    /// Run a single operation as a chain of one
    pub async fn execute_operation(
        &self,
        operation: impl Into<Operation>,
        context: &mut Context,
    ) -> StoreResult<Data> {
        self.execute(OperationChain::from(operation.into()), context).await
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.properties.name)
            .field("backend", &self.backend.backend_type())
            .field("traits", &self.traits)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Entity, Value, ValueKind};
    use crate::function::{BinaryOperator, Predicate};
    use crate::operation::{
        Conditional, Count, DiscardOutput, GetAllElements, GetElements, GetElementsInRanges, Item, Limit, ToList,
        While,
    };
    use crate::schema::{GroupDefinition, TypeDefinition};
    use crate::serialisation::{MultiEntryConfig, SerialiserConfig};
    use crate::store::map::MapStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn schema(vertex: SerialiserConfig) -> Schema {
        Schema::builder()
            .entity(
                "person",
                GroupDefinition::new().vertex("string").property("count", "long"),
            )
            .type_definition("string", TypeDefinition::new(ValueKind::String))
            .type_definition(
                "long",
                TypeDefinition::new(ValueKind::Long).aggregate_function(BinaryOperator::Sum),
            )
            .vertex_serialiser(vertex)
            .build_unchecked()
    }

    fn store() -> Store {
        MapStore::create(StoreProperties::named("test"), schema(SerialiserConfig::String)).unwrap()
    }

    /// Counts invocations and returns nothing
    struct CountingHandler(Arc<AtomicUsize>);

    #[async_trait]
    impl OperationHandler for CountingHandler {
        async fn handle(
            &self,
            _operation: Operation,
            _context: &mut Context,
            _execution: &Execution<'_>,
        ) -> StoreResult<Data> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Data::Empty)
        }
    }

    #[tokio::test]
    async fn test_while_is_capped_by_the_ceiling() {
        let store = store();
        let calls = Arc::new(AtomicUsize::new(0));
        store
            .add_operation_handler(
                OperationKind::DiscardOutput,
                Some(Arc::new(CountingHandler(Arc::clone(&calls)))),
            )
            .await;

        let mut context = Context::default();
        let op = While::new(DiscardOutput::default())
            .input(Item::Value(1i64.into()))
            .max_repeats(1_000_000)
            .condition(true);
        store.execute_operation(op, &mut context).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1000);
    }

    #[tokio::test]
    async fn test_store_limit_lowers_the_ceiling() {
        let properties = StoreProperties {
            max_repeats: 7,
            ..StoreProperties::named("test")
        };
        let store = MapStore::create(properties, schema(SerialiserConfig::String)).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        store
            .add_operation_handler(
                OperationKind::DiscardOutput,
                Some(Arc::new(CountingHandler(Arc::clone(&calls)))),
            )
            .await;

        let mut context = Context::default();
        let op = While::new(DiscardOutput::default()).condition(true);
        store.execute_operation(op, &mut context).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn test_dispatch_is_by_exact_kind() {
        let store = store();
        let calls = Arc::new(AtomicUsize::new(0));
        store
            .add_operation_handler(
                OperationKind::GetElements,
                Some(Arc::new(CountingHandler(Arc::clone(&calls)))),
            )
            .await;
        store.add_operation_handler(OperationKind::GetAllElements, None).await;

        assert!(store.is_supported(OperationKind::GetElements).await);
        assert!(!store.is_supported(OperationKind::GetAllElements).await);

        let mut context = Context::default();
        let err = store
            .execute_operation(GetAllElements::new(), &mut context)
            .await
            .unwrap_err();
        match err.root_cause() {
            StoreError::UnsupportedOperation { store, operation } => {
                assert_eq!(store, "test");
                assert_eq!(*operation, OperationKind::GetAllElements);
            }
            other => panic!("unexpected error: {other}"),
        }

        store
            .execute_operation(GetElements::new(vec![Item::Value("a".into())]), &mut context)
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let supported = store.supported_operations().await;
        assert!(supported.contains(&OperationKind::GetElements));
        assert!(!supported.contains(&OperationKind::GetAllElements));
    }

    #[tokio::test]
    async fn test_range_scans_need_an_ordered_vertex_serialiser() {
        let ordered = store();
        assert!(ordered.is_supported(OperationKind::GetElementsInRanges).await);

        let mut context = Context::default();
        let result = ordered
            .execute_operation(GetElementsInRanges::new(Vec::<Item>::new()), &mut context)
            .await;
        assert!(result.is_ok());

        let multi = SerialiserConfig::Multi {
            entries: vec![
                MultiEntryConfig {
                    key: None,
                    kind: ValueKind::String,
                    serialiser: SerialiserConfig::String,
                },
                MultiEntryConfig {
                    key: None,
                    kind: ValueKind::Long,
                    serialiser: SerialiserConfig::OrderedLong,
                },
            ],
        };
        let unordered = MapStore::create(StoreProperties::default(), schema(multi)).unwrap();
        assert!(unordered.is_supported(OperationKind::GetElements).await);
        assert!(!unordered.is_supported(OperationKind::GetElementsInRanges).await);
    }

    #[tokio::test]
    async fn test_inconsistent_vertex_serialiser_is_rejected() {
        let err = MapStore::create(StoreProperties::default(), schema(SerialiserConfig::Object)).unwrap_err();
        assert!(matches!(err, StoreError::Initialisation(_)));
    }

    #[tokio::test]
    async fn test_chain_threads_outputs() {
        let store = store();
        let mut context = Context::default();
        let elements: Vec<crate::element::Element> = (0..5)
            .map(|i| Entity::new("person", format!("p{i}")).property("count", 1i64).into())
            .collect();
        store
            .execute_operation(crate::operation::AddElements::new(elements), &mut context)
            .await
            .unwrap();

        let chain = OperationChain::new()
            .then(GetAllElements::new())
            .then(Limit::new(3))
            .then(ToList::default())
            .then(Count::default());
        let output = store.execute(chain, &mut context).await.unwrap();
        assert_eq!(output.into_item(), Some(Item::Value(Value::Long(3))));
    }

    #[tokio::test]
    async fn test_predicate_type_mismatch_is_reported() {
        let store = store();
        let mut context = Context::default();
        let op = While::new(Count::default())
            .input(Item::Value("text".into()))
            .conditional(Conditional::new(Predicate::IsMoreThan {
                value: 1i64.into(),
                or_equal_to: false,
            }));
        let err = store.execute_operation(op, &mut context).await.unwrap_err();
        assert_eq!(
            err.root_cause().to_string(),
            "The predicate 'IsMoreThan' cannot accept an input of type 'String'"
        );
    }

    #[tokio::test]
    async fn test_reinitialise_clears_registered_handlers() {
        let store = store();
        store.add_operation_handler(OperationKind::Count, None).await;
        assert!(!store.is_supported(OperationKind::Count).await);

        store.reinitialise(schema(SerialiserConfig::String)).await.unwrap();
        assert!(store.is_supported(OperationKind::Count).await);

        let invalid = Schema::builder()
            .entity("person", GroupDefinition::new().vertex("missing"))
            .build_unchecked();
        assert!(store.reinitialise(invalid).await.is_err());
        assert!(store.schema().await.get_entity("person").is_some());
    }
}

//! Federated Store
//!
//! Presents several delegate stores as one:
//! - **Traits**: only those every delegate declares
//! - **Schema**: the merge of the delegate schemas; every conflict is
//!   reported at once
//! - **Writes**: `AddElements` sends each element to every delegate whose
//!   schema declares its group. Delegates are written one after another and
//!   each write is all-or-nothing on its own, but the fan-out is not: when a
//!   delegate fails, delegates before it keep their writes.
//! - **Reads**: `GetElements`, `GetAllElements`, `GetAdjacentIds` and
//!   `CountAllElementsDefaultView` go to the delegates covering the view's
//!   groups, each with the view narrowed to its own groups. Streams are
//!   concatenated in delegate order; counts are summed.
//!
//! Delegate schemas are read once at creation. Re-initialise a delegate by
//! rebuilding the federation.

use crate::config::StoreProperties;
use crate::element::{Element, Value};
use crate::operation::{
    AddElements, CountAllElementsDefaultView, Data, Item, ItemStream, Operation, OperationKind, View,
};
use crate::schema::{Schema, SchemaError};
use crate::store::context::Context;
use crate::store::engine::{Store, StoreBackend};
use crate::store::error::{StoreError, StoreResult};
use crate::store::handler::{Execution, OperationHandler};
use crate::store::handlers::element::validate_elements;
use crate::store::handlers::{entry, into_elements};
use crate::store::traits::{self, StoreTrait, TraitSet};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// A named member of the federation
#[derive(Debug, Clone)]
pub struct Delegate {
    pub name: String,
    pub store: Arc<Store>,
    schema: Arc<Schema>,
}

impl Delegate {
    fn declares(&self, element: &Element) -> bool {
        self.schema.definition_for(element).is_some()
    }

    /// The view restricted to this delegate's groups, or `None` when the
    /// view names groups and none of them are declared here
    fn narrow(&self, view: &View) -> Option<View> {
        if view.covers_all_groups() {
            return Some(view.clone());
        }
        let narrowed = View {
            entities: view
                .entities
                .iter()
                .filter(|(group, _)| self.schema.get_entity(group).is_some())
                .map(|(g, d)| (g.clone(), d.clone()))
                .collect(),
            edges: view
                .edges
                .iter()
                .filter(|(group, _)| self.schema.get_edge(group).is_some())
                .map(|(g, d)| (g.clone(), d.clone()))
                .collect(),
            global_elements: view.global_elements.clone(),
        };
        if narrowed.entities.is_empty() && narrowed.edges.is_empty() {
            return None;
        }
        Some(narrowed)
    }
}

#[derive(Debug)]
pub struct FederatedStore {
    delegates: Arc<Vec<Delegate>>,
    traits: TraitSet,
}

impl FederatedStore {
    /// Collect the delegates and merge their schemas
    pub async fn new(delegates: Vec<(String, Arc<Store>)>) -> StoreResult<(Self, Schema)> {
        if delegates.is_empty() {
            return Err(StoreError::Initialisation(
                "a federated store needs at least one delegate".to_string(),
            ));
        }

        let mut members = Vec::with_capacity(delegates.len());
        for (name, store) in delegates {
            let schema = store.schema().await;
            members.push(Delegate { name, store, schema });
        }

        let schema = merge_schemas(members.iter().map(|d| d.schema.as_ref()))?;
        let traits = traits::intersection(members.iter().map(|d| d.store.traits()));
        Ok((
            Self {
                delegates: Arc::new(members),
                traits,
            },
            schema,
        ))
    }

    /// Initialise a store over the given delegates
    pub async fn create(properties: StoreProperties, delegates: Vec<(String, Arc<Store>)>) -> StoreResult<Store> {
        let (backend, schema) = Self::new(delegates).await?;
        info!(
            store = %properties.name,
            delegates = backend.delegates.len(),
            "Federating stores"
        );
        Store::initialise(properties, schema, Arc::new(backend))
    }

    pub fn delegates(&self) -> &[Delegate] {
        &self.delegates
    }
}

/// Merge every schema, listing all conflicts rather than stopping at the
/// first pair that disagrees
fn merge_schemas<'a>(mut schemas: impl Iterator<Item = &'a Schema>) -> StoreResult<Schema> {
    let Some(first) = schemas.next() else {
        return Ok(Schema::default());
    };
    let mut merged = first.clone();
    let mut conflicts = Vec::new();
    for schema in schemas {
        match merged.merge(schema) {
            Ok(next) => merged = next,
            Err(SchemaError::MergeConflicts(found)) => conflicts.extend(found),
            Err(other) => return Err(other.into()),
        }
    }
    if !conflicts.is_empty() {
        return Err(SchemaError::MergeConflicts(conflicts).into());
    }
    Ok(merged)
}

#[async_trait]
impl StoreBackend for FederatedStore {
    fn backend_type(&self) -> &'static str {
        "federated"
    }

    fn traits(&self) -> TraitSet {
        self.traits.clone()
    }

    fn handlers(&self, _schema: &Arc<Schema>) -> Vec<(OperationKind, Arc<dyn OperationHandler>)> {
        let delegates = &self.delegates;
        let mut handlers = vec![entry(
            OperationKind::AddElements,
            FederatedAddHandler {
                delegates: Arc::clone(delegates),
            },
        )];
        for kind in [
            OperationKind::GetElements,
            OperationKind::GetAllElements,
            OperationKind::GetAdjacentIds,
        ] {
            handlers.push(entry(
                kind,
                FederatedReadHandler {
                    delegates: Arc::clone(delegates),
                },
            ));
        }
        handlers.push(entry(
            OperationKind::CountAllElementsDefaultView,
            FederatedCountHandler {
                delegates: Arc::clone(delegates),
            },
        ));
        handlers
    }

    /// Delegates own their data; nothing is held here
    async fn reset(&self) {}
}

fn delegate_context(context: &Context) -> Context {
    Context::new(context.user().clone())
}

/// Tag a delegate failure with the delegate's name
fn delegate_failed(delegate: &Delegate, err: StoreError) -> StoreError {
    StoreError::Delegate {
        delegate: delegate.name.clone(),
        source: Box::new(err),
    }
}

struct FederatedAddHandler {
    delegates: Arc<Vec<Delegate>>,
}

#[async_trait]
impl OperationHandler for FederatedAddHandler {
    async fn handle(
        &self,
        operation: Operation,
        context: &mut Context,
        execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let op = unpack!(operation, AddElements);
        let mut elements = into_elements(op.input, OperationKind::AddElements)?;
        if op.validate && execution.traits().contains(&StoreTrait::StoreValidation) {
            elements = validate_elements(execution.schema(), elements, op.skip_invalid_elements)?;
        }

        let mut routed: Vec<Vec<Element>> = vec![Vec::new(); self.delegates.len()];
        for element in elements {
            let mut targets = self
                .delegates
                .iter()
                .enumerate()
                .filter(|(_, d)| d.declares(&element))
                .map(|(i, _)| i)
                .peekable();
            if targets.peek().is_none() {
                return Err(StoreError::Validation(format!(
                    "no delegate declares the {} group '{}'",
                    if element.is_edge() { "edge" } else { "entity" },
                    element.group()
                )));
            }
            for i in targets {
                routed[i].push(element.clone());
            }
        }

        for (delegate, elements) in self.delegates.iter().zip(routed) {
            if elements.is_empty() {
                continue;
            }
            debug!(delegate = %delegate.name, elements = elements.len(), "Routing AddElements");
            let add = AddElements::new(elements)
                .validate(op.validate)
                .skip_invalid_elements(op.skip_invalid_elements);
            let mut delegate_context = delegate_context(context);
            delegate
                .store
                .execute_operation(add, &mut delegate_context)
                .await
                .map_err(|e| delegate_failed(delegate, e))?;
        }
        Ok(Data::Empty)
    }
}

struct FederatedReadHandler {
    delegates: Arc<Vec<Delegate>>,
}

impl FederatedReadHandler {
    /// The operation's view, and a copy of the operation per delegate that
    /// covers it
    fn route(&self, operation: Operation) -> StoreResult<Vec<(&Delegate, Operation)>> {
        let (view, input) = match &operation {
            Operation::GetElements(op) => (&op.view, Some(&op.input)),
            Operation::GetAllElements(op) => (&op.view, None),
            Operation::GetAdjacentIds(op) => (&op.view, Some(&op.input)),
            other => {
                return Err(crate::store::handlers::wrong_operation(
                    OperationKind::GetElements,
                    other,
                ))
            }
        };
        let view = view.clone();
        // Every delegate reads the same seeds
        let input = input.cloned().map(Data::materialise);

        let mut routed = Vec::new();
        for delegate in self.delegates.iter() {
            let Some(narrowed) = delegate.narrow(&view) else {
                continue;
            };
            let mut copy = operation.clone();
            match &mut copy {
                Operation::GetElements(op) => op.view = narrowed,
                Operation::GetAllElements(op) => op.view = narrowed,
                Operation::GetAdjacentIds(op) => op.view = narrowed,
                _ => {}
            }
            if let Some(input) = &input {
                copy.take_input();
                copy.update_operation_input(input.clone());
            }
            routed.push((delegate, copy));
        }
        Ok(routed)
    }
}

#[async_trait]
impl OperationHandler for FederatedReadHandler {
    async fn handle(
        &self,
        operation: Operation,
        context: &mut Context,
        _execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let kind = operation.kind();
        let routed = self.route(operation)?;
        debug!(operation = %kind, delegates = routed.len(), "Routing read");

        let mut outputs = Vec::with_capacity(routed.len());
        for (delegate, operation) in routed {
            let mut delegate_context = delegate_context(context);
            let output = delegate
                .store
                .execute_operation(operation, &mut delegate_context)
                .await
                .map_err(|e| delegate_failed(delegate, e))?;
            outputs.push(output);
        }
        Ok(Data::stream(ItemStream::new(
            outputs.into_iter().flat_map(Data::into_items),
        )))
    }
}

struct FederatedCountHandler {
    delegates: Arc<Vec<Delegate>>,
}

#[async_trait]
impl OperationHandler for FederatedCountHandler {
    async fn handle(
        &self,
        operation: Operation,
        context: &mut Context,
        _execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let _op = unpack!(operation, CountAllElementsDefaultView);
        let mut total = 0i64;
        for delegate in self.delegates.iter() {
            let mut delegate_context = delegate_context(context);
            let output = delegate
                .store
                .execute_operation(CountAllElementsDefaultView::default(), &mut delegate_context)
                .await
                .map_err(|e| delegate_failed(delegate, e))?;
            if let Some(Item::Value(Value::Long(n))) = output.into_item() {
                total += n;
            }
        }
        Ok(Data::Item(Item::Value(Value::Long(total))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Edge, Entity, ValueKind};
    use crate::function::BinaryOperator;
    use crate::operation::{GetAllElements, GetElements, ViewElementDefinition};
    use crate::schema::{GroupDefinition, SchemaBuilder, TypeDefinition};
    use crate::serialisation::{MultiEntryConfig, SerialiserConfig};
    use crate::store::map::{MapStore, MapStoreConfig};

    fn types(builder: SchemaBuilder, long: BinaryOperator) -> SchemaBuilder {
        builder
            .type_definition("string", TypeDefinition::new(ValueKind::String))
            .type_definition("long", TypeDefinition::new(ValueKind::Long).aggregate_function(long))
    }

    fn people() -> Schema {
        types(
            Schema::builder().entity("person", GroupDefinition::new().vertex("string").property("count", "long")),
            BinaryOperator::Sum,
        )
        .build()
        .unwrap()
    }

    fn friendships() -> Schema {
        types(
            Schema::builder().edge(
                "knows",
                GroupDefinition::new().endpoints("string", "string").property("count", "long"),
            ),
            BinaryOperator::Sum,
        )
        .build()
        .unwrap()
    }

    fn map(name: &str, schema: Schema) -> Arc<Store> {
        Arc::new(MapStore::create(StoreProperties::named(name), schema).unwrap())
    }

    async fn federation() -> (Store, Arc<Store>, Arc<Store>) {
        let people_store = map("people", people());
        let friends_store = map("friends", friendships());
        let store = FederatedStore::create(
            StoreProperties::named("federated"),
            vec![
                ("people".to_string(), Arc::clone(&people_store)),
                ("friends".to_string(), Arc::clone(&friends_store)),
            ],
        )
        .await
        .unwrap();
        (store, people_store, friends_store)
    }

    fn elements(output: Data) -> Vec<Element> {
        output
            .into_items()
            .filter_map(|item| match item {
                Item::Element(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    fn person(vertex: &str) -> Element {
        Entity::new("person", vertex).property("count", 1i64).into()
    }

    fn knows(source: &str, destination: &str) -> Element {
        Edge::new("knows", source, destination, true)
            .property("count", 1i64)
            .into()
    }

    #[tokio::test]
    async fn test_schema_is_merged_and_traits_intersected() {
        let people_store = map("people", people());
        let properties = StoreProperties {
            map: MapStoreConfig {
                visibility: false,
                ..Default::default()
            },
            ..StoreProperties::named("friends")
        };
        let friends_store = Arc::new(MapStore::create(properties, friendships()).unwrap());
        let store = FederatedStore::create(
            StoreProperties::named("federated"),
            vec![("people".into(), people_store), ("friends".into(), friends_store)],
        )
        .await
        .unwrap();

        let schema = store.schema().await;
        assert!(schema.get_entity("person").is_some());
        assert!(schema.get_edge("knows").is_some());
        assert!(store.has_trait(StoreTrait::IngestAggregation));
        assert!(!store.has_trait(StoreTrait::Visibility));
    }

    #[tokio::test]
    async fn test_every_conflict_is_reported() {
        let max_people = types(
            Schema::builder()
                .entity("person", GroupDefinition::new().vertex("string").property("count", "long")),
            BinaryOperator::Max,
        )
        .vertex_serialiser(SerialiserConfig::Multi {
            entries: vec![MultiEntryConfig {
                key: None,
                kind: ValueKind::String,
                serialiser: SerialiserConfig::String,
            }],
        })
        .build()
        .unwrap();
        let other_people = types(
            Schema::builder().entity("person", GroupDefinition::new().vertex("string")),
            BinaryOperator::Min,
        )
        .build()
        .unwrap();

        let delegates = vec![
            ("a".to_string(), map("a", people())),
            ("b".to_string(), map("b", max_people)),
            ("c".to_string(), map("c", other_people)),
        ];
        let err = FederatedStore::create(StoreProperties::named("federated"), delegates)
            .await
            .unwrap_err();
        match err {
            StoreError::Schema(SchemaError::MergeConflicts(conflicts)) => {
                assert!(conflicts.iter().any(|c| c.contains("vertex serialisers")));
                assert_eq!(conflicts.iter().filter(|c| c.contains("type 'long'")).count(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_writes_and_reads_are_routed_by_group() {
        let (store, people_store, friends_store) = federation().await;
        let mut context = Context::default();
        store
            .execute_operation(AddElements::new(vec![person("a"), knows("a", "b")]), &mut context)
            .await
            .unwrap();

        let count = |store: Arc<Store>| async move {
            let output = store
                .execute_operation(CountAllElementsDefaultView::default(), &mut Context::default())
                .await
                .unwrap();
            output.into_item()
        };
        assert_eq!(count(people_store).await, Some(Item::Value(Value::Long(1))));
        assert_eq!(count(friends_store).await, Some(Item::Value(Value::Long(1))));

        let output = store
            .execute_operation(CountAllElementsDefaultView::default(), &mut context)
            .await
            .unwrap();
        assert_eq!(output.into_item(), Some(Item::Value(Value::Long(2))));

        let output = store
            .execute_operation(GetAllElements::new(), &mut context)
            .await
            .unwrap();
        assert_eq!(elements(output), vec![person("a"), knows("a", "b")]);

        // Only the delegate declaring the view's group is asked
        let view = View::new().edge("knows", ViewElementDefinition::new());
        let op = GetElements::new(vec![Item::Value("a".into())]).view(view);
        let output = store.execute_operation(op, &mut context).await.unwrap();
        assert_eq!(elements(output), vec![knows("a", "b")]);
    }

    #[tokio::test]
    async fn test_unrouteable_elements_are_rejected() {
        let (store, _, _) = federation().await;
        let mut context = Context::default();
        let robot: Element = Entity::new("robot", "r").into();
        let err = store
            .execute_operation(AddElements::new(vec![robot]).validate(false), &mut context)
            .await
            .unwrap_err();
        assert!(err.root_cause().to_string().contains("robot"));
    }

    #[tokio::test]
    async fn test_failed_delegate_write_keeps_earlier_delegates() {
        let (store, people_store, friends_store) = federation().await;
        let mut context = Context::default();

        // The friends delegate cannot encode the numeric endpoint
        let bad: Element = Edge::new("knows", "a", 5i64, true).into();
        let err = store
            .execute_operation(AddElements::new(vec![person("a"), bad]).validate(false), &mut context)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("'friends'"));
        assert!(matches!(err.root_cause(), StoreError::Serialisation(_)));

        let count = |store: Arc<Store>| async move {
            store
                .execute_operation(CountAllElementsDefaultView::default(), &mut Context::default())
                .await
                .unwrap()
                .into_item()
        };
        assert_eq!(count(people_store).await, Some(Item::Value(Value::Long(1))));
        assert_eq!(count(friends_store).await, Some(Item::Value(Value::Long(0))));
    }
}

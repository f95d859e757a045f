//! Map store handlers for element reads and writes

use super::MapState;
use crate::element::{DirectedType, Element, ElementSeed, Value};
use crate::operation::{Data, Item, ItemStream, Operation, OperationError, OperationKind, View};
use crate::pipeline::{ElementAggregator, Pipeline};
use crate::schema::Schema;
use crate::store::context::Context;
use crate::store::error::StoreResult;
use crate::store::handler::{Execution, OperationHandler};
use crate::store::handlers::element::validate_elements;
use crate::store::handlers::into_elements;
use crate::store::traits::StoreTrait;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::debug;

/// Wrap results in a stream counted as open until released
fn tracked_stream(state: &MapState, items: Vec<Item>) -> Data {
    let open = Arc::clone(&state.open_streams);
    open.fetch_add(1, Ordering::SeqCst);
    Data::stream(ItemStream::new(items.into_iter()).on_close(move || {
        open.fetch_sub(1, Ordering::SeqCst);
    }))
}

fn element_items(elements: Vec<Element>) -> Vec<Item> {
    elements.into_iter().map(Item::Element).collect()
}

/// Views may only name groups the schema declares
fn check_view(view: &View, schema: &Schema, kind: OperationKind) -> StoreResult<()> {
    let unknown = view.unknown_groups(schema);
    if unknown.is_empty() {
        return Ok(());
    }
    Err(OperationError::Invalid {
        operation: kind.to_string(),
        reason: format!("view names unknown groups: {}", unknown.join(", ")),
    }
    .into())
}

/// Run the view's stages for the requesting user
fn apply_view(
    elements: Vec<Element>,
    view: &View,
    context: &Context,
    execution: &Execution<'_>,
) -> StoreResult<Vec<Element>> {
    let output = Pipeline::new(execution.schema(), view, execution.traits())
        .auths(&context.user().data_auths)
        .run(elements)?;
    Ok(output)
}

/// Seeds from the operation input. Plain values seed the entity at that
/// vertex; elements seed themselves.
fn seeds(input: Data, kind: OperationKind) -> StoreResult<Vec<ElementSeed>> {
    input
        .into_items()
        .map(|item| match item {
            Item::Seed(seed) => Ok(seed),
            Item::Value(vertex) => Ok(ElementSeed::Entity { vertex }),
            Item::Element(element) => Ok(ElementSeed::of(&element)),
            other => Err(OperationError::invalid_input(
                kind.name(),
                format!("expected seeds, found {}", other.type_name()),
            )
            .into()),
        })
        .collect()
}

fn edge_direction_accepted(element: &Element, directed_type: DirectedType) -> bool {
    match element {
        Element::Edge(edge) => directed_type.accepts(edge.directed),
        Element::Entity(_) => true,
    }
}

pub struct AddElementsHandler {
    state: Arc<MapState>,
    ingest_aggregation: bool,
}

impl AddElementsHandler {
    pub fn new(state: Arc<MapState>, ingest_aggregation: bool) -> Self {
        Self {
            state,
            ingest_aggregation,
        }
    }
}

#[async_trait]
impl OperationHandler for AddElementsHandler {
    async fn handle(
        &self,
        operation: Operation,
        _context: &mut Context,
        execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let op = unpack!(operation, AddElements);
        let schema = execution.schema();
        let mut elements = into_elements(op.input, OperationKind::AddElements)?;
        if op.validate && execution.traits().contains(&StoreTrait::StoreValidation) {
            elements = validate_elements(schema, elements, op.skip_invalid_elements)?;
        }

        let serialiser = schema.vertex_serialiser()?;
        let aggregator = self.ingest_aggregation.then(|| ElementAggregator::new(schema));
        let count = elements.len();

        let mut index = self.state.index.write().await;
        index.insert_all(elements, aggregator.as_ref(), serialiser.as_ref())?;
        debug!(added = count, stored = index.len(), "Added elements");
        Ok(Data::Empty)
    }
}

/// Elements related to the input seeds
pub struct GetElementsHandler {
    state: Arc<MapState>,
}

impl GetElementsHandler {
    pub fn new(state: Arc<MapState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl OperationHandler for GetElementsHandler {
    async fn handle(
        &self,
        operation: Operation,
        context: &mut Context,
        execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let op = unpack!(operation, GetElements);
        let schema = execution.schema();
        check_view(&op.view, schema, OperationKind::GetElements)?;
        let seeds = seeds(op.input, OperationKind::GetElements)?;
        let serialiser = schema.vertex_serialiser()?;

        let matched = {
            let index = self.state.index.read().await;
            let mut slots = BTreeSet::new();
            for seed in &seeds {
                for vertex in seed.vertices() {
                    slots.extend(index.slots_at(vertex, serialiser.as_ref())?);
                }
            }
            slots
                .into_iter()
                .filter_map(|slot| index.get(slot))
                .filter(|element| edge_direction_accepted(element, op.directed_type))
                .filter(|element| {
                    seeds
                        .iter()
                        .any(|seed| seed.matches(element, op.include_incoming_outgoing))
                })
                .cloned()
                .collect::<Vec<_>>()
        };

        let output = apply_view(matched, &op.view, context, execution)?;
        debug!(seeds = seeds.len(), results = output.len(), "GetElements");
        Ok(tracked_stream(&self.state, element_items(output)))
    }
}

pub struct GetAllElementsHandler {
    state: Arc<MapState>,
}

impl GetAllElementsHandler {
    pub fn new(state: Arc<MapState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl OperationHandler for GetAllElementsHandler {
    async fn handle(
        &self,
        operation: Operation,
        context: &mut Context,
        execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let op = unpack!(operation, GetAllElements);
        check_view(&op.view, execution.schema(), OperationKind::GetAllElements)?;
        let elements: Vec<Element> = {
            let index = self.state.index.read().await;
            index
                .elements()
                .iter()
                .filter(|element| edge_direction_accepted(element, op.directed_type))
                .cloned()
                .collect()
        };
        let output = apply_view(elements, &op.view, context, execution)?;
        Ok(tracked_stream(&self.state, element_items(output)))
    }
}

/// Vertices one edge hop from each input vertex, as entity seeds
pub struct GetAdjacentIdsHandler {
    state: Arc<MapState>,
}

impl GetAdjacentIdsHandler {
    pub fn new(state: Arc<MapState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl OperationHandler for GetAdjacentIdsHandler {
    async fn handle(
        &self,
        operation: Operation,
        context: &mut Context,
        execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let op = unpack!(operation, GetAdjacentIds);
        let schema = execution.schema();
        check_view(&op.view, schema, OperationKind::GetAdjacentIds)?;
        let serialiser = schema.vertex_serialiser()?;

        let mut vertices = Vec::new();
        for seed in seeds(op.input, OperationKind::GetAdjacentIds)? {
            match seed {
                ElementSeed::Entity { vertex } => vertices.push(vertex),
                ElementSeed::Edge { .. } => {
                    return Err(OperationError::invalid_input(
                        "GetAdjacentIds",
                        "expected entity seeds, found EdgeSeed",
                    )
                    .into())
                }
            }
        }

        let mut adjacent: Vec<Item> = Vec::new();
        let mut seen: HashSet<Value> = HashSet::new();
        for vertex in &vertices {
            let seed = ElementSeed::Entity { vertex: vertex.clone() };
            let edges: Vec<Element> = {
                let index = self.state.index.read().await;
                index
                    .slots_at(vertex, serialiser.as_ref())?
                    .into_iter()
                    .filter_map(|slot| index.get(slot))
                    .filter(|element| element.is_edge() && seed.matches(element, op.include_incoming_outgoing))
                    .cloned()
                    .collect()
            };
            for edge in apply_view(edges, &op.view, context, execution)? {
                let Element::Edge(edge) = edge else {
                    continue;
                };
                if let Some(other) = edge.adjacent_to(vertex) {
                    if seen.insert(other.clone()) {
                        adjacent.push(Item::Seed(ElementSeed::entity(other.clone())));
                    }
                }
            }
        }
        Ok(tracked_stream(&self.state, adjacent))
    }
}

/// Elements with a vertex inside any of the input ranges. Each range is a
/// pair (or two-item list) of vertices, compared by serialised bytes.
pub struct GetElementsInRangesHandler {
    state: Arc<MapState>,
}

impl GetElementsInRangesHandler {
    pub fn new(state: Arc<MapState>) -> Self {
        Self { state }
    }
}

fn range_vertex(item: Item) -> StoreResult<Value> {
    match item {
        Item::Value(vertex) => Ok(vertex),
        Item::Seed(ElementSeed::Entity { vertex }) => Ok(vertex),
        other => Err(OperationError::invalid_input(
            "GetElementsInRanges",
            format!("range bounds must be vertices, found {}", other.type_name()),
        )
        .into()),
    }
}

fn range_bounds(item: Item) -> StoreResult<(Value, Value)> {
    match item {
        Item::Pair(start, end) => Ok((range_vertex(*start)?, range_vertex(*end)?)),
        Item::List(items) => match <[Item; 2]>::try_from(items) {
            Ok([start, end]) => Ok((range_vertex(start)?, range_vertex(end)?)),
            Err(items) => Err(OperationError::invalid_input(
                "GetElementsInRanges",
                format!("a range has two bounds, found {}", items.len()),
            )
            .into()),
        },
        other => Err(OperationError::invalid_input(
            "GetElementsInRanges",
            format!("expected a pair of vertices, found {}", other.type_name()),
        )
        .into()),
    }
}

#[async_trait]
impl OperationHandler for GetElementsInRangesHandler {
    async fn handle(
        &self,
        operation: Operation,
        context: &mut Context,
        execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let op = unpack!(operation, GetElementsInRanges);
        let schema = execution.schema();
        check_view(&op.view, schema, OperationKind::GetElementsInRanges)?;
        let serialiser = schema.vertex_serialiser()?;

        let mut ranges = Vec::new();
        for item in op.input.into_items() {
            let (start, end) = range_bounds(item)?;
            ranges.push((serialiser.serialise(&start)?, serialiser.serialise(&end)?));
        }

        let matched: Vec<Element> = {
            let index = self.state.index.read().await;
            let mut slots = BTreeSet::new();
            for (start, end) in &ranges {
                slots.extend(index.slots_in_range(start, end));
            }
            slots.into_iter().filter_map(|slot| index.get(slot)).cloned().collect()
        };

        let output = apply_view(matched, &op.view, context, execution)?;
        debug!(ranges = ranges.len(), results = output.len(), "GetElementsInRanges");
        Ok(tracked_stream(&self.state, element_items(output)))
    }
}

/// Counts what `GetAllElements` with the default view would return for this
/// user
pub struct CountAllElementsHandler {
    state: Arc<MapState>,
}

impl CountAllElementsHandler {
    pub fn new(state: Arc<MapState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl OperationHandler for CountAllElementsHandler {
    async fn handle(
        &self,
        operation: Operation,
        context: &mut Context,
        execution: &Execution<'_>,
    ) -> StoreResult<Data> {
        let _op = unpack!(operation, CountAllElementsDefaultView);
        let elements: Vec<Element> = self.state.index.read().await.elements().to_vec();
        let count = apply_view(elements, &View::new(), context, execution)?.len();
        Ok(Data::Item(Item::Value(Value::Long(count as i64))))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::StoreProperties;
    use crate::element::{DirectedType, Edge, Element, ElementSeed, Entity, IncludeIncomingOutgoing, Value, ValueKind};
    use crate::function::{BinaryOperator, Function, Predicate};
    use crate::operation::{
        AddElements, CountAllElementsDefaultView, Data, GetAdjacentIds, GetAllElements, GetElements,
        GetElementsInRanges, GetVariable, Item, ItemStream, OperationChain, Reduce, View, ViewElementDefinition,
    };
    use crate::pipeline::{ElementFilter, ElementTransformer};
    use crate::schema::{GroupDefinition, Schema, TypeDefinition};
    use crate::store::context::{Context, User};
    use crate::store::engine::Store;
    use crate::store::error::StoreError;
    use crate::store::map::{MapStore, MapStoreConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn schema() -> Schema {
        Schema::builder()
            .entity(
                "person",
                GroupDefinition::new()
                    .vertex("string")
                    .property("count", "long")
                    .property("visibility", "vis"),
            )
            .edge(
                "knows",
                GroupDefinition::new()
                    .endpoints("string", "string")
                    .property("count", "long"),
            )
            .type_definition("string", TypeDefinition::new(ValueKind::String))
            .type_definition(
                "long",
                TypeDefinition::new(ValueKind::Long).aggregate_function(BinaryOperator::Sum),
            )
            .type_definition(
                "vis",
                TypeDefinition::new(ValueKind::String).aggregate_function(BinaryOperator::First),
            )
            .visibility_property("visibility")
            .build()
            .unwrap()
    }

    fn store_with(config: MapStoreConfig) -> (Store, Arc<MapStore>) {
        let backend = Arc::new(MapStore::new(config));
        let store = Store::initialise(StoreProperties::named("map"), schema(), backend.clone()).unwrap();
        (store, backend)
    }

    fn store() -> (Store, Arc<MapStore>) {
        store_with(MapStoreConfig::default())
    }

    fn person(vertex: &str, count: i64) -> Element {
        Entity::new("person", vertex).property("count", count).into()
    }

    fn knows(source: &str, destination: &str, directed: bool) -> Element {
        Edge::new("knows", source, destination, directed)
            .property("count", 1i64)
            .into()
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

    async fn add(store: &Store, input: Vec<Element>) {
        let mut context = Context::default();
        store
            .execute_operation(AddElements::new(input), &mut context)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_ingest_aggregation_merges_duplicates() {
        let (store, backend) = store();
        add(&store, vec![person("v1", 3), person("v1", 3)]).await;
        assert_eq!(backend.len().await, 1);

        let mut context = Context::default();
        let output = store
            .execute_operation(GetElements::new(vec![Item::Value("v1".into())]), &mut context)
            .await
            .unwrap();
        assert_eq!(elements(output), vec![person("v1", 6)]);
        assert_eq!(backend.open_streams(), 0);
    }

    #[tokio::test]
    async fn test_without_ingest_aggregation_duplicates_merge_at_query_time() {
        let config = MapStoreConfig {
            ingest_aggregation: false,
            ..Default::default()
        };
        let (store, backend) = store_with(config);
        add(&store, vec![person("v1", 3), person("v1", 3)]).await;
        assert_eq!(backend.len().await, 2);

        let mut context = Context::default();
        let output = store
            .execute_operation(GetAllElements::new(), &mut context)
            .await
            .unwrap();
        assert_eq!(elements(output), vec![person("v1", 6)]);
    }

    #[tokio::test]
    async fn test_seed_matching_and_direction() {
        let (store, _) = store();
        add(
            &store,
            vec![person("a", 1), knows("a", "b", true), knows("c", "a", true), knows("a", "d", false)],
        )
        .await;
        let mut context = Context::default();

        let op = GetElements::new(vec![Item::Value("a".into())]);
        assert_eq!(elements(store.execute_operation(op, &mut context).await.unwrap()).len(), 4);

        let op = GetElements::new(vec![Item::Value("a".into())])
            .include_incoming_outgoing(IncludeIncomingOutgoing::Outgoing)
            .directed_type(DirectedType::Directed);
        // Direction constrains edges only, so the entity still matches
        let output = elements(store.execute_operation(op, &mut context).await.unwrap());
        assert_eq!(output, vec![person("a", 1), knows("a", "b", true)]);

        let seed = ElementSeed::edge("b", "a", DirectedType::Either);
        let op = GetElements::new(vec![Item::Seed(seed)]);
        let output = elements(store.execute_operation(op, &mut context).await.unwrap());
        assert_eq!(output, vec![person("a", 1)]);
    }

    #[tokio::test]
    async fn test_view_filters_and_unknown_groups() {
        let (store, _) = store();
        add(&store, vec![person("a", 1), person("b", 5), knows("a", "b", true)]).await;
        let mut context = Context::default();

        let filter = ElementFilter::new().select(
            "count",
            Predicate::IsMoreThan {
                value: Value::Long(2),
                or_equal_to: false,
            },
        );
        let view = View::new().entity("person", ViewElementDefinition::new().post_aggregation_filter(filter));
        let output = store
            .execute_operation(GetAllElements::new().view(view), &mut context)
            .await
            .unwrap();
        assert_eq!(elements(output), vec![person("b", 5)]);

        let view = View::new().entity("robot", ViewElementDefinition::new());
        let err = store
            .execute_operation(GetAllElements::new().view(view), &mut context)
            .await
            .unwrap_err();
        assert!(err.root_cause().to_string().contains("robot"));
    }

    #[tokio::test]
    async fn test_visibility_uses_the_users_auths() {
        let (store, _) = store();
        let secret: Element = Entity::new("person", "s")
            .property("visibility", "secret")
            .property("count", 1i64)
            .into();
        let public: Element = Entity::new("person", "p").property("visibility", "public").into();
        add(&store, vec![secret.clone(), public.clone(), person("n", 1)]).await;

        let mut context = store.create_context(User::new("alice").data_auth("public"));
        let output = store
            .execute_operation(GetAllElements::new(), &mut context)
            .await
            .unwrap();
        assert_eq!(elements(output), vec![public, person("n", 1)]);

        let output = store
            .execute_operation(CountAllElementsDefaultView::default(), &mut context)
            .await
            .unwrap();
        assert_eq!(output.into_item(), Some(Item::Value(Value::Long(2))));

        // Dropping or rewriting the visibility property must not reveal "s"
        let definitions = [
            ViewElementDefinition::new().properties(vec!["count".into()]),
            ViewElementDefinition::new().exclude_properties(vec!["visibility".into()]),
            ViewElementDefinition::new().transformer(ElementTransformer::new().select(
                "count",
                Function::ToString,
                "visibility",
            )),
        ];
        for definition in definitions {
            let view = View::new().entity("person", definition);
            let output = store
                .execute_operation(GetAllElements::new().view(view.clone()), &mut context)
                .await
                .unwrap();
            let output = elements(output);
            assert_eq!(output.len(), 2, "unexpected output under {:?}", view);
            let hidden = Value::from("s");
            assert!(output.iter().all(|e| !e.vertices().contains(&&hidden)));

            let seeds = vec![Item::Value("s".into())];
            let output = store
                .execute_operation(GetElements::new(seeds).view(view), &mut context)
                .await
                .unwrap();
            assert!(elements(output).is_empty());
        }

        let (open, _) = store_with(MapStoreConfig {
            visibility: false,
            ..Default::default()
        });
        add(&open, vec![secret]).await;
        let output = open
            .execute_operation(GetAllElements::new(), &mut Context::default())
            .await
            .unwrap();
        assert_eq!(elements(output).len(), 1);
    }

    #[tokio::test]
    async fn test_adjacent_ids() {
        let (store, _) = store();
        add(
            &store,
            vec![knows("a", "b", true), knows("c", "a", true), knows("a", "b", false), person("a", 1)],
        )
        .await;
        let mut context = Context::default();

        let output = store
            .execute_operation(GetAdjacentIds::new(vec![Item::Value("a".into())]), &mut context)
            .await
            .unwrap();
        let ids: Vec<Item> = output.into_items().collect();
        assert_eq!(
            ids,
            vec![
                Item::Seed(ElementSeed::entity("b")),
                Item::Seed(ElementSeed::entity("c")),
            ]
        );

        let op = GetAdjacentIds::new(vec![Item::Value("a".into())])
            .include_incoming_outgoing(IncludeIncomingOutgoing::Incoming);
        let ids: Vec<Item> = store
            .execute_operation(op, &mut context)
            .await
            .unwrap()
            .into_items()
            .collect();
        // The undirected a-b edge counts in both directions
        assert_eq!(
            ids,
            vec![
                Item::Seed(ElementSeed::entity("c")),
                Item::Seed(ElementSeed::entity("b")),
            ]
        );
    }

    #[tokio::test]
    async fn test_range_scan() {
        let (store, _) = store();
        add(&store, vec![person("a", 1), person("b", 1), person("c", 1), person("d", 1)]).await;
        let mut context = Context::default();

        let ranges = vec![Item::pair(Item::Value("b".into()), Item::Value("c".into()))];
        let output = store
            .execute_operation(GetElementsInRanges::new(ranges), &mut context)
            .await
            .unwrap();
        assert_eq!(elements(output), vec![person("b", 1), person("c", 1)]);

        let err = store
            .execute_operation(GetElementsInRanges::new(vec![Item::Value("a".into())]), &mut context)
            .await
            .unwrap_err();
        assert!(matches!(err.root_cause(), StoreError::Operation(_)));
    }

    #[tokio::test]
    async fn test_skip_invalid_elements_on_add() {
        let (store, backend) = store();
        let unknown: Element = Entity::new("robot", "r").into();
        let mut context = Context::default();

        let err = store
            .execute_operation(AddElements::new(vec![person("a", 1), unknown.clone()]), &mut context)
            .await
            .unwrap_err();
        assert!(matches!(err.root_cause(), StoreError::Validation(_)));
        assert!(backend.is_empty().await);

        store
            .execute_operation(
                AddElements::new(vec![person("a", 1), unknown]).skip_invalid_elements(true),
                &mut context,
            )
            .await
            .unwrap();
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_failed_add_writes_nothing() {
        let (store, backend) = store();
        add(&store, vec![person("a", 1)]).await;
        let mut context = Context::default();

        // The numeric vertex cannot be encoded by the string vertex serialiser
        let bad: Element = Entity::new("person", 5i64).into();
        let op = AddElements::new(vec![person("a", 2), person("b", 1), knows("b", "c", true), bad]).validate(false);
        assert!(store.execute_operation(op, &mut context).await.is_err());
        assert_eq!(backend.len().await, 1);

        let output = store
            .execute_operation(GetAllElements::new(), &mut context)
            .await
            .unwrap();
        assert_eq!(elements(output), vec![person("a", 1)]);

        let seeds = vec![Item::Value("b".into()), Item::Value("c".into())];
        let output = store
            .execute_operation(GetElements::new(seeds), &mut context)
            .await
            .unwrap();
        assert!(elements(output).is_empty());
    }

    #[tokio::test]
    async fn test_streams_are_released_when_the_chain_fails() {
        let (store, backend) = store();
        add(&store, vec![person("a", 1), person("b", 2)]).await;
        let mut context = Context::default();

        // Reduce fails on the first element, abandoning the partly read stream
        let chain = OperationChain::new()
            .then(GetAllElements::new())
            .then(Reduce::new(BinaryOperator::Sum));
        assert!(store.execute(chain, &mut context).await.is_err());
        assert_eq!(backend.open_streams(), 0);

        // A stream held by an operation that never runs is released too
        let closed = Arc::new(AtomicUsize::new(0));
        let hook = Arc::clone(&closed);
        let held = Data::stream(
            ItemStream::new(vec![Item::Value(Value::Long(1))].into_iter()).on_close(move || {
                hook.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let chain = OperationChain::new()
            .then(GetVariable::new("missing"))
            .then(Reduce::new(BinaryOperator::Sum).input(held));
        assert!(store.execute(chain, &mut context).await.is_err());
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reinitialise_clears_elements() {
        let (store, backend) = store();
        add(&store, vec![person("a", 1)]).await;
        store.reinitialise(schema()).await.unwrap();
        assert!(backend.is_empty().await);
    }
}

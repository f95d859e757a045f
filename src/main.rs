//! Trellis demo
//!
//! Builds a small social graph in an in-memory store and runs a few chains
//! against it.

use trellis::element::{Edge, Element, Entity, Value, ValueKind};
use trellis::function::BinaryOperator;
use trellis::operation::wire::data_to_json;
use trellis::operation::{AddElements, Count, GetAdjacentIds, GetAllElements, GetElements, Item, OperationChain};
use trellis::schema::{GroupDefinition, Schema, TypeDefinition};
use trellis::store::{MapStore, Store, User};
use trellis::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_default();
    if let Err(e) = trellis::telemetry::init(&config.logging) {
        eprintln!("Logging already initialised: {}", e);
    }

    tracing::info!("Trellis v{}", env!("CARGO_PKG_VERSION"));

    let store = MapStore::create(config.store.clone(), demo_schema()?)?;
    tracing::info!("Store '{}' supports {} operations", store.name(), store.supported_operations().await.len());

    demo_write(&store).await?;
    demo_query(&store).await?;

    tracing::info!("Trellis demo complete");
    Ok(())
}

fn demo_schema() -> Result<Schema, Box<dyn std::error::Error>> {
    let schema = Schema::builder()
        .entity("person", GroupDefinition::new().vertex("string").property("visits", "long"))
        .edge(
            "knows",
            GroupDefinition::new()
                .endpoints("string", "string")
                .property("weight", "long"),
        )
        .type_definition("string", TypeDefinition::new(ValueKind::String))
        .type_definition(
            "long",
            TypeDefinition::new(ValueKind::Long).aggregate_function(BinaryOperator::Sum),
        )
        .build()?;
    Ok(schema)
}

async fn demo_write(store: &Store) -> Result<(), Box<dyn std::error::Error>> {
    let mut context = store.create_context(User::new("demo"));

    let elements: Vec<Element> = vec![
        Entity::new("person", "alice").property("visits", 2i64).into(),
        Entity::new("person", "alice").property("visits", 3i64).into(),
        Entity::new("person", "bob").property("visits", 1i64).into(),
        Edge::new("knows", "alice", "bob", true).property("weight", 1i64).into(),
        Edge::new("knows", "alice", "bob", true).property("weight", 4i64).into(),
        Edge::new("knows", "bob", "carol", true).property("weight", 2i64).into(),
    ];
    store.execute_operation(AddElements::new(elements), &mut context).await?;

    tracing::info!("Wrote 6 elements");
    Ok(())
}

async fn demo_query(store: &Store) -> Result<(), Box<dyn std::error::Error>> {
    let mut context = store.create_context(User::new("demo"));

    let alice = store
        .execute_operation(GetElements::new(vec![Item::Value(Value::from("alice"))]), &mut context)
        .await?;
    tracing::info!("Elements around alice: {}", data_to_json(alice));

    let neighbours = store
        .execute_operation(GetAdjacentIds::new(vec![Item::Value(Value::from("alice"))]), &mut context)
        .await?;
    tracing::info!("Adjacent to alice: {}", data_to_json(neighbours));

    let count = store
        .execute(
            OperationChain::new().then(GetAllElements::new()).then(Count::chained()),
            &mut context,
        )
        .await?;
    tracing::info!("Distinct elements after aggregation: {}", data_to_json(count));

    Ok(())
}

//! Map Store
//!
//! An in-memory backend. Elements are held in a [`MapIndex`] behind an async
//! `RwLock`; reads clone what they match and release the lock before
//! streaming results.
//!
//! # Traits
//!
//! Declares every store trait. `ingest_aggregation` and `visibility` can be
//! switched off in `[store.map]`, which drops `INGEST_AGGREGATION` and
//! `VISIBILITY` respectively.
//!
//! # Example
//! ```ignore
//! let store = MapStore::create(StoreProperties::named("graph"), schema)?;
//! let mut context = store.create_context(User::new("alice"));
//! store.execute_operation(AddElements::new(elements), &mut context).await?;
//! ```

mod handlers;
mod index;

pub use index::MapIndex;

use crate::config::StoreProperties;
use crate::operation::OperationKind;
use crate::schema::Schema;
use crate::store::engine::{Store, StoreBackend};
use crate::store::error::{StoreError, StoreResult};
use crate::store::handler::OperationHandler;
use crate::store::handlers::entry;
use crate::store::traits::{StoreTrait, TraitSet};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// `[store.map]` settings
#[derive(Debug, Clone, Deserialize)]
pub struct MapStoreConfig {
    /// Merge duplicate elements as they are added
    #[serde(default = "default_true")]
    pub ingest_aggregation: bool,

    /// Hide elements the user's authorisations do not satisfy
    #[serde(default = "default_true")]
    pub visibility: bool,
}

fn default_true() -> bool {
    true
}

impl Default for MapStoreConfig {
    fn default() -> Self {
        Self {
            ingest_aggregation: true,
            visibility: true,
        }
    }
}

/// Shared between the backend and its handlers
#[derive(Debug, Default)]
pub(crate) struct MapState {
    pub(crate) index: RwLock<MapIndex>,
    /// Result streams handed out and not yet released
    pub(crate) open_streams: Arc<AtomicUsize>,
}

#[derive(Debug)]
pub struct MapStore {
    config: MapStoreConfig,
    state: Arc<MapState>,
}

impl MapStore {
    pub fn new(config: MapStoreConfig) -> Self {
        Self {
            config,
            state: Arc::new(MapState::default()),
        }
    }

    /// Initialise a store over a fresh map backend
    pub fn create(properties: StoreProperties, schema: Schema) -> StoreResult<Store> {
        let backend = Arc::new(MapStore::new(properties.map.clone()));
        Store::initialise(properties, schema, backend)
    }

    /// Number of stored elements
    pub async fn len(&self) -> usize {
        self.state.index.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.index.read().await.is_empty()
    }

    /// Result streams not yet exhausted, closed or dropped
    pub fn open_streams(&self) -> usize {
        self.state.open_streams.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreBackend for MapStore {
    fn backend_type(&self) -> &'static str {
        "map"
    }

    fn traits(&self) -> TraitSet {
        StoreTrait::ALL
            .into_iter()
            .filter(|t| match t {
                StoreTrait::IngestAggregation => self.config.ingest_aggregation,
                StoreTrait::Visibility => self.config.visibility,
                _ => true,
            })
            .collect()
    }

    /// Vertex bytes key the index, so equal vertices must serialise equally
    fn pre_initialise(&self, schema: &Schema) -> StoreResult<()> {
        let serialiser = schema
            .vertex_serialiser()
            .map_err(|e| StoreError::Initialisation(format!("cannot build the vertex serialiser: {e}")))?;
        if !serialiser.is_consistent() {
            return Err(StoreError::Initialisation(format!(
                "the map store requires a consistent vertex serialiser, {} is not",
                serialiser.name()
            )));
        }
        Ok(())
    }

    fn handlers(&self, _schema: &Arc<Schema>) -> Vec<(OperationKind, Arc<dyn OperationHandler>)> {
        let state = &self.state;
        let ingest_aggregation = self.config.ingest_aggregation;
        vec![
            entry(
                OperationKind::AddElements,
                handlers::AddElementsHandler::new(Arc::clone(state), ingest_aggregation),
            ),
            entry(OperationKind::GetElements, handlers::GetElementsHandler::new(Arc::clone(state))),
            entry(OperationKind::GetAllElements, handlers::GetAllElementsHandler::new(Arc::clone(state))),
            entry(OperationKind::GetAdjacentIds, handlers::GetAdjacentIdsHandler::new(Arc::clone(state))),
            entry(
                OperationKind::GetElementsInRanges,
                handlers::GetElementsInRangesHandler::new(Arc::clone(state)),
            ),
            entry(
                OperationKind::CountAllElementsDefaultView,
                handlers::CountAllElementsHandler::new(Arc::clone(state)),
            ),
        ]
    }

    async fn reset(&self) {
        self.state.index.write().await.clear();
        tracing::info!("Map store cleared");
    }
}

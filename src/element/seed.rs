//! Element seeds
//!
//! A seed names a vertex or an edge without carrying properties. Query
//! handlers match seeds against stored elements.

use crate::element::model::{Element, Entity};
use crate::element::value::Value;
use serde::{Deserialize, Serialize};

/// Which edge directions an edge seed accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectedType {
    #[default]
    Either,
    Directed,
    Undirected,
}

impl DirectedType {
    pub fn accepts(&self, directed: bool) -> bool {
        match self {
            DirectedType::Either => true,
            DirectedType::Directed => directed,
            DirectedType::Undirected => !directed,
        }
    }
}

/// Edge direction relative to an entity seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncludeIncomingOutgoing {
    #[default]
    Either,
    Incoming,
    Outgoing,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementSeed {
    Entity {
        vertex: Value,
    },
    Edge {
        source: Value,
        destination: Value,
        directed: DirectedType,
    },
}

impl ElementSeed {
    pub fn entity(vertex: impl Into<Value>) -> Self {
        ElementSeed::Entity {
            vertex: vertex.into(),
        }
    }

    pub fn edge(source: impl Into<Value>, destination: impl Into<Value>, directed: DirectedType) -> Self {
        ElementSeed::Edge {
            source: source.into(),
            destination: destination.into(),
            directed,
        }
    }

    /// Seed identifying the given element
    pub fn of(element: &Element) -> Self {
        match element {
            Element::Entity(Entity { vertex, .. }) => ElementSeed::entity(vertex.clone()),
            Element::Edge(e) => ElementSeed::Edge {
                source: e.source.clone(),
                destination: e.destination.clone(),
                directed: if e.directed {
                    DirectedType::Directed
                } else {
                    DirectedType::Undirected
                },
            },
        }
    }

    /// Vertices used to look the seed up in a vertex index
    pub fn vertices(&self) -> Vec<&Value> {
        match self {
            ElementSeed::Entity { vertex } => vec![vertex],
            ElementSeed::Edge {
                source,
                destination,
                ..
            } => vec![source, destination],
        }
    }

    /// Whether `element` is related to this seed.
    ///
    /// Entity seeds match the entity at the vertex and edges touching it in
    /// the requested direction. Edge seeds match the edge itself and the
    /// entities at either endpoint.
    pub fn matches(&self, element: &Element, direction: IncludeIncomingOutgoing) -> bool {
        match (self, element) {
            (ElementSeed::Entity { vertex }, Element::Entity(e)) => &e.vertex == vertex,
            (ElementSeed::Entity { vertex }, Element::Edge(e)) => {
                if !e.directed {
                    return &e.source == vertex || &e.destination == vertex;
                }
                match direction {
                    IncludeIncomingOutgoing::Either => {
                        &e.source == vertex || &e.destination == vertex
                    }
                    IncludeIncomingOutgoing::Outgoing => &e.source == vertex,
                    IncludeIncomingOutgoing::Incoming => &e.destination == vertex,
                }
            }
            (
                ElementSeed::Edge {
                    source,
                    destination,
                    ..
                },
                Element::Entity(e),
            ) => &e.vertex == source || &e.vertex == destination,
            (
                ElementSeed::Edge {
                    source,
                    destination,
                    directed,
                },
                Element::Edge(e),
            ) => {
                if !directed.accepts(e.directed) {
                    return false;
                }
                let forward = &e.source == source && &e.destination == destination;
                let reverse = &e.source == destination && &e.destination == source;
                if e.directed {
                    forward
                } else {
                    forward || reverse
                }
            }
        }
    }
}

//! Entities and edges
//!
//! Identity rules:
//! - an entity is identified by its group and vertex
//! - a directed edge by group, source and destination (in that order)
//! - an undirected edge by group and the unordered pair of its endpoints
//!
//! "Core" equality compares identity only. `PartialEq` additionally compares
//! properties. Hashing only covers identity, so it agrees with both.

use crate::element::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Property container. Ordering of entries is irrelevant to equality.
pub type Properties = BTreeMap<String, Value>;

/// Pseudo-properties exposing element identity to filters and transforms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierType {
    Group,
    Vertex,
    Source,
    Destination,
    Directed,
}

impl IdentifierType {
    /// Reserved selection names, e.g. `"VERTEX"` in a filter selection
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "GROUP" => Some(IdentifierType::Group),
            "VERTEX" => Some(IdentifierType::Vertex),
            "SOURCE" => Some(IdentifierType::Source),
            "DESTINATION" => Some(IdentifierType::Destination),
            "DIRECTED" => Some(IdentifierType::Directed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub group: String,
    pub vertex: Value,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub group: String,
    pub source: Value,
    pub destination: Value,
    pub directed: bool,
    #[serde(default)]
    pub properties: Properties,
}

impl Entity {
    pub fn new(group: impl Into<String>, vertex: impl Into<Value>) -> Self {
        Self {
            group: group.into(),
            vertex: vertex.into(),
            properties: Properties::new(),
        }
    }

    /// Builder method: set a property
    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

impl Edge {
    pub fn new(
        group: impl Into<String>,
        source: impl Into<Value>,
        destination: impl Into<Value>,
        directed: bool,
    ) -> Self {
        Self {
            group: group.into(),
            source: source.into(),
            destination: destination.into(),
            directed,
            properties: Properties::new(),
        }
    }

    /// Builder method: set a property
    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Endpoints in identity order: as given when directed, sorted otherwise
    pub fn normalised_endpoints(&self) -> (&Value, &Value) {
        if !self.directed && self.destination < self.source {
            (&self.destination, &self.source)
        } else {
            (&self.source, &self.destination)
        }
    }

    /// The endpoint opposite `vertex`, if `vertex` is one of the endpoints
    pub fn adjacent_to(&self, vertex: &Value) -> Option<&Value> {
        if &self.source == vertex {
            Some(&self.destination)
        } else if &self.destination == vertex {
            Some(&self.source)
        } else {
            None
        }
    }
}

/// A graph element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Element {
    Entity(Entity),
    Edge(Edge),
}

/// Normalised identity of an element, usable as a map key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKey {
    Entity {
        group: String,
        vertex: Value,
    },
    Edge {
        group: String,
        source: Value,
        destination: Value,
        directed: bool,
    },
}

impl Element {
    pub fn group(&self) -> &str {
        match self {
            Element::Entity(e) => &e.group,
            Element::Edge(e) => &e.group,
        }
    }

    pub fn is_edge(&self) -> bool {
        matches!(self, Element::Edge(_))
    }

    pub fn properties(&self) -> &Properties {
        match self {
            Element::Entity(e) => &e.properties,
            Element::Edge(e) => &e.properties,
        }
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        match self {
            Element::Entity(e) => &mut e.properties,
            Element::Edge(e) => &mut e.properties,
        }
    }

    /// Property lookup; a missing name is simply absent
    pub fn get_property(&self, name: &str) -> Option<&Value> {
        self.properties().get(name)
    }

    pub fn put_property(&mut self, name: impl Into<String>, value: Value) {
        self.properties_mut().insert(name.into(), value);
    }

    pub fn remove_property(&mut self, name: &str) -> Option<Value> {
        self.properties_mut().remove(name)
    }

    /// Copy of the identity fields with no properties
    pub fn empty_clone(&self) -> Element {
        match self {
            Element::Entity(e) => Element::Entity(Entity {
                group: e.group.clone(),
                vertex: e.vertex.clone(),
                properties: Properties::new(),
            }),
            Element::Edge(e) => Element::Edge(Edge {
                group: e.group.clone(),
                source: e.source.clone(),
                destination: e.destination.clone(),
                directed: e.directed,
                properties: Properties::new(),
            }),
        }
    }

    pub fn key(&self) -> ElementKey {
        match self {
            Element::Entity(e) => ElementKey::Entity {
                group: e.group.clone(),
                vertex: e.vertex.clone(),
            },
            Element::Edge(e) => {
                let (source, destination) = e.normalised_endpoints();
                ElementKey::Edge {
                    group: e.group.clone(),
                    source: source.clone(),
                    destination: destination.clone(),
                    directed: e.directed,
                }
            }
        }
    }

    /// Identity-only equality
    pub fn core_equals(&self, other: &Element) -> bool {
        match (self, other) {
            (Element::Entity(a), Element::Entity(b)) => a.group == b.group && a.vertex == b.vertex,
            (Element::Edge(a), Element::Edge(b)) => {
                a.group == b.group
                    && a.directed == b.directed
                    && a.normalised_endpoints() == b.normalised_endpoints()
            }
            _ => false,
        }
    }

    /// Resolve a property name or reserved identifier name
    pub fn selected(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.get_property(name) {
            return Some(value.clone());
        }
        match (IdentifierType::from_name(name)?, self) {
            (IdentifierType::Group, _) => Some(Value::String(self.group().to_string())),
            (IdentifierType::Vertex, Element::Entity(e)) => Some(e.vertex.clone()),
            (IdentifierType::Source, Element::Edge(e)) => Some(e.source.clone()),
            (IdentifierType::Destination, Element::Edge(e)) => Some(e.destination.clone()),
            (IdentifierType::Directed, Element::Edge(e)) => Some(Value::Boolean(e.directed)),
            _ => None,
        }
    }

    /// Vertices this element is indexed under
    pub fn vertices(&self) -> Vec<&Value> {
        match self {
            Element::Entity(e) => vec![&e.vertex],
            Element::Edge(e) if e.source == e.destination => vec![&e.source],
            Element::Edge(e) => vec![&e.source, &e.destination],
        }
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.core_equals(other) && self.properties() == other.properties()
    }
}

impl Eq for Element {}

impl Hash for Element {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl From<Entity> for Element {
    fn from(e: Entity) -> Self {
        Element::Entity(e)
    }
}

impl From<Edge> for Element {
    fn from(e: Edge) -> Self {
        Element::Edge(e)
    }
}

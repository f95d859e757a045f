//! Group and type definitions

use crate::element::ValueKind;
use crate::function::{BinaryOperator, Predicate};
use crate::serialisation::SerialiserConfig;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Declared type of a property or identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDefinition {
    #[serde(rename = "class")]
    pub kind: ValueKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialiser: Option<SerialiserConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_function: Option<BinaryOperator>,

    /// Checks applied when elements are validated
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validate_functions: Vec<Predicate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TypeDefinition {
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            serialiser: None,
            aggregate_function: None,
            validate_functions: Vec::new(),
            description: None,
        }
    }

    /// Builder method: set the aggregate function
    pub fn aggregate_function(mut self, op: BinaryOperator) -> Self {
        self.aggregate_function = Some(op);
        self
    }

    /// Builder method: set the serialiser
    pub fn serialiser(mut self, serialiser: SerialiserConfig) -> Self {
        self.serialiser = Some(serialiser);
        self
    }

    /// Builder method: add a validation predicate
    pub fn validator(mut self, predicate: Predicate) -> Self {
        self.validate_functions.push(predicate);
        self
    }

    /// Configured serialiser, or the default for the kind
    pub fn serialiser_config(&self) -> SerialiserConfig {
        self.serialiser
            .clone()
            .unwrap_or_else(|| SerialiserConfig::default_for(self.kind))
    }
}

/// Definition of one entity or edge group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDefinition {
    /// Entity vertex type name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertex: Option<String>,

    /// Edge source type name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Edge destination type name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// `(property, type)` pairs in declaration order
    #[serde(default, with = "ordered_properties")]
    pub properties: Vec<(String, String)>,

    /// Properties that form part of the merge key
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,

    /// Whether ingest and query aggregation apply to the group
    #[serde(default = "default_true")]
    pub aggregate: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for GroupDefinition {
    fn default() -> Self {
        Self {
            vertex: None,
            source: None,
            destination: None,
            properties: Vec::new(),
            group_by: Vec::new(),
            aggregate: true,
            description: None,
        }
    }
}

impl GroupDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: entity vertex type
    pub fn vertex(mut self, type_name: impl Into<String>) -> Self {
        self.vertex = Some(type_name.into());
        self
    }

    /// Builder method: edge source and destination types
    pub fn endpoints(mut self, source: impl Into<String>, destination: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self.destination = Some(destination.into());
        self
    }

    /// Builder method: declare a property, replacing any previous type
    pub fn property(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        let name = name.into();
        let type_name = type_name.into();
        match self.properties.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = type_name,
            None => self.properties.push((name, type_name)),
        }
        self
    }

    /// Builder method: add a groupBy property
    pub fn group_by(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.group_by.contains(&name) {
            self.group_by.push(name);
        }
        self
    }

    /// Builder method: enable or disable aggregation
    pub fn aggregate(mut self, aggregate: bool) -> Self {
        self.aggregate = aggregate;
        self
    }

    pub fn property_type(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.as_str())
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.property_type(name).is_some()
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|(n, _)| n.as_str())
    }

    /// `(role, type name)` for each declared identifier
    pub fn identifier_types(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("vertex", self.vertex.as_deref()),
            ("source", self.source.as_deref()),
            ("destination", self.destination.as_deref()),
        ]
        .into_iter()
        .filter_map(|(role, t)| t.map(|t| (role, t)))
    }
}

/// Serde adapter keeping property declaration order from JSON objects
mod ordered_properties {
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(props: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(props.len()))?;
        for (name, type_name) in props {
            map.serialize_entry(name, type_name)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<(String, String)>, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = Vec<(String, String)>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of property name to type name")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut props = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, type_name)) = access.next_entry::<String, String>()? {
                    props.push((name, type_name));
                }
                Ok(props)
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_order_is_kept() {
        let json = r#"{"vertex":"vertex","properties":{"zeta":"long","alpha":"string"}}"#;
        let def: GroupDefinition = serde_json::from_str(json).unwrap();
        let names: Vec<&str> = def.property_names().collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert!(def.aggregate);
    }

    #[test]
    fn test_builder_replaces_property_type() {
        let def = GroupDefinition::new()
            .property("count", "int")
            .property("count", "long")
            .group_by("day")
            .group_by("day");
        assert_eq!(def.property_type("count"), Some("long"));
        assert_eq!(def.group_by, vec!["day".to_string()]);
    }
}

//! The Schema
//!
//! A schema is built once (from a builder or a JSON document), validated,
//! and read-only afterwards. Stores share it behind an `Arc`.

use crate::element::{Element, Value};
use crate::function::BinaryOperator;
use crate::schema::definition::{GroupDefinition, TypeDefinition};
use crate::schema::error::{SchemaError, SchemaResult};
use crate::serialisation::{SerialisationResult, Serialiser, SerialiserConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(default)]
    entities: BTreeMap<String, GroupDefinition>,

    #[serde(default)]
    edges: BTreeMap<String, GroupDefinition>,

    #[serde(default)]
    types: BTreeMap<String, TypeDefinition>,

    /// Used for every vertex, source and destination value
    #[serde(default)]
    vertex_serialiser: SerialiserConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp_property: Option<String>,

    /// Property holding each element's visibility expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    visibility_property: Option<String>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Parse and validate a JSON schema document
    pub fn from_json(json: &str) -> SchemaResult<Self> {
        let schema: Schema = serde_json::from_str(json)?;
        schema.validated()
    }

    /// Load and validate a JSON schema file
    pub fn from_path(path: &Path) -> SchemaResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SchemaError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> SchemaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Return the schema if it has no violations, otherwise all of them
    pub fn validated(self) -> SchemaResult<Self> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(SchemaError::Invalid { errors })
        }
    }

    pub fn get_element(&self, group: &str) -> Option<&GroupDefinition> {
        self.entities.get(group).or_else(|| self.edges.get(group))
    }

    pub fn get_entity(&self, group: &str) -> Option<&GroupDefinition> {
        self.entities.get(group)
    }

    pub fn get_edge(&self, group: &str) -> Option<&GroupDefinition> {
        self.edges.get(group)
    }

    /// Definition for the element's group in the matching namespace
    pub fn definition_for(&self, element: &Element) -> Option<&GroupDefinition> {
        if element.is_edge() {
            self.get_edge(element.group())
        } else {
            self.get_entity(element.group())
        }
    }

    pub fn entities(&self) -> &BTreeMap<String, GroupDefinition> {
        &self.entities
    }

    pub fn edges(&self) -> &BTreeMap<String, GroupDefinition> {
        &self.edges
    }

    pub fn types(&self) -> &BTreeMap<String, TypeDefinition> {
        &self.types
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().chain(self.edges.keys()).map(String::as_str)
    }

    pub fn get_type(&self, type_name: &str) -> Option<&TypeDefinition> {
        self.types.get(type_name)
    }

    pub fn property_type(&self, group: &str, property: &str) -> Option<&TypeDefinition> {
        let type_name = self.get_element(group)?.property_type(property)?;
        self.types.get(type_name)
    }

    pub fn aggregate_function(&self, group: &str, property: &str) -> Option<&BinaryOperator> {
        self.property_type(group, property)?.aggregate_function.as_ref()
    }

    pub fn timestamp_property(&self) -> Option<&str> {
        self.timestamp_property.as_deref()
    }

    pub fn visibility_property(&self) -> Option<&str> {
        self.visibility_property.as_deref()
    }

    pub fn vertex_serialiser_config(&self) -> &SerialiserConfig {
        &self.vertex_serialiser
    }

    pub fn vertex_serialiser(&self) -> SerialisationResult<Arc<dyn Serialiser>> {
        self.vertex_serialiser.build()
    }

    /// Equal vertices always encode to equal bytes
    pub fn is_consistent_vertex_serialiser(&self) -> bool {
        self.vertex_serialiser()
            .map(|s| s.is_consistent())
            .unwrap_or(false)
    }

    /// Check an element against its group definition and type validators
    pub fn validate_element(&self, element: &Element) -> SchemaResult<()> {
        let group = element.group();
        let invalid = |reason: String| SchemaError::InvalidElement {
            group: group.to_string(),
            reason,
        };

        let definition = self.definition_for(element).ok_or_else(|| {
            invalid(format!(
                "no {} group with this name is declared",
                if element.is_edge() { "edge" } else { "entity" }
            ))
        })?;

        let identifiers: Vec<(&str, &Value)> = match element {
            Element::Entity(e) => vec![("vertex", &e.vertex)],
            Element::Edge(e) => vec![("source", &e.source), ("destination", &e.destination)],
        };
        for (role, value) in identifiers {
            let declared = definition
                .identifier_types()
                .find(|(r, _)| *r == role)
                .and_then(|(_, t)| self.types.get(t));
            if let Some(type_def) = declared {
                self.check_value(role, value, type_def).map_err(invalid)?;
            }
        }

        for (name, value) in element.properties() {
            let type_def = definition
                .property_type(name)
                .and_then(|t| self.types.get(t))
                .ok_or_else(|| invalid(format!("property '{}' is not declared", name)))?;
            self.check_value(name, value, type_def).map_err(invalid)?;
        }

        Ok(())
    }

    fn check_value(&self, name: &str, value: &Value, type_def: &TypeDefinition) -> Result<(), String> {
        if value.kind() != type_def.kind {
            return Err(format!(
                "'{}' expects {}, got {}",
                name,
                type_def.kind,
                value.type_name()
            ));
        }
        for predicate in &type_def.validate_functions {
            match predicate.test(Some(value)) {
                Ok(true) => {}
                Ok(false) => {
                    return Err(format!("'{}' failed validation by {}", name, predicate.name()));
                }
                Err(e) => return Err(format!("'{}' could not be validated: {}", name, e)),
            }
        }
        Ok(())
    }
}

/// Assembles a schema and validates it on `build`
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn entity(mut self, group: impl Into<String>, definition: GroupDefinition) -> Self {
        self.schema.entities.insert(group.into(), definition);
        self
    }

    pub fn edge(mut self, group: impl Into<String>, definition: GroupDefinition) -> Self {
        self.schema.edges.insert(group.into(), definition);
        self
    }

    pub fn type_definition(mut self, name: impl Into<String>, definition: TypeDefinition) -> Self {
        self.schema.types.insert(name.into(), definition);
        self
    }

    pub fn vertex_serialiser(mut self, serialiser: SerialiserConfig) -> Self {
        self.schema.vertex_serialiser = serialiser;
        self
    }

    pub fn timestamp_property(mut self, property: impl Into<String>) -> Self {
        self.schema.timestamp_property = Some(property.into());
        self
    }

    pub fn visibility_property(mut self, property: impl Into<String>) -> Self {
        self.schema.visibility_property = Some(property.into());
        self
    }

    /// Build without validating, for callers that report violations themselves
    pub fn build_unchecked(self) -> Schema {
        self.schema
    }

    pub fn build(self) -> SchemaResult<Schema> {
        self.schema.validated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Edge, Entity, ValueKind};
    use crate::function::Predicate;

    fn schema() -> Schema {
        Schema::builder()
            .entity(
                "person",
                GroupDefinition::new().vertex("vertex").property("age", "long"),
            )
            .edge(
                "knows",
                GroupDefinition::new()
                    .endpoints("vertex", "vertex")
                    .property("weight", "long"),
            )
            .type_definition("vertex", TypeDefinition::new(ValueKind::String))
            .type_definition(
                "long",
                TypeDefinition::new(ValueKind::Long)
                    .aggregate_function(BinaryOperator::Sum)
                    .validator(Predicate::IsMoreThan {
                        value: Value::Long(0),
                        or_equal_to: true,
                    }),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_lookups() {
        let schema = schema();
        assert!(schema.get_element("person").is_some());
        assert!(schema.get_element("unknown").is_none());
        assert_eq!(
            schema.aggregate_function("knows", "weight"),
            Some(&BinaryOperator::Sum)
        );
        assert!(schema.is_consistent_vertex_serialiser());
    }

    #[test]
    fn test_validate_element() {
        let schema = schema();
        let ok: Element = Entity::new("person", "alice").property("age", 30i64).into();
        assert!(schema.validate_element(&ok).is_ok());

        let negative: Element = Entity::new("person", "alice").property("age", -1i64).into();
        assert!(schema.validate_element(&negative).is_err());

        let wrong_kind: Element = Entity::new("person", 7i64).into();
        assert!(schema.validate_element(&wrong_kind).is_err());

        let wrong_namespace: Element = Edge::new("person", "a", "b", true).into();
        assert!(schema.validate_element(&wrong_namespace).is_err());

        let undeclared: Element = Edge::new("knows", "a", "b", true).property("colour", "red").into();
        assert!(schema.validate_element(&undeclared).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let schema = schema();
        let json = schema.to_json().unwrap();
        let parsed = Schema::from_json(&json).unwrap();
        assert_eq!(parsed, schema);
    }
}

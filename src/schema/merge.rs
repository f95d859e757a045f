//! Schema merging
//!
//! Two schemas merge when nothing they both declare disagrees. Conflicts are
//! collected across the whole pair and reported together.

use crate::schema::definition::GroupDefinition;
use crate::schema::error::{SchemaError, SchemaResult};
use crate::schema::model::Schema;
use std::collections::BTreeMap;
use std::fmt::Debug;

impl Schema {
    /// Combine two schemas, failing with every conflict found
    pub fn merge(&self, other: &Schema) -> SchemaResult<Schema> {
        let mut conflicts = Vec::new();

        for (name, ours) in self.types() {
            if let Some(theirs) = other.get_type(name) {
                if ours != theirs {
                    conflicts.push(format!("type '{}' is defined differently", name));
                }
            }
        }

        merge_groups("entity", self.entities(), other.entities(), &mut conflicts);
        merge_groups("edge", self.edges(), other.edges(), &mut conflicts);

        for group in self.entities().keys() {
            if other.edges().contains_key(group) {
                conflicts.push(format!("group '{}' is an entity in one schema and an edge in the other", group));
            }
        }
        for group in self.edges().keys() {
            if other.entities().contains_key(group) {
                conflicts.push(format!("group '{}' is an edge in one schema and an entity in the other", group));
            }
        }

        if self.vertex_serialiser_config() != other.vertex_serialiser_config() {
            conflicts.push("vertex serialisers differ".to_string());
        }
        check_setting("timestamp property", self.timestamp_property(), other.timestamp_property(), &mut conflicts);
        check_setting("visibility property", self.visibility_property(), other.visibility_property(), &mut conflicts);

        if !conflicts.is_empty() {
            return Err(SchemaError::MergeConflicts(conflicts));
        }

        let mut builder = Schema::builder().vertex_serialiser(self.vertex_serialiser_config().clone());
        if let Some(property) = self.timestamp_property().or(other.timestamp_property()) {
            builder = builder.timestamp_property(property);
        }
        if let Some(property) = self.visibility_property().or(other.visibility_property()) {
            builder = builder.visibility_property(property);
        }
        for (name, definition) in other.types().iter().chain(self.types()) {
            builder = builder.type_definition(name.clone(), definition.clone());
        }
        for (group, definition) in union(self.entities(), other.entities()) {
            builder = builder.entity(group, definition);
        }
        for (group, definition) in union(self.edges(), other.edges()) {
            builder = builder.edge(group, definition);
        }

        builder.build()
    }
}

fn merge_groups(
    namespace: &str,
    ours: &BTreeMap<String, GroupDefinition>,
    theirs: &BTreeMap<String, GroupDefinition>,
    conflicts: &mut Vec<String>,
) {
    for (group, a) in ours {
        let Some(b) = theirs.get(group) else {
            continue;
        };
        let label = format!("{} group '{}'", namespace, group);

        for (role, type_name) in a.identifier_types() {
            if let Some((_, other_type)) = b.identifier_types().find(|(r, _)| *r == role) {
                if other_type != type_name {
                    conflicts.push(format!(
                        "{} {} type differs ('{}' vs '{}')",
                        label, role, type_name, other_type
                    ));
                }
            }
        }

        for (property, type_name) in &a.properties {
            if let Some(other_type) = b.property_type(property) {
                if other_type != type_name {
                    conflicts.push(format!(
                        "{} property '{}' type differs ('{}' vs '{}')",
                        label, property, type_name, other_type
                    ));
                }
            }
        }

        if !a.group_by.is_empty() && !b.group_by.is_empty() && a.group_by != b.group_by {
            conflicts.push(format!("{} groupBy differs", label));
        }
        if a.aggregate != b.aggregate {
            conflicts.push(format!("{} aggregate flag differs", label));
        }
    }
}

fn check_setting<T: PartialEq + Debug>(name: &str, a: Option<T>, b: Option<T>, conflicts: &mut Vec<String>) {
    if let (Some(a), Some(b)) = (&a, &b) {
        if a != b {
            conflicts.push(format!("{} differs ({:?} vs {:?})", name, a, b));
        }
    }
}

/// Groups from both sides; shared groups get the union of their properties
fn union(
    ours: &BTreeMap<String, GroupDefinition>,
    theirs: &BTreeMap<String, GroupDefinition>,
) -> Vec<(String, GroupDefinition)> {
    let mut merged: BTreeMap<String, GroupDefinition> = ours.clone();
    for (group, b) in theirs {
        match merged.get_mut(group) {
            Some(a) => {
                a.vertex = a.vertex.take().or_else(|| b.vertex.clone());
                a.source = a.source.take().or_else(|| b.source.clone());
                a.destination = a.destination.take().or_else(|| b.destination.clone());
                for (property, type_name) in &b.properties {
                    if !a.has_property(property) {
                        a.properties.push((property.clone(), type_name.clone()));
                    }
                }
                if a.group_by.is_empty() {
                    a.group_by = b.group_by.clone();
                }
                if a.description.is_none() {
                    a.description = b.description.clone();
                }
            }
            None => {
                merged.insert(group.clone(), b.clone());
            }
        }
    }
    merged.into_iter().collect()
}

//! Schema validation
//!
//! Rules, all checked on every call:
//! 1. every property and identifier references a declared type
//! 2. the timestamp property, where declared, aggregates with Max
//! 3. groupBy entries are declared properties of their group
//! 4. aggregated groups have an aggregate function for every non-groupBy property
//! 5. group names are non-empty and unique across entities and edges
//! 6. type serialisers, and the vertex serialiser, handle the declared kinds

use crate::schema::definition::GroupDefinition;
use crate::schema::error::ValidationError;
use crate::schema::model::Schema;

impl Schema {
    /// Every rule violation in the schema; empty when valid
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (group, definition) in self.entities().iter().chain(self.edges().iter()) {
            if group.is_empty() {
                errors.push(ValidationError::EmptyGroupName);
            }
            self.validate_group(group, definition, &mut errors);
        }

        for group in self.entities().keys() {
            if self.edges().contains_key(group) {
                errors.push(ValidationError::DuplicateGroup {
                    group: group.clone(),
                });
            }
        }

        self.validate_serialisers(&mut errors);
        errors
    }

    fn validate_group(&self, group: &str, definition: &GroupDefinition, errors: &mut Vec<ValidationError>) {
        for (role, type_name) in definition.identifier_types() {
            if self.get_type(type_name).is_none() {
                errors.push(ValidationError::UndeclaredType {
                    group: group.to_string(),
                    property: role.to_string(),
                    type_name: type_name.to_string(),
                });
            }
        }

        for (property, type_name) in &definition.properties {
            let Some(type_def) = self.get_type(type_name) else {
                errors.push(ValidationError::UndeclaredType {
                    group: group.to_string(),
                    property: property.clone(),
                    type_name: type_name.clone(),
                });
                continue;
            };

            let is_group_by = definition.group_by.contains(property);

            if self.timestamp_property() == Some(property.as_str()) {
                let aggregator = type_def.aggregate_function.as_ref();
                let required = definition.aggregate && !is_group_by;
                let acceptable = match aggregator {
                    Some(op) => op.is_keep_maximum(),
                    None => !required,
                };
                if !acceptable {
                    errors.push(ValidationError::TimestampAggregator {
                        group: group.to_string(),
                        property: property.clone(),
                        found: aggregator.map(|op| op.name()).unwrap_or("none").to_string(),
                    });
                    continue;
                }
            }

            if definition.aggregate && !is_group_by && type_def.aggregate_function.is_none() {
                errors.push(ValidationError::MissingAggregateFunction {
                    group: group.to_string(),
                    property: property.clone(),
                });
            }
        }

        for property in &definition.group_by {
            if !definition.has_property(property) {
                errors.push(ValidationError::UndeclaredGroupBy {
                    group: group.to_string(),
                    property: property.clone(),
                });
            }
        }
    }

    fn validate_serialisers(&self, errors: &mut Vec<ValidationError>) {
        for (type_name, type_def) in self.types() {
            match type_def.serialiser_config().build() {
                Ok(serialiser) if !serialiser.can_handle(type_def.kind) => {
                    errors.push(ValidationError::IncompatibleSerialiser {
                        type_name: type_name.clone(),
                        serialiser: serialiser.name().to_string(),
                        kind: type_def.kind.to_string(),
                    });
                }
                Ok(_) => {}
                Err(e) => errors.push(ValidationError::InvalidSerialiser {
                    context: format!("type '{}'", type_name),
                    reason: e.to_string(),
                }),
            }
        }

        let vertex_serialiser = match self.vertex_serialiser() {
            Ok(s) => s,
            Err(e) => {
                errors.push(ValidationError::InvalidSerialiser {
                    context: "vertices".to_string(),
                    reason: e.to_string(),
                });
                return;
            }
        };

        let mut checked = Vec::new();
        for definition in self.entities().values().chain(self.edges().values()) {
            for (_, type_name) in definition.identifier_types() {
                if checked.contains(&type_name) {
                    continue;
                }
                checked.push(type_name);
                if let Some(type_def) = self.get_type(type_name) {
                    if !vertex_serialiser.can_handle(type_def.kind) {
                        errors.push(ValidationError::IncompatibleVertexSerialiser {
                            type_name: type_name.to_string(),
                            serialiser: vertex_serialiser.name().to_string(),
                            kind: type_def.kind.to_string(),
                        });
                    }
                }
            }
        }
    }
}

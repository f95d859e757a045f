//! Element Pipeline
//!
//! The staged processing applied to elements read through a view:
//!
//! 1. **select**: drop out-of-view groups and unselected properties
//! 2. **pre-aggregation filter**
//! 3. **aggregate**: merge by identity and groupBy values
//! 4. **post-aggregation filter**
//! 5. **transform**
//! 6. **post-transformation filter**
//! 7. **visibility**: drop elements the user's authorisations do not satisfy
//!
//! Visibility is decided against the stored element, before selection, so a
//! view that drops or transforms the visibility property cannot reveal a
//! hidden element. Hidden elements never reach aggregation.
//!
//! Stages 2 to 7 run only when the store declares the matching trait. A view
//! that relies on a stage the store lacks is rejected rather than ignored.
//! Ingest aggregation uses the aggregate stage on its own.

pub mod aggregate;
pub mod error;
pub mod filter;
pub mod transform;
pub mod visibility;

pub use aggregate::{AggregationKey, ElementAggregator};
pub use error::{PipelineError, PipelineResult};
pub use filter::{ElementFilter, FilterComponent};
pub use transform::{ElementTransformer, TransformComponent};
pub use visibility::{is_visible, VisibilityExpression};

use crate::element::{Element, Value};
use crate::operation::view::{View, ViewElementDefinition};
use crate::schema::Schema;
use crate::store::{StoreTrait, TraitSet};
use std::collections::{HashMap, HashSet};
use tracing::warn;

type Stage<'d> = fn(&'d ViewElementDefinition) -> Option<&'d ElementFilter>;

/// Runs the query stages for one view
pub struct Pipeline<'a> {
    schema: &'a Schema,
    view: &'a View,
    traits: &'a TraitSet,
    auths: Option<&'a HashSet<String>>,
}

impl<'a> Pipeline<'a> {
    pub fn new(schema: &'a Schema, view: &'a View, traits: &'a TraitSet) -> Self {
        Self {
            schema,
            view,
            traits,
            auths: None,
        }
    }

    /// Builder method: the requesting user's authorisations
    pub fn auths(mut self, auths: &'a HashSet<String>) -> Self {
        self.auths = Some(auths);
        self
    }

    /// Fail if the view needs a stage the store does not run
    pub fn check_supported(&self) -> PipelineResult<()> {
        let requirements = [
            (
                self.view.has_pre_aggregation_filters(),
                "pre-aggregation filtering",
                StoreTrait::PreAggregationFiltering,
            ),
            (
                self.view.has_post_aggregation_filters(),
                "post-aggregation filtering",
                StoreTrait::PostAggregationFiltering,
            ),
            (
                self.view.has_transformers(),
                "transformation",
                StoreTrait::Transformation,
            ),
            (
                self.view.has_post_transformation_filters(),
                "post-transformation filtering",
                StoreTrait::PostTransformationFiltering,
            ),
        ];
        for (needed, stage, required) in requirements {
            if needed && !self.traits.contains(&required) {
                return Err(PipelineError::MissingTrait { stage, required });
            }
        }
        Ok(())
    }

    pub fn run(&self, elements: impl IntoIterator<Item = Element>) -> PipelineResult<Vec<Element>> {
        self.check_supported()?;

        let check_visibility = self.traits.contains(&StoreTrait::Visibility);
        let mut definitions: HashMap<(bool, String), Option<ViewElementDefinition>> = HashMap::new();
        let mut selected = Vec::new();
        for mut element in elements {
            if check_visibility && !self.visible(&element) {
                continue;
            }
            let definition = definitions
                .entry((element.is_edge(), element.group().to_string()))
                .or_insert_with(|| self.view.definition(element.group(), element.is_edge()));
            let Some(definition) = definition else {
                continue;
            };
            element
                .properties_mut()
                .retain(|name, _| definition.keeps_property(name));
            selected.push(element);
        }

        let mut elements = self.filter_stage(selected, &definitions, |d| d.pre_aggregation_filter.as_ref())?;

        if self.traits.contains(&StoreTrait::QueryAggregation) {
            elements = ElementAggregator::with_view(self.schema, self.view).aggregate(elements)?;
        }

        elements = self.filter_stage(elements, &definitions, |d| d.post_aggregation_filter.as_ref())?;

        if self.traits.contains(&StoreTrait::Transformation) {
            for element in elements.iter_mut() {
                let transformer = Self::definition_of(&definitions, element).and_then(|d| d.transformer.as_ref());
                if let Some(transformer) = transformer {
                    transformer.apply(element)?;
                }
            }
        }

        self.filter_stage(elements, &definitions, |d| d.post_transformation_filter.as_ref())
    }

    fn definition_of<'d>(
        definitions: &'d HashMap<(bool, String), Option<ViewElementDefinition>>,
        element: &Element,
    ) -> Option<&'d ViewElementDefinition> {
        definitions
            .get(&(element.is_edge(), element.group().to_string()))?
            .as_ref()
    }

    fn filter_stage<'d>(
        &self,
        elements: Vec<Element>,
        definitions: &'d HashMap<(bool, String), Option<ViewElementDefinition>>,
        stage: Stage<'d>,
    ) -> PipelineResult<Vec<Element>> {
        let mut kept = Vec::with_capacity(elements.len());
        for element in elements {
            let filter = Self::definition_of(definitions, &element).and_then(stage);
            match filter {
                Some(filter) if !filter.test(&element)? => {}
                _ => kept.push(element),
            }
        }
        Ok(kept)
    }

    /// Visibility check for one stored element. Elements without a
    /// visibility value are public.
    pub fn visible(&self, element: &Element) -> bool {
        let Some(property) = self.schema.visibility_property() else {
            return true;
        };
        let empty = HashSet::new();
        let auths = self.auths.unwrap_or(&empty);
        match element.get_property(property) {
            None => true,
            Some(Value::String(expression)) => is_visible(expression, auths),
            Some(other) => {
                warn!(
                    group = element.group(),
                    kind = other.type_name(),
                    "Visibility property is not a String, hiding element"
                );
                false
            }
        }
    }
}

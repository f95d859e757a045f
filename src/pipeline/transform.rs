//! Element transformers

use crate::element::Element;
use crate::function::{Function, FunctionError, FunctionResult};
use crate::operation::Item;
use crate::pipeline::filter::select;
use serde::{Deserialize, Serialize};

/// Derive `projection` from the selected values by applying `functions`
/// in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformComponent {
    pub selection: Vec<String>,
    pub functions: Vec<Function>,
    pub projection: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementTransformer {
    #[serde(default)]
    pub components: Vec<TransformComponent>,
}

impl ElementTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: project `function(selection)` into `projection`
    pub fn select(
        mut self,
        selection: impl Into<String>,
        function: Function,
        projection: impl Into<String>,
    ) -> Self {
        self.components.push(TransformComponent {
            selection: vec![selection.into()],
            functions: vec![function],
            projection: projection.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Append another transformer's components
    pub fn then(mut self, other: &ElementTransformer) -> Self {
        self.components.extend(other.components.iter().cloned());
        self
    }

    /// Apply each component in turn. Components whose selection is missing
    /// are skipped; a `Null` result removes the projected property.
    pub fn apply(&self, element: &mut Element) -> FunctionResult<()> {
        for component in &self.components {
            let Some(input) = select(element, &component.selection) else {
                continue;
            };
            match Function::apply_all(&component.functions, Item::Value(input))? {
                Item::Null => {
                    element.remove_property(&component.projection);
                }
                output => {
                    let value = output.to_value().ok_or_else(|| {
                        FunctionError::type_mismatch("ElementTransformer", "Value", output.type_name())
                    })?;
                    element.put_property(component.projection.clone(), value);
                }
            }
        }
        Ok(())
    }
}

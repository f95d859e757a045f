//! Element filters

use crate::element::{Element, Value};
use crate::function::{FunctionResult, Predicate};
use serde::{Deserialize, Serialize};

/// One predicate applied to the selected properties of an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterComponent {
    /// Property names or reserved identifiers (`VERTEX`, `SOURCE`, ...)
    pub selection: Vec<String>,
    pub predicate: Predicate,
}

/// Conjunction of filter components. An empty filter accepts everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementFilter {
    #[serde(default)]
    pub components: Vec<FilterComponent>,
}

impl ElementFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: test `selection` with `predicate`
    pub fn select(mut self, selection: impl Into<String>, predicate: Predicate) -> Self {
        self.components.push(FilterComponent {
            selection: vec![selection.into()],
            predicate,
        });
        self
    }

    /// Builder method: test several selected values, passed as one list
    pub fn select_all(mut self, selection: Vec<String>, predicate: Predicate) -> Self {
        self.components.push(FilterComponent { selection, predicate });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Combine with another filter; both must accept
    pub fn and(mut self, other: &ElementFilter) -> Self {
        self.components.extend(other.components.iter().cloned());
        self
    }

    /// Property names the filter reads
    pub fn selected_properties(&self) -> impl Iterator<Item = &str> {
        self.components
            .iter()
            .flat_map(|c| c.selection.iter().map(String::as_str))
    }

    pub fn test(&self, element: &Element) -> FunctionResult<bool> {
        for component in &self.components {
            let input = select(element, &component.selection);
            if !component.predicate.test(input.as_ref())? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Resolve a selection: one name gives its value, several give a list.
/// Absent when any selected name is missing.
pub(crate) fn select(element: &Element, selection: &[String]) -> Option<Value> {
    match selection {
        [single] => element.selected(single),
        many => many
            .iter()
            .map(|name| element.selected(name))
            .collect::<Option<Vec<_>>>()
            .map(Value::List),
    }
}

//! Operations over generic collections and chain variables

use crate::operation::data::Data;
use crate::operation::wire;
use crate::operation::Options;
use serde::Deserialize;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Count {
    #[serde(default, deserialize_with = "wire::single_input")]
    pub input: Data,

    #[serde(default)]
    pub options: Options,
}

impl Count {
    pub fn chained() -> Self {
        Self::default()
    }
}

/// Keep the first `result_limit` items. With `truncate` off, exceeding the
/// limit is an error instead.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Limit {
    #[serde(default, deserialize_with = "wire::single_input")]
    pub input: Data,

    pub result_limit: usize,

    #[serde(default = "default_true")]
    pub truncate: bool,

    #[serde(default)]
    pub options: Options,
}

impl Limit {
    pub fn new(result_limit: usize) -> Self {
        Self {
            input: Data::Empty,
            result_limit,
            truncate: true,
            options: Options::new(),
        }
    }

    pub fn truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }
}

/// Consume and release the input, returning nothing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscardOutput {
    #[serde(default, deserialize_with = "wire::single_input")]
    pub input: Data,

    #[serde(default)]
    pub options: Options,
}

/// Drain the input into a list
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToList {
    #[serde(default, deserialize_with = "wire::single_input")]
    pub input: Data,

    #[serde(default)]
    pub options: Options,
}

/// Store the input in the context under `variable_name`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetVariable {
    #[serde(default, deserialize_with = "wire::single_input")]
    pub input: Data,

    pub variable_name: String,

    #[serde(default)]
    pub options: Options,
}

impl SetVariable {
    pub fn new(variable_name: impl Into<String>) -> Self {
        Self {
            input: Data::Empty,
            variable_name: variable_name.into(),
            options: Options::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetVariable {
    pub variable_name: String,

    #[serde(default)]
    pub options: Options,
}

impl GetVariable {
    pub fn new(variable_name: impl Into<String>) -> Self {
        Self {
            variable_name: variable_name.into(),
            options: Options::new(),
        }
    }
}

/// Several variables at once, as `Keyed { name, [value] }` items
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetVariables {
    pub variable_names: Vec<String>,

    #[serde(default)]
    pub options: Options,
}

impl GetVariables {
    pub fn new(variable_names: Vec<String>) -> Self {
        Self {
            variable_names,
            options: Options::new(),
        }
    }
}

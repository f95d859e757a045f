//! Control-flow operations

use crate::element::Value;
use crate::function::{BinaryOperator, Function, Predicate};
use crate::operation::data::Data;
use crate::operation::{wire, Operation, Options};
use serde::{Deserialize, Deserializer};

/// Hard ceiling on `While` iterations. Larger requests are capped.
pub const MAX_REPEATS_CEILING: usize = 1000;

fn default_max_repeats() -> usize {
    MAX_REPEATS_CEILING
}

/// A predicate over the running value, optionally tested after `transform`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conditional {
    pub predicate: Predicate,

    #[serde(default)]
    pub transform: Option<Box<Operation>>,
}

impl Conditional {
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            transform: None,
        }
    }

    pub fn transform(mut self, operation: impl Into<Operation>) -> Self {
        self.transform = Some(Box::new(operation.into()));
        self
    }
}

/// Repeat `operation` while the condition holds, feeding each output back
/// in as the next input
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct While {
    #[serde(default, deserialize_with = "wire::single_input")]
    pub input: Data,

    pub operation: Box<Operation>,

    #[serde(default = "default_max_repeats")]
    pub max_repeats: usize,

    /// Fixed condition, used when there is no conditional
    #[serde(default)]
    pub condition: Option<bool>,

    #[serde(default)]
    pub conditional: Option<Conditional>,

    #[serde(default)]
    pub options: Options,
}

impl While {
    pub fn new(operation: impl Into<Operation>) -> Self {
        Self {
            input: Data::Empty,
            operation: Box::new(operation.into()),
            max_repeats: MAX_REPEATS_CEILING,
            condition: None,
            conditional: None,
            options: Options::new(),
        }
    }

    pub fn input(mut self, input: impl Into<Data>) -> Self {
        self.input = input.into();
        self
    }

    pub fn max_repeats(mut self, max_repeats: usize) -> Self {
        self.max_repeats = max_repeats;
        self
    }

    pub fn condition(mut self, condition: bool) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn conditional(mut self, conditional: Conditional) -> Self {
        self.conditional = Some(conditional);
        self
    }

    /// Requested repeats, capped by the hard ceiling
    pub fn effective_max_repeats(&self) -> usize {
        self.max_repeats.min(MAX_REPEATS_CEILING)
    }
}

/// Run `then` or `otherwise` depending on the condition
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct If {
    #[serde(default, deserialize_with = "wire::single_input")]
    pub input: Data,

    #[serde(default)]
    pub condition: Option<bool>,

    #[serde(default)]
    pub conditional: Option<Conditional>,

    #[serde(default)]
    pub then: Option<Box<Operation>>,

    #[serde(default)]
    pub otherwise: Option<Box<Operation>>,

    #[serde(default)]
    pub options: Options,
}

impl If {
    pub fn new() -> Self {
        Self {
            input: Data::Empty,
            condition: None,
            conditional: None,
            then: None,
            otherwise: None,
            options: Options::new(),
        }
    }

    pub fn input(mut self, input: impl Into<Data>) -> Self {
        self.input = input.into();
        self
    }

    pub fn condition(mut self, condition: bool) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn conditional(mut self, conditional: Conditional) -> Self {
        self.conditional = Some(conditional);
        self
    }

    pub fn then(mut self, operation: impl Into<Operation>) -> Self {
        self.then = Some(Box::new(operation.into()));
        self
    }

    pub fn otherwise(mut self, operation: impl Into<Operation>) -> Self {
        self.otherwise = Some(Box::new(operation.into()));
        self
    }
}

impl Default for If {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply functions, in order, to the whole input
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Map {
    #[serde(default, deserialize_with = "wire::single_input")]
    pub input: Data,

    pub functions: Vec<Function>,

    #[serde(default)]
    pub options: Options,
}

impl Map {
    pub fn new(functions: Vec<Function>) -> Self {
        Self {
            input: Data::Empty,
            functions,
            options: Options::new(),
        }
    }

    pub fn input(mut self, input: impl Into<Data>) -> Self {
        self.input = input.into();
        self
    }
}

/// Run `operation` once per input item, collecting the outputs
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForEach {
    #[serde(default, deserialize_with = "wire::single_input")]
    pub input: Data,

    pub operation: Box<Operation>,

    #[serde(default)]
    pub options: Options,
}

impl ForEach {
    pub fn new(operation: impl Into<Operation>) -> Self {
        Self {
            input: Data::Empty,
            operation: Box::new(operation.into()),
            options: Options::new(),
        }
    }

    pub fn input(mut self, input: impl Into<Data>) -> Self {
        self.input = input.into();
        self
    }
}

/// Fold the input values with a binary operator
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reduce {
    #[serde(default, deserialize_with = "wire::single_input")]
    pub input: Data,

    #[serde(default, deserialize_with = "optional_value")]
    pub identity: Option<Value>,

    pub aggregate_function: BinaryOperator,

    #[serde(default)]
    pub options: Options,
}

impl Reduce {
    pub fn new(aggregate_function: BinaryOperator) -> Self {
        Self {
            input: Data::Empty,
            identity: None,
            aggregate_function,
            options: Options::new(),
        }
    }

    pub fn identity(mut self, identity: impl Into<Value>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn input(mut self, input: impl Into<Data>) -> Self {
        self.input = input.into();
        self
    }
}

fn optional_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    let json = serde_json::Value::deserialize(deserializer)?;
    if json.is_null() {
        return Ok(None);
    }
    wire::value_from_json(&json)
        .map(Some)
        .map_err(serde::de::Error::custom)
}

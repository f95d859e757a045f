//! Single-input functions used by `Map`, join key extraction and element
//! transformers

use crate::element::{Element, ElementSeed, Value};
use crate::function::error::{FunctionError, FunctionResult};
use crate::operation::Item;
use serde::{Deserialize, Serialize};

fn default_separator() -> String {
    ",".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum Function {
    Identity,
    ToString,
    ToLong,
    ToInteger,
    Concat {
        #[serde(default = "default_separator")]
        separator: String,
    },
    Multiply {
        by: i64,
    },
    Increment {
        by: i64,
    },
    Size,
    FirstItem,
    ExtractProperty {
        name: String,
    },
    ExtractGroup,
    ExtractVertex,
    ExtractKey,
    ExtractValues,
    ToEntitySeed,
    /// Apply `functions` in sequence to every member of a list
    IterableFunction {
        functions: Vec<Function>,
    },
}

impl Function {
    pub fn name(&self) -> &'static str {
        match self {
            Function::Identity => "Identity",
            Function::ToString => "ToString",
            Function::ToLong => "ToLong",
            Function::ToInteger => "ToInteger",
            Function::Concat { .. } => "Concat",
            Function::Multiply { .. } => "Multiply",
            Function::Increment { .. } => "Increment",
            Function::Size => "Size",
            Function::FirstItem => "FirstItem",
            Function::ExtractProperty { .. } => "ExtractProperty",
            Function::ExtractGroup => "ExtractGroup",
            Function::ExtractVertex => "ExtractVertex",
            Function::ExtractKey => "ExtractKey",
            Function::ExtractValues => "ExtractValues",
            Function::ToEntitySeed => "ToEntitySeed",
            Function::IterableFunction { .. } => "IterableFunction",
        }
    }

    /// Apply a sequence of functions, feeding each output to the next
    pub fn apply_all(functions: &[Function], input: Item) -> FunctionResult<Item> {
        functions.iter().try_fold(input, |acc, f| f.apply(acc))
    }

    pub fn apply(&self, input: Item) -> FunctionResult<Item> {
        if matches!(input, Item::Null) && !matches!(self, Function::Size) {
            return Ok(Item::Null);
        }

        match self {
            Function::Identity => Ok(input),
            Function::ToString => match input.to_value() {
                Some(Value::String(s)) => Ok(Item::Value(Value::String(s))),
                Some(v) => Ok(Item::Value(Value::String(v.to_string()))),
                None => Err(self.mismatch("Value", input.type_name())),
            },
            Function::ToLong => match input {
                Item::Value(Value::Integer(v)) => Ok(Item::Value(Value::Long(v as i64))),
                Item::Value(Value::Long(v)) => Ok(Item::Value(Value::Long(v))),
                Item::Value(Value::Float(v)) => Ok(Item::Value(Value::Long(v as i64))),
                Item::Value(Value::Double(v)) => Ok(Item::Value(Value::Long(v as i64))),
                Item::Value(Value::String(s)) => s
                    .trim()
                    .parse::<i64>()
                    .map(|v| Item::Value(Value::Long(v)))
                    .map_err(|e| self.failed(e.to_string())),
                other => Err(self.mismatch("numeric or String", other.type_name())),
            },
            Function::ToInteger => {
                let long = Function::ToLong.apply(input).map_err(|e| match e {
                    FunctionError::TypeMismatch { expected, actual, .. } => {
                        FunctionError::TypeMismatch {
                            function: self.name().to_string(),
                            expected,
                            actual,
                        }
                    }
                    other => other,
                })?;
                match long {
                    Item::Value(Value::Long(v)) => i32::try_from(v)
                        .map(|v| Item::Value(Value::Integer(v)))
                        .map_err(|_| self.failed(format!("{} is out of range", v))),
                    other => Err(self.mismatch("Long", other.type_name())),
                }
            }
            Function::Concat { separator } => {
                let parts: Vec<String> = match input {
                    Item::List(items) => items
                        .iter()
                        .map(|i| {
                            i.to_value()
                                .map(|v| v.to_string())
                                .ok_or_else(|| self.mismatch("Value", i.type_name()))
                        })
                        .collect::<FunctionResult<_>>()?,
                    Item::Value(Value::List(values)) => values.iter().map(|v| v.to_string()).collect(),
                    other => return Err(self.mismatch("List", other.type_name())),
                };
                Ok(Item::Value(Value::String(parts.join(separator))))
            }
            Function::Multiply { by } => self.arithmetic(input, |a| a.checked_mul(*by), |a| a * *by as f64),
            Function::Increment { by } => self.arithmetic(input, |a| a.checked_add(*by), |a| a + *by as f64),
            Function::Size => {
                let size = match &input {
                    Item::Null => 0,
                    Item::List(items) => items.len(),
                    Item::Keyed { values, .. } => values.len(),
                    Item::Value(v) => v
                        .len()
                        .ok_or_else(|| self.mismatch("sized value", v.type_name()))?,
                    other => return Err(self.mismatch("List", other.type_name())),
                };
                Ok(Item::Value(Value::Long(size as i64)))
            }
            Function::FirstItem => match input {
                Item::List(items) => Ok(items.into_iter().next().unwrap_or(Item::Null)),
                Item::Keyed { values, .. } => Ok(values.into_iter().next().unwrap_or(Item::Null)),
                Item::Value(Value::List(values)) => Ok(values
                    .into_iter()
                    .next()
                    .map(Item::Value)
                    .unwrap_or(Item::Null)),
                other => Err(self.mismatch("List", other.type_name())),
            },
            Function::ExtractProperty { name } => match input {
                Item::Element(e) => Ok(e
                    .get_property(name)
                    .cloned()
                    .map(Item::Value)
                    .unwrap_or(Item::Null)),
                other => Err(self.mismatch("Element", other.type_name())),
            },
            Function::ExtractGroup => match input {
                Item::Element(e) => Ok(Item::Value(Value::String(e.group().to_string()))),
                other => Err(self.mismatch("Element", other.type_name())),
            },
            Function::ExtractVertex => match input {
                Item::Element(Element::Entity(e)) => Ok(Item::Value(e.vertex)),
                Item::Element(Element::Edge(e)) => Ok(Item::Value(e.source)),
                Item::Seed(ElementSeed::Entity { vertex }) => Ok(Item::Value(vertex)),
                Item::Seed(ElementSeed::Edge { source, .. }) => Ok(Item::Value(source)),
                other => Err(self.mismatch("Element", other.type_name())),
            },
            Function::ExtractKey => match input {
                Item::Keyed { key, .. } => Ok(*key),
                Item::Pair(first, _) => Ok(*first),
                other => Err(self.mismatch("Keyed", other.type_name())),
            },
            Function::ExtractValues => match input {
                Item::Keyed { values, .. } => Ok(Item::List(values)),
                Item::Pair(_, second) => Ok(*second),
                other => Err(self.mismatch("Keyed", other.type_name())),
            },
            Function::ToEntitySeed => match input {
                Item::Value(v) => Ok(Item::Seed(ElementSeed::entity(v))),
                Item::Element(Element::Entity(e)) => Ok(Item::Seed(ElementSeed::entity(e.vertex))),
                seed @ Item::Seed(ElementSeed::Entity { .. }) => Ok(seed),
                other => Err(self.mismatch("Value or Entity", other.type_name())),
            },
            Function::IterableFunction { functions } => match input {
                Item::List(items) => items
                    .into_iter()
                    .map(|item| Function::apply_all(functions, item))
                    .collect::<FunctionResult<Vec<_>>>()
                    .map(Item::List),
                other => Err(self.mismatch("List", other.type_name())),
            },
        }
    }

    fn arithmetic(
        &self,
        input: Item,
        integral: impl Fn(i64) -> Option<i64>,
        floating: impl Fn(f64) -> f64,
    ) -> FunctionResult<Item> {
        let overflow = || self.failed("arithmetic overflow".to_string());
        let value = match input {
            Item::Value(Value::Integer(v)) => {
                let result = integral(v as i64).ok_or_else(overflow)?;
                Value::Integer(i32::try_from(result).map_err(|_| overflow())?)
            }
            Item::Value(Value::Long(v)) => Value::Long(integral(v).ok_or_else(overflow)?),
            Item::Value(Value::Float(v)) => Value::Float(floating(v as f64) as f32),
            Item::Value(Value::Double(v)) => Value::Double(floating(v)),
            other => return Err(self.mismatch("numeric", other.type_name())),
        };
        Ok(Item::Value(value))
    }

    fn mismatch(&self, expected: &str, actual: &str) -> FunctionError {
        FunctionError::type_mismatch(self.name(), expected, actual)
    }

    fn failed(&self, reason: String) -> FunctionError {
        FunctionError::Failed {
            function: self.name().to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Entity;

    fn long(v: i64) -> Item {
        Item::Value(Value::Long(v))
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(Function::Multiply { by: 3 }.apply(long(4)).unwrap(), long(12));
        assert_eq!(
            Function::Increment { by: 1 }
                .apply(Item::Value(Value::Integer(1)))
                .unwrap(),
            Item::Value(Value::Integer(2))
        );
        assert!(Function::Increment { by: 1 }.apply(long(i64::MAX)).is_err());
        assert!(Function::Multiply { by: 2 }
            .apply(Item::Value(Value::from("x")))
            .is_err());
    }

    #[test]
    fn test_element_extraction() {
        let element = Item::Element(Entity::new("person", "v1").property("age", 30i64).into());
        assert_eq!(
            Function::ExtractProperty { name: "age".into() }
                .apply(element.clone())
                .unwrap(),
            long(30)
        );
        assert_eq!(
            Function::ExtractProperty { name: "missing".into() }
                .apply(element.clone())
                .unwrap(),
            Item::Null
        );
        assert_eq!(
            Function::ExtractVertex.apply(element).unwrap(),
            Item::Value(Value::from("v1"))
        );
    }

    #[test]
    fn test_sequence_and_iterable() {
        let input = Item::List(vec![long(1), long(2), long(3)]);
        let functions = vec![
            Function::IterableFunction {
                functions: vec![Function::Multiply { by: 10 }, Function::ToString],
            },
            Function::Concat {
                separator: "-".into(),
            },
        ];
        assert_eq!(
            Function::apply_all(&functions, input).unwrap(),
            Item::Value(Value::from("10-20-30"))
        );
    }

    #[test]
    fn test_size_and_first() {
        let input = Item::List(vec![long(7), long(8)]);
        assert_eq!(Function::Size.apply(input.clone()).unwrap(), long(2));
        assert_eq!(Function::FirstItem.apply(input).unwrap(), long(7));
        assert_eq!(Function::Size.apply(Item::Null).unwrap(), long(0));
    }
}

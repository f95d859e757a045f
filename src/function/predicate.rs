//! Predicates over values and items

use crate::element::{Value, ValueKind};
use crate::function::error::{FunctionError, FunctionResult};
use crate::operation::wire::{value_json, values_json};
use crate::operation::Item;
use serde::{Deserialize, Serialize};

/// A boolean test over an optional input.
///
/// An absent input fails every predicate except `Exists` (and whatever
/// `Not` makes of that). An input of the wrong type is an error, never a
/// silent `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum Predicate {
    Exists,
    IsTrue,
    IsFalse,
    IsEqual {
        #[serde(with = "value_json")]
        value: Value,
    },
    IsMoreThan {
        #[serde(with = "value_json")]
        value: Value,
        #[serde(default, rename = "orEqualTo")]
        or_equal_to: bool,
    },
    IsLessThan {
        #[serde(with = "value_json")]
        value: Value,
        #[serde(default, rename = "orEqualTo")]
        or_equal_to: bool,
    },
    IsIn {
        #[serde(with = "values_json")]
        values: Vec<Value>,
    },
    IsA {
        kind: ValueKind,
    },
    IsShorterThan {
        #[serde(rename = "maxLength")]
        max_length: usize,
        #[serde(default, rename = "orEqualTo")]
        or_equal_to: bool,
    },
    IsLongerThan {
        #[serde(rename = "minLength")]
        min_length: usize,
        #[serde(default, rename = "orEqualTo")]
        or_equal_to: bool,
    },
    Not {
        predicate: Box<Predicate>,
    },
    And {
        predicates: Vec<Predicate>,
    },
    Or {
        predicates: Vec<Predicate>,
    },
}

impl Predicate {
    pub fn name(&self) -> &'static str {
        match self {
            Predicate::Exists => "Exists",
            Predicate::IsTrue => "IsTrue",
            Predicate::IsFalse => "IsFalse",
            Predicate::IsEqual { .. } => "IsEqual",
            Predicate::IsMoreThan { .. } => "IsMoreThan",
            Predicate::IsLessThan { .. } => "IsLessThan",
            Predicate::IsIn { .. } => "IsIn",
            Predicate::IsA { .. } => "IsA",
            Predicate::IsShorterThan { .. } => "IsShorterThan",
            Predicate::IsLongerThan { .. } => "IsLongerThan",
            Predicate::Not { .. } => "Not",
            Predicate::And { .. } => "And",
            Predicate::Or { .. } => "Or",
        }
    }

    pub fn not(predicate: Predicate) -> Self {
        Predicate::Not {
            predicate: Box::new(predicate),
        }
    }

    /// Test a property value
    pub fn test(&self, input: Option<&Value>) -> FunctionResult<bool> {
        match self {
            Predicate::Exists => return Ok(input.is_some()),
            Predicate::Not { predicate } => return Ok(!predicate.test(input)?),
            Predicate::And { predicates } => {
                for p in predicates {
                    if !p.test(input)? {
                        return Ok(false);
                    }
                }
                return Ok(true);
            }
            Predicate::Or { predicates } => {
                for p in predicates {
                    if p.test(input)? {
                        return Ok(true);
                    }
                }
                return Ok(false);
            }
            _ => {}
        }

        let Some(value) = input else {
            return Ok(false);
        };

        match self {
            Predicate::IsTrue | Predicate::IsFalse => {
                let b = value
                    .as_bool()
                    .ok_or_else(|| self.mismatch("Boolean", value.type_name()))?;
                Ok(b == matches!(self, Predicate::IsTrue))
            }
            Predicate::IsEqual { value: expected } => Ok(value == expected),
            Predicate::IsMoreThan {
                value: bound,
                or_equal_to,
            } => {
                self.check_kind(bound, value)?;
                Ok(value > bound || (*or_equal_to && value == bound))
            }
            Predicate::IsLessThan {
                value: bound,
                or_equal_to,
            } => {
                self.check_kind(bound, value)?;
                Ok(value < bound || (*or_equal_to && value == bound))
            }
            Predicate::IsIn { values } => Ok(values.contains(value)),
            Predicate::IsA { kind } => Ok(value.kind() == *kind),
            Predicate::IsShorterThan { .. } | Predicate::IsLongerThan { .. } => {
                let len = value
                    .len()
                    .ok_or_else(|| self.mismatch("String, Bytes, FreqMap or List", value.type_name()))?;
                Ok(self.test_length(len))
            }
            Predicate::Exists | Predicate::Not { .. } | Predicate::And { .. } | Predicate::Or { .. } => {
                Ok(false)
            }
        }
    }

    /// Test an arbitrary item, e.g. the running value of a loop
    pub fn test_item(&self, input: Option<&Item>) -> FunctionResult<bool> {
        let Some(item) = input else {
            return self.test(None);
        };
        if let Some(value) = item.to_value() {
            return self.test(Some(&value));
        }
        match self {
            Predicate::Exists => Ok(!matches!(item, Item::Null)),
            Predicate::IsA { .. } => Ok(false),
            Predicate::Not { predicate } => Ok(!predicate.test_item(input)?),
            Predicate::And { predicates } => {
                for p in predicates {
                    if !p.test_item(input)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or { predicates } => {
                for p in predicates {
                    if p.test_item(input)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::IsShorterThan { .. } | Predicate::IsLongerThan { .. } => match item {
                Item::List(items) => Ok(self.test_length(items.len())),
                Item::Keyed { values, .. } => Ok(self.test_length(values.len())),
                _ => Err(self.mismatch("List", item.type_name())),
            },
            _ => Err(self.mismatch("Value", item.type_name())),
        }
    }

    fn test_length(&self, len: usize) -> bool {
        match self {
            Predicate::IsShorterThan {
                max_length,
                or_equal_to,
            } => len < *max_length || (*or_equal_to && len == *max_length),
            Predicate::IsLongerThan {
                min_length,
                or_equal_to,
            } => len > *min_length || (*or_equal_to && len == *min_length),
            _ => false,
        }
    }

    fn check_kind(&self, bound: &Value, value: &Value) -> FunctionResult<()> {
        if bound.kind() == value.kind() {
            Ok(())
        } else {
            Err(self.mismatch(bound.type_name(), value.type_name()))
        }
    }

    fn mismatch(&self, expected: &str, actual: &str) -> FunctionError {
        FunctionError::type_mismatch(self.name(), expected, actual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Entity;

    #[test]
    fn test_comparisons() {
        let p = Predicate::IsMoreThan {
            value: Value::Long(5),
            or_equal_to: false,
        };
        assert!(p.test(Some(&Value::Long(6))).unwrap());
        assert!(!p.test(Some(&Value::Long(5))).unwrap());
        assert!(!p.test(None).unwrap());

        let p = Predicate::IsLessThan {
            value: Value::Long(5),
            or_equal_to: true,
        };
        assert!(p.test(Some(&Value::Long(5))).unwrap());
    }

    #[test]
    fn test_type_mismatch_names_both_types() {
        let p = Predicate::IsMoreThan {
            value: Value::Long(5),
            or_equal_to: false,
        };
        let err = p.test(Some(&Value::from("five"))).unwrap_err();
        assert_eq!(
            err,
            FunctionError::type_mismatch("IsMoreThan", "Long", "String")
        );
    }

    #[test]
    fn test_composites() {
        let p = Predicate::And {
            predicates: vec![
                Predicate::Exists,
                Predicate::not(Predicate::IsIn {
                    values: vec![Value::Long(1), Value::Long(2)],
                }),
            ],
        };
        assert!(p.test(Some(&Value::Long(3))).unwrap());
        assert!(!p.test(Some(&Value::Long(2))).unwrap());
        assert!(!p.test(None).unwrap());
    }

    #[test]
    fn test_item_lengths() {
        let list = Item::List(vec![Item::Element(Entity::new("g", "v").into())]);
        let p = Predicate::IsShorterThan {
            max_length: 2,
            or_equal_to: false,
        };
        assert!(p.test_item(Some(&list)).unwrap());

        let element = Item::Element(Entity::new("g", "v").into());
        let p = Predicate::IsMoreThan {
            value: Value::Long(1),
            or_equal_to: false,
        };
        assert!(matches!(
            p.test_item(Some(&element)),
            Err(FunctionError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_json_form() {
        let p: Predicate =
            serde_json::from_str(r#"{"class":"IsIn","values":[100,["Integer",101]]}"#).unwrap();
        assert_eq!(
            p,
            Predicate::IsIn {
                values: vec![Value::Long(100), Value::Integer(101)]
            }
        );
    }
}

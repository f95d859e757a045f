//! Binary operators used as aggregate functions
//!
//! Aggregation folds property values pairwise in arrival order. Operators
//! are expected to be associative and commutative; `First` and `Last` are
//! not, and results using them depend on arrival order.

use crate::element::Value;
use crate::function::error::{FunctionError, FunctionResult};
use serde::{Deserialize, Serialize};

fn default_separator() -> String {
    ",".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum BinaryOperator {
    Sum,
    /// Keep-maximum
    Max,
    Min,
    Product,
    StringConcat {
        #[serde(default = "default_separator")]
        separator: String,
    },
    FreqMapMerge,
    ListConcat,
    And,
    Or,
    First,
    Last,
}

impl BinaryOperator {
    pub fn name(&self) -> &'static str {
        match self {
            BinaryOperator::Sum => "Sum",
            BinaryOperator::Max => "Max",
            BinaryOperator::Min => "Min",
            BinaryOperator::Product => "Product",
            BinaryOperator::StringConcat { .. } => "StringConcat",
            BinaryOperator::FreqMapMerge => "FreqMapMerge",
            BinaryOperator::ListConcat => "ListConcat",
            BinaryOperator::And => "And",
            BinaryOperator::Or => "Or",
            BinaryOperator::First => "First",
            BinaryOperator::Last => "Last",
        }
    }

    pub fn is_keep_maximum(&self) -> bool {
        matches!(self, BinaryOperator::Max)
    }

    pub fn apply(&self, a: &Value, b: &Value) -> FunctionResult<Value> {
        match self {
            BinaryOperator::First => return Ok(a.clone()),
            BinaryOperator::Last => return Ok(b.clone()),
            _ => {}
        }

        if a.kind() != b.kind() {
            return Err(FunctionError::IncompatibleOperands {
                function: self.name().to_string(),
                left: a.type_name().to_string(),
                right: b.type_name().to_string(),
            });
        }

        match (self, a, b) {
            (BinaryOperator::Sum, Value::Integer(x), Value::Integer(y)) => Ok(Value::Integer(x.wrapping_add(*y))),
            (BinaryOperator::Sum, Value::Long(x), Value::Long(y)) => Ok(Value::Long(x.wrapping_add(*y))),
            (BinaryOperator::Sum, Value::Float(x), Value::Float(y)) => Ok(Value::Float(x + y)),
            (BinaryOperator::Sum, Value::Double(x), Value::Double(y)) => Ok(Value::Double(x + y)),

            (BinaryOperator::Product, Value::Integer(x), Value::Integer(y)) => Ok(Value::Integer(x.wrapping_mul(*y))),
            (BinaryOperator::Product, Value::Long(x), Value::Long(y)) => Ok(Value::Long(x.wrapping_mul(*y))),
            (BinaryOperator::Product, Value::Float(x), Value::Float(y)) => Ok(Value::Float(x * y)),
            (BinaryOperator::Product, Value::Double(x), Value::Double(y)) => Ok(Value::Double(x * y)),

            (BinaryOperator::Max, _, _) => Ok(if b > a { b.clone() } else { a.clone() }),
            (BinaryOperator::Min, _, _) => Ok(if b < a { b.clone() } else { a.clone() }),

            (BinaryOperator::StringConcat { separator }, Value::String(x), Value::String(y)) => {
                Ok(Value::String(format!("{}{}{}", x, separator, y)))
            }
            (BinaryOperator::FreqMapMerge, Value::FreqMap(x), Value::FreqMap(y)) => {
                let mut merged = x.clone();
                for (k, v) in y {
                    *merged.entry(k.clone()).or_insert(0) += v;
                }
                Ok(Value::FreqMap(merged))
            }
            (BinaryOperator::ListConcat, Value::List(x), Value::List(y)) => {
                Ok(Value::List(x.iter().chain(y.iter()).cloned().collect()))
            }
            (BinaryOperator::And, Value::Boolean(x), Value::Boolean(y)) => Ok(Value::Boolean(*x && *y)),
            (BinaryOperator::Or, Value::Boolean(x), Value::Boolean(y)) => Ok(Value::Boolean(*x || *y)),

            _ => Err(FunctionError::type_mismatch(
                self.name(),
                self.expected_input(),
                a.type_name(),
            )),
        }
    }

    fn expected_input(&self) -> &'static str {
        match self {
            BinaryOperator::Sum | BinaryOperator::Product => "numeric",
            BinaryOperator::StringConcat { .. } => "String",
            BinaryOperator::FreqMapMerge => "FreqMap",
            BinaryOperator::ListConcat => "List",
            BinaryOperator::And | BinaryOperator::Or => "Boolean",
            _ => "Value",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_numeric_operators() {
        assert_eq!(
            BinaryOperator::Sum.apply(&Value::Long(3), &Value::Long(3)).unwrap(),
            Value::Long(6)
        );
        assert_eq!(
            BinaryOperator::Product
                .apply(&Value::Integer(100), &Value::Integer(101))
                .unwrap(),
            Value::Integer(10100)
        );
        assert_eq!(
            BinaryOperator::Max.apply(&Value::Long(2), &Value::Long(9)).unwrap(),
            Value::Long(9)
        );
        assert_eq!(
            BinaryOperator::Min.apply(&Value::Double(2.0), &Value::Double(-1.0)).unwrap(),
            Value::Double(-1.0)
        );
    }

    #[test]
    fn test_string_concat_default_separator() {
        let op: BinaryOperator = serde_json::from_str(r#"{"class":"StringConcat"}"#).unwrap();
        let merged = op
            .apply(&Value::from("3"), &Value::from("3"))
            .and_then(|v| op.apply(&v, &Value::from("3")))
            .unwrap();
        assert_eq!(merged, Value::from("3,3,3"));
    }

    #[test]
    fn test_freq_map_merge() {
        let a = Value::FreqMap(BTreeMap::from([("x".to_string(), 1), ("y".to_string(), 2)]));
        let b = Value::FreqMap(BTreeMap::from([("y".to_string(), 3)]));
        assert_eq!(
            BinaryOperator::FreqMapMerge.apply(&a, &b).unwrap(),
            Value::FreqMap(BTreeMap::from([("x".to_string(), 1), ("y".to_string(), 5)]))
        );
    }

    #[test]
    fn test_mismatched_operands() {
        assert!(matches!(
            BinaryOperator::Sum.apply(&Value::Long(1), &Value::Integer(1)),
            Err(FunctionError::IncompatibleOperands { .. })
        ));
        assert!(matches!(
            BinaryOperator::Sum.apply(&Value::from("a"), &Value::from("b")),
            Err(FunctionError::TypeMismatch { .. })
        ));
    }
}

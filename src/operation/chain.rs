//! Operation chains

use crate::operation::error::{OperationError, OperationResult};
use crate::operation::{Operation, OperationKind, Options};
use serde::Deserialize;

/// An ordered sequence of operations. Each output feeds the next input;
/// the chain's output is the output of its last operation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationChain {
    #[serde(default)]
    pub operations: Vec<Operation>,

    #[serde(default)]
    pub options: Options,
}

impl OperationChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: append an operation
    pub fn then(mut self, operation: impl Into<Operation>) -> Self {
        self.operations.push(operation.into());
        self
    }

    /// Parse a chain, or a single operation as a chain of one
    pub fn from_json(json: &str) -> OperationResult<Self> {
        match serde_json::from_str::<Operation>(json)? {
            Operation::Chain(chain) => Ok(chain),
            operation => Ok(OperationChain::from(operation)),
        }
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Kind of the last operation, which determines the chain's output
    pub fn output_kind(&self) -> Option<OperationKind> {
        self.operations.last().map(Operation::kind)
    }

    /// Every operation in the chain, nested chains flattened, depth first
    pub fn flatten(&self) -> Vec<&Operation> {
        let mut flat = Vec::new();
        for operation in &self.operations {
            match operation {
                Operation::Chain(nested) => flat.extend(nested.flatten()),
                other => flat.push(other),
            }
        }
        flat
    }

    /// Static checks run before any operation executes
    pub fn validate(&self) -> OperationResult<()> {
        for operation in &self.operations {
            operation.validate()?;
        }
        Ok(())
    }
}

impl From<Operation> for OperationChain {
    fn from(operation: Operation) -> Self {
        Self {
            operations: vec![operation],
            options: Options::new(),
        }
    }
}

impl Operation {
    /// Per-operation static checks
    pub fn validate(&self) -> OperationResult<()> {
        let invalid = |reason: &str| {
            Err(OperationError::Invalid {
                operation: self.kind().to_string(),
                reason: reason.to_string(),
            })
        };
        match self {
            Operation::Chain(chain) => chain.validate(),
            Operation::While(op) => {
                if op.condition.is_none() && op.conditional.is_none() {
                    return invalid("a condition or a conditional is required");
                }
                if let Some(transform) = op.conditional.as_ref().and_then(|c| c.transform.as_ref()) {
                    transform.validate()?;
                }
                op.operation.validate()
            }
            Operation::If(op) => {
                if op.condition.is_none() && op.conditional.is_none() {
                    return invalid("a condition or a conditional is required");
                }
                for branch in [&op.then, &op.otherwise].into_iter().flatten() {
                    branch.validate()?;
                }
                Ok(())
            }
            Operation::ForEach(op) => op.operation.validate(),
            Operation::Join(op) => {
                if op.collection_limit == Some(0) {
                    return invalid("collectionLimit must be positive");
                }
                op.operation.validate()
            }
            Operation::Limit(op) if op.result_limit == 0 => invalid("resultLimit must be positive"),
            Operation::Map(op) if op.functions.is_empty() => invalid("at least one function is required"),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{Count, GetAllElements, Limit, While};

    #[test]
    fn test_single_operation_json_is_a_chain_of_one() {
        let chain = OperationChain::from_json(r#"{"class": "GetAllElements"}"#).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.output_kind(), Some(OperationKind::GetAllElements));
    }

    #[test]
    fn test_chain_json() {
        let chain = OperationChain::from_json(
            r#"{
                "class": "OperationChain",
                "operations": [
                    {"class": "GetElements", "input": ["v1", "v2"]},
                    {"class": "Limit", "resultLimit": 1},
                    {"class": "OperationChain", "operations": [{"class": "Count"}]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(chain.len(), 3);
        let kinds: Vec<OperationKind> = chain.flatten().into_iter().map(Operation::kind).collect();
        assert_eq!(
            kinds,
            vec![OperationKind::GetElements, OperationKind::Limit, OperationKind::Count]
        );
    }

    #[test]
    fn test_validate_rejects_unconditioned_loops() {
        let chain = OperationChain::new()
            .then(GetAllElements::new())
            .then(While::new(Count::default()));
        assert!(matches!(chain.validate(), Err(OperationError::Invalid { .. })));

        let chain = OperationChain::new().then(Limit::new(0));
        assert!(chain.validate().is_err());
    }
}

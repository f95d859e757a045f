//! Pipeline error types

use crate::function::FunctionError;
use crate::store::StoreTrait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The view asks for a stage the store cannot run
    #[error("The view requires {stage}, which needs the {required} trait")]
    MissingTrait {
        stage: &'static str,
        required: StoreTrait,
    },

    #[error("Function error: {0}")]
    Function(#[from] FunctionError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

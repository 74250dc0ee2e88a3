use thiserror::Error;

use crate::error::{ErrorKind, SynapseError};
use crate::llm::LlmError;
use crate::search::SearchError;

#[derive(Debug, Error)]
pub enum ReasoningError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Search(#[from] SearchError),
}

impl SynapseError for ReasoningError {
    fn kind(&self) -> ErrorKind {
        match self {
            ReasoningError::Llm(e) => e.kind(),
            ReasoningError::Search(e) => e.kind(),
        }
    }
}

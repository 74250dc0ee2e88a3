use thiserror::Error;

use crate::error::{ErrorKind, SynapseError};
use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum FollowUpError {
    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl SynapseError for FollowUpError {
    fn kind(&self) -> ErrorKind {
        match self {
            FollowUpError::Llm(e) => e.kind(),
        }
    }
}

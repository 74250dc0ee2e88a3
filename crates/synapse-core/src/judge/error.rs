use thiserror::Error;

use crate::error::{ErrorKind, SynapseError};
use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("failed to parse judge response as JSON: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

impl SynapseError for JudgeError {
    fn kind(&self) -> ErrorKind {
        match self {
            JudgeError::Llm(e) => e.kind(),
            JudgeError::InvalidResponse(_) => ErrorKind::Corrupted,
        }
    }
}

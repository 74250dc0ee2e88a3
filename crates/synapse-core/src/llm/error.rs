use thiserror::Error;

use crate::error::{ErrorKind, SynapseError};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("provider error: {0}")]
    Provider(String),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("failed to parse provider response: {0}")]
    Malformed(String),
}

impl SynapseError for LlmError {
    fn kind(&self) -> ErrorKind {
        match self {
            LlmError::Provider(_) => ErrorKind::UpstreamUnavailable,
            LlmError::Timeout(_) => ErrorKind::UpstreamTimeout,
            LlmError::Malformed(_) => ErrorKind::Internal,
        }
    }
}

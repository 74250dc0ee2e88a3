use thiserror::Error;

use crate::error::{ErrorKind, SynapseError};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache disabled")]
    Disabled,

    #[error("failed to serialize cache value: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SynapseError for CacheError {
    fn kind(&self) -> ErrorKind {
        match self {
            CacheError::Disabled => ErrorKind::Internal,
            CacheError::Serialization(_) => ErrorKind::Corrupted,
        }
    }
}

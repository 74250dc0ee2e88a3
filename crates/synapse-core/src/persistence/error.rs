use thiserror::Error;

use crate::error::{ErrorKind, SynapseError};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("not found")]
    NotFound,

    #[error("tenant mismatch: resource does not belong to the calling tenant")]
    TenantMismatch,

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl SynapseError for PersistenceError {
    fn kind(&self) -> ErrorKind {
        match self {
            PersistenceError::NotFound => ErrorKind::NotFound,
            PersistenceError::TenantMismatch => ErrorKind::Unauthorized,
            PersistenceError::BackendUnavailable(_) => ErrorKind::UpstreamUnavailable,
            PersistenceError::Backend(_) => ErrorKind::Internal,
        }
    }
}

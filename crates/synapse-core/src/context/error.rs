use thiserror::Error;

use crate::error::{ErrorKind, SynapseError};
use crate::persistence::PersistenceError;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl SynapseError for ContextError {
    fn kind(&self) -> ErrorKind {
        match self {
            ContextError::Persistence(e) => e.kind(),
        }
    }
}

use thiserror::Error;

use crate::error::{ErrorKind, SynapseError};

/// Locks every embed call to a single, validated vector width.
#[derive(Debug, Clone, Copy)]
pub struct DimConfig {
    dimension: usize,
}

impl DimConfig {
    pub fn new(dimension: usize) -> Result<Self, DimValidationError> {
        if dimension == 0 {
            return Err(DimValidationError::Zero);
        }
        Ok(Self { dimension })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn validate(&self, actual: usize) -> Result<(), DimValidationError> {
        if actual != self.dimension {
            return Err(DimValidationError::Mismatch {
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum DimValidationError {
    #[error("embedding dimension must be non-zero")]
    Zero,

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    Mismatch { expected: usize, actual: usize },
}

impl SynapseError for DimValidationError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Corrupted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_dimension() {
        assert!(DimConfig::new(0).is_err());
    }

    #[test]
    fn validates_matching_dimension() {
        let config = DimConfig::new(384).unwrap();
        assert!(config.validate(384).is_ok());
        assert!(config.validate(768).is_err());
    }
}

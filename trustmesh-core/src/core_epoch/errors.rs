//! Error types for epoch management

use crate::core_registry::errors::RegistryError;
use thiserror::Error;

/// Result type for epoch operations
pub type EpochResult<T> = Result<T, EpochError>;

#[derive(Debug, Error)]
pub enum EpochError {
    /// No epoch with this number is known
    #[error("Epoch not found: {0}")]
    NotFound(u64),

    /// Another increment won the race; retry against fresh state
    #[error("Epoch conflict: expected {expected}, found {actual}")]
    Conflict { expected: u64, actual: u64 },

    /// Stored history breaks monotonicity or the single-open-epoch rule
    #[error("Epoch history invariant violated: {0}")]
    InvariantViolation(String),

    /// Registry failure
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl EpochError {
    /// Whether the caller should retry against fresh state
    pub fn is_conflict(&self) -> bool {
        matches!(self, EpochError::Conflict { .. } | EpochError::Registry(RegistryError::Conflict(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EpochError::Conflict { expected: 2, actual: 3 };
        assert_eq!(err.to_string(), "Epoch conflict: expected 2, found 3");
    }

    #[test]
    fn test_conflict_detection() {
        assert!(EpochError::Conflict { expected: 1, actual: 2 }.is_conflict());
        assert!(EpochError::from(RegistryError::Conflict("dup".into())).is_conflict());
        assert!(!EpochError::NotFound(4).is_conflict());
    }
}

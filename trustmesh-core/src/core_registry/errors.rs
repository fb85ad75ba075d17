//! Error types for the group registry

use thiserror::Error;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur while reading or mutating the registry
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Underlying database failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// A uniqueness constraint rejected the write; retry against fresh state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Group not found
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// No active membership record
    #[error("Member not found in group {group}: {member}")]
    MemberNotFound { group: String, member: String },

    /// Active membership record already exists
    #[error("Member already active in group {group}: {member}")]
    MemberExists { group: String, member: String },

    /// Actor lacks permission for the operation
    #[error("Permission denied: {actor} cannot {action} in group {group}")]
    PermissionDenied { actor: String, action: String, group: String },

    /// The operation would leave the group without an admin
    #[error("Group {0} must keep at least one admin")]
    LastAdmin(String),

    /// A stored row could not be decoded
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for RegistryError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                RegistryError::Conflict(e.to_string())
            }
            _ => RegistryError::Storage(e.to_string()),
        }
    }
}

impl From<r2d2::Error> for RegistryError {
    fn from(e: r2d2::Error) -> Self {
        RegistryError::Storage(format!("Failed to get connection: {}", e))
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(e: serde_json::Error) -> Self {
        RegistryError::Serialization(e.to_string())
    }
}

//! Error types for sync routing

use crate::core_registry::errors::RegistryError;
use thiserror::Error;

pub type RouterResult<T> = Result<T, RouterError>;

#[derive(Debug, Error)]
pub enum RouterError {
    /// The sender may not write at the current epoch; the whole batch is refused
    #[error("Write denied for {sender} in group {group}")]
    WriteDenied { sender: String, group: String },

    /// A message in the batch is tagged with another partition
    #[error("Partition mismatch: expected {expected}, got {actual}")]
    PartitionMismatch { expected: String, actual: String },

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

//! Error types for proof creation
//!
//! Only the creation side can fail. Verification reports every problem as a
//! plain `false`.

use crate::core_registry::errors::RegistryError;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The calling actor holds no active membership in the domain
    #[error("{actor} is not a member of {domain}")]
    NotAMember { actor: String, domain: String },

    /// The context was built for an epoch the group has since left
    #[error("Context epoch {context_epoch} is behind live epoch {live_epoch}")]
    StaleContext { context_epoch: u64, live_epoch: u64 },

    #[error("Proof encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

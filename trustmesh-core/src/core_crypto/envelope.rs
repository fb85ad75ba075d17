//! Encrypted data envelope
//!
//! Even insecure providers fill in the full metadata so a secure peer can
//! spot and refuse `encrypted: false` data at the boundary.

use super::errors::{EncryptionError, EncryptionResult};
use serde::{Deserialize, Serialize};

pub const ALGORITHM_AES_256_GCM: &str = "aes-256-gcm";
pub const ALGORITHM_NONE: &str = "none";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionMetadata {
    pub domain_id: String,
    pub epoch: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    pub encrypted: bool,
    pub algorithm: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedData {
    /// Context id the data is bound to
    pub context_id: String,
    pub ciphertext: Vec<u8>,
    pub metadata: EncryptionMetadata,
}

impl EncryptedData {
    pub fn is_encrypted(&self) -> bool {
        self.metadata.encrypted
    }
}

/// Domain and epoch matching shared by `decrypt` and `can_decrypt`
///
/// The epoch only binds data that is actually encrypted.
pub fn check_binding(metadata: &EncryptionMetadata, domain_id: &str, epoch: u64) -> EncryptionResult<()> {
    if metadata.domain_id != domain_id {
        return Err(EncryptionError::DomainMismatch {
            expected: domain_id.to_string(),
            actual: metadata.domain_id.clone(),
        });
    }
    if metadata.encrypted && metadata.epoch != epoch {
        return Err(EncryptionError::EpochMismatch { expected: epoch, actual: metadata.epoch });
    }
    Ok(())
}

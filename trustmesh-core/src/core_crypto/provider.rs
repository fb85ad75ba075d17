//! The EncryptionProvider contract

use super::envelope::EncryptedData;
use super::errors::EncryptionResult;
use crate::core_context::SecurityContext;

pub trait EncryptionProvider {
    fn encrypt(&self, plaintext: &[u8], context: &SecurityContext) -> EncryptionResult<EncryptedData>;

    /// Fails with a typed error for a foreign domain, or for encrypted data
    /// from another epoch
    fn decrypt(&self, encrypted: &EncryptedData, context: &SecurityContext) -> EncryptionResult<Vec<u8>>;

    /// Non-failing probe with the same matching rules as `decrypt`
    fn can_decrypt(&self, encrypted: &EncryptedData, context: &SecurityContext) -> bool;
}

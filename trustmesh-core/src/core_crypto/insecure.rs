//! Transitional providers that do not encrypt
//!
//! Both still emit the complete envelope with `encrypted: false`, so a secure
//! provider on the other side can refuse the data.

use super::envelope::{check_binding, EncryptedData, EncryptionMetadata, ALGORITHM_NONE};
use super::errors::{EncryptionError, EncryptionResult};
use super::provider::EncryptionProvider;
use crate::core_context::{SecurityContext, TrustDomain, GLOBAL_PARTITION};

fn envelope(plaintext: &[u8], context: &SecurityContext, domain_id: &str) -> EncryptedData {
    EncryptedData {
        context_id: context.context_id(),
        ciphertext: plaintext.to_vec(),
        metadata: EncryptionMetadata {
            domain_id: domain_id.to_string(),
            epoch: context.epoch(),
            key_id: None,
            encrypted: false,
            algorithm: ALGORITHM_NONE.to_string(),
        },
    }
}

/// Bound to one domain; data is carried in the clear
pub struct PassThroughEncryptionProvider {
    domain_id: String,
}

impl PassThroughEncryptionProvider {
    pub fn new(domain_id: impl Into<String>) -> Self {
        Self { domain_id: domain_id.into() }
    }

    fn check(&self, encrypted: &EncryptedData) -> EncryptionResult<()> {
        if encrypted.metadata.domain_id != self.domain_id {
            return Err(EncryptionError::DomainMismatch {
                expected: self.domain_id.clone(),
                actual: encrypted.metadata.domain_id.clone(),
            });
        }
        if encrypted.is_encrypted() {
            return Err(EncryptionError::KeyUnavailable {
                domain: self.domain_id.clone(),
                epoch: encrypted.metadata.epoch,
            });
        }
        Ok(())
    }
}

impl EncryptionProvider for PassThroughEncryptionProvider {
    fn encrypt(&self, plaintext: &[u8], context: &SecurityContext) -> EncryptionResult<EncryptedData> {
        if context.domain_id() != self.domain_id {
            return Err(EncryptionError::DomainMismatch {
                expected: self.domain_id.clone(),
                actual: context.domain_id().to_string(),
            });
        }
        Ok(envelope(plaintext, context, &self.domain_id))
    }

    fn decrypt(&self, encrypted: &EncryptedData, _context: &SecurityContext) -> EncryptionResult<Vec<u8>> {
        self.check(encrypted)?;
        Ok(encrypted.ciphertext.clone())
    }

    fn can_decrypt(&self, encrypted: &EncryptedData, _context: &SecurityContext) -> bool {
        self.check(encrypted).is_ok()
    }
}

/// The unsecured `global` domain
#[derive(Default)]
pub struct PlaintextEncryptionProvider;

impl PlaintextEncryptionProvider {
    fn check(encrypted: &EncryptedData) -> EncryptionResult<()> {
        check_binding(&encrypted.metadata, GLOBAL_PARTITION, 0)?;
        if encrypted.is_encrypted() {
            return Err(EncryptionError::KeyUnavailable {
                domain: GLOBAL_PARTITION.to_string(),
                epoch: encrypted.metadata.epoch,
            });
        }
        Ok(())
    }
}

impl EncryptionProvider for PlaintextEncryptionProvider {
    fn encrypt(&self, plaintext: &[u8], context: &SecurityContext) -> EncryptionResult<EncryptedData> {
        Ok(envelope(plaintext, context, GLOBAL_PARTITION))
    }

    fn decrypt(&self, encrypted: &EncryptedData, _context: &SecurityContext) -> EncryptionResult<Vec<u8>> {
        Self::check(encrypted)?;
        Ok(encrypted.ciphertext.clone())
    }

    fn can_decrypt(&self, encrypted: &EncryptedData, _context: &SecurityContext) -> bool {
        Self::check(encrypted).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_registry::types::{GroupId, UserId};

    #[test]
    fn test_pass_through_keeps_full_envelope() {
        let ctx = SecurityContext::group(GroupId::new("g1"), 3, UserId::new("alice"));
        let provider = PassThroughEncryptionProvider::new("g1");
        let data = provider.encrypt(b"hi", &ctx).unwrap();

        assert_eq!(data.metadata.domain_id, "g1");
        assert_eq!(data.metadata.epoch, 3);
        assert!(!data.metadata.encrypted);
        assert_eq!(data.metadata.algorithm, "none");

        // Unencrypted data is not epoch-bound
        let later = SecurityContext::group(GroupId::new("g1"), 4, UserId::new("alice"));
        assert_eq!(provider.decrypt(&data, &later).unwrap(), b"hi");
    }

    #[test]
    fn test_pass_through_rejects_foreign_domain() {
        let ctx = SecurityContext::group(GroupId::new("g2"), 1, UserId::new("alice"));
        let provider = PassThroughEncryptionProvider::new("g1");
        assert!(provider.encrypt(b"hi", &ctx).is_err());

        let foreign = PassThroughEncryptionProvider::new("g2").encrypt(b"hi", &ctx).unwrap();
        assert!(!provider.can_decrypt(&foreign, &ctx));
        assert!(matches!(provider.decrypt(&foreign, &ctx), Err(EncryptionError::DomainMismatch { .. })));
    }

    #[test]
    fn test_plaintext_global_domain() {
        let ctx = SecurityContext::plaintext();
        let provider = PlaintextEncryptionProvider;
        let data = provider.encrypt(b"hi", &ctx).unwrap();
        assert_eq!(data.context_id, "plaintext");
        assert_eq!(data.metadata.domain_id, "global");
        assert!(provider.can_decrypt(&data, &ctx));

        let mut claimed = data.clone();
        claimed.metadata.encrypted = true;
        assert!(!provider.can_decrypt(&claimed, &ctx));
    }
}

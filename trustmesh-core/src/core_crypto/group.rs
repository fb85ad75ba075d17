//! AES-256-GCM provider for one group
//!
//! Ciphertext layout: `nonce(12) ++ aead(plaintext)`, with the context id as
//! associated data so an envelope re-labelled to another context fails
//! authentication.

use super::envelope::{check_binding, EncryptedData, EncryptionMetadata, ALGORITHM_AES_256_GCM};
use super::errors::{EncryptionError, EncryptionResult};
use super::keyring::{EpochKey, EpochKeyring};
use super::provider::EncryptionProvider;
use crate::core_context::{SecurityContext, TrustDomain};
use crate::core_registry::types::GroupId;
use crate::metrics;
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::OsRng;
use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key, Nonce,
};
use tracing::{debug, info};

const NONCE_LEN: usize = 12;

pub struct GroupEncryptionProvider<K> {
    group_id: GroupId,
    epoch: u64,
    key_id: Option<String>,
    keyring: K,
}

impl<K: EpochKeyring> GroupEncryptionProvider<K> {
    pub fn new(group_id: GroupId, epoch: u64, keyring: K) -> Self {
        Self { group_id, epoch, key_id: None, keyring }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Follow an epoch rotation
    ///
    /// Keys are not derived here; the keyring must already hold the new one.
    pub fn update_epoch(&mut self, new_epoch: u64, new_key_id: Option<String>) {
        info!("Encryption for {} moves from epoch {} to {}", self.group_id, self.epoch, new_epoch);
        self.epoch = new_epoch;
        self.key_id = new_key_id;
    }

    fn require_domain(&self, context: &SecurityContext) -> EncryptionResult<()> {
        if context.domain_id() != self.group_id.as_str() || context.epoch() != self.epoch {
            return Err(EncryptionError::DomainMismatch {
                expected: format!("group:{}:{}", self.group_id, self.epoch),
                actual: context.context_id(),
            });
        }
        Ok(())
    }

    fn check(&self, encrypted: &EncryptedData, context: &SecurityContext) -> EncryptionResult<()> {
        self.require_domain(context)?;
        check_binding(&encrypted.metadata, self.group_id.as_str(), self.epoch)?;
        if !encrypted.is_encrypted() {
            return Err(EncryptionError::InsecurePayload(self.group_id.to_string()));
        }
        Ok(())
    }

    fn key(&self, key_id: Option<&str>) -> EncryptionResult<EpochKey> {
        self.keyring
            .key_for(self.group_id.as_str(), self.epoch, key_id)
            .ok_or_else(|| EncryptionError::KeyUnavailable {
                domain: self.group_id.to_string(),
                epoch: self.epoch,
            })
    }
}

fn cipher(key: &EpochKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.bytes()))
}

impl<K: EpochKeyring> EncryptionProvider for GroupEncryptionProvider<K> {
    fn encrypt(&self, plaintext: &[u8], context: &SecurityContext) -> EncryptionResult<EncryptedData> {
        self.require_domain(context)?;
        let key = self.key(self.key_id.as_deref())?;
        let context_id = context.context_id();

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let sealed = cipher(&key)
            .encrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload { msg: plaintext, aad: context_id.as_bytes() },
            )
            .map_err(|e| EncryptionError::Crypto(e.to_string()))?;

        let mut ciphertext = nonce_bytes.to_vec();
        ciphertext.extend_from_slice(&sealed);

        Ok(EncryptedData {
            context_id,
            ciphertext,
            metadata: EncryptionMetadata {
                domain_id: self.group_id.to_string(),
                epoch: self.epoch,
                key_id: Some(key.key_id().to_string()),
                encrypted: true,
                algorithm: ALGORITHM_AES_256_GCM.to_string(),
            },
        })
    }

    fn decrypt(&self, encrypted: &EncryptedData, context: &SecurityContext) -> EncryptionResult<Vec<u8>> {
        if let Err(e) = self.check(encrypted, context) {
            debug!("Refusing envelope for {}: {}", encrypted.context_id, e);
            metrics::record_decryption_rejected();
            return Err(e);
        }
        if encrypted.ciphertext.len() < NONCE_LEN {
            return Err(EncryptionError::MalformedCiphertext("shorter than nonce".to_string()));
        }

        let key = self.key(encrypted.metadata.key_id.as_deref())?;
        let (nonce, sealed) = encrypted.ciphertext.split_at(NONCE_LEN);
        cipher(&key)
            .decrypt(
                Nonce::from_slice(nonce),
                Payload { msg: sealed, aad: encrypted.context_id.as_bytes() },
            )
            .map_err(|e| EncryptionError::Crypto(e.to_string()))
    }

    fn can_decrypt(&self, encrypted: &EncryptedData, context: &SecurityContext) -> bool {
        self.check(encrypted, context).is_ok()
            && self
                .keyring
                .key_for(self.group_id.as_str(), self.epoch, encrypted.metadata.key_id.as_deref())
                .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_crypto::keyring::MemoryKeyring;
    use crate::core_registry::types::UserId;
    use std::sync::Arc;

    fn setup() -> (GroupEncryptionProvider<Arc<MemoryKeyring>>, Arc<MemoryKeyring>) {
        let keyring = Arc::new(MemoryKeyring::new());
        keyring.generate("g1", 1);
        (GroupEncryptionProvider::new(GroupId::new("g1"), 1, Arc::clone(&keyring)), keyring)
    }

    fn ctx(epoch: u64) -> SecurityContext {
        SecurityContext::group(GroupId::new("g1"), epoch, UserId::new("alice"))
    }

    #[test]
    fn test_encrypt_then_decrypt() {
        let (provider, _) = setup();
        let sealed = provider.encrypt(b"secret", &ctx(1)).unwrap();
        assert_eq!(sealed.context_id, "group:g1:1");
        assert!(sealed.metadata.encrypted);
        assert_ne!(&sealed.ciphertext[NONCE_LEN..], b"secret");
        assert!(provider.can_decrypt(&sealed, &ctx(1)));
        assert_eq!(provider.decrypt(&sealed, &ctx(1)).unwrap(), b"secret");
    }

    #[test]
    fn test_stale_epoch_refused_after_rotation() {
        let (mut provider, keyring) = setup();
        let sealed = provider.encrypt(b"secret", &ctx(1)).unwrap();

        let key_id = keyring.generate("g1", 2);
        provider.update_epoch(2, Some(key_id));

        assert!(!provider.can_decrypt(&sealed, &ctx(2)));
        assert!(matches!(
            provider.decrypt(&sealed, &ctx(2)),
            Err(EncryptionError::EpochMismatch { expected: 2, actual: 1 })
        ));
        let fresh = provider.encrypt(b"secret", &ctx(2)).unwrap();
        assert_eq!(provider.decrypt(&fresh, &ctx(2)).unwrap(), b"secret");
    }

    #[test]
    fn test_misbound_context_is_misuse() {
        let (provider, _) = setup();
        let other = SecurityContext::group(GroupId::new("g2"), 1, UserId::new("alice"));
        assert!(matches!(provider.encrypt(b"x", &other), Err(EncryptionError::DomainMismatch { .. })));
    }

    #[test]
    fn test_insecure_payload_refused() {
        let (provider, _) = setup();
        let mut sealed = provider.encrypt(b"secret", &ctx(1)).unwrap();
        sealed.metadata.encrypted = false;
        assert!(!provider.can_decrypt(&sealed, &ctx(1)));
        assert!(matches!(provider.decrypt(&sealed, &ctx(1)), Err(EncryptionError::InsecurePayload(_))));
    }

    #[test]
    fn test_relabelled_envelope_fails_authentication() {
        let (provider, _) = setup();
        let mut sealed = provider.encrypt(b"secret", &ctx(1)).unwrap();
        sealed.context_id = "group:g1:9".into();
        assert!(matches!(provider.decrypt(&sealed, &ctx(1)), Err(EncryptionError::Crypto(_))));
    }

    #[test]
    fn test_missing_key() {
        let provider = GroupEncryptionProvider::new(GroupId::new("g1"), 1, MemoryKeyring::new());
        assert!(matches!(provider.encrypt(b"x", &ctx(1)), Err(EncryptionError::KeyUnavailable { .. })));
    }
}

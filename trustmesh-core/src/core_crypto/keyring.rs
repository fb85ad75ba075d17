//! Epoch key material
//!
//! Key derivation and distribution belong to a key-management collaborator;
//! providers only look keys up. Key bytes are wiped on drop.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use zeroize::Zeroizing;

pub const EPOCH_KEY_LEN: usize = 32;

#[derive(Clone)]
pub struct EpochKey {
    key_id: String,
    bytes: Zeroizing<[u8; EPOCH_KEY_LEN]>,
}

impl EpochKey {
    pub fn new(key_id: impl Into<String>, bytes: [u8; EPOCH_KEY_LEN]) -> Self {
        Self { key_id: key_id.into(), bytes: Zeroizing::new(bytes) }
    }

    /// Random key with a random id
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), rand::random())
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn bytes(&self) -> &[u8; EPOCH_KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for EpochKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpochKey").field("key_id", &self.key_id).finish_non_exhaustive()
    }
}

pub trait EpochKeyring {
    /// Key for `domain_id` at `epoch`; with `key_id`, only that exact key
    fn key_for(&self, domain_id: &str, epoch: u64, key_id: Option<&str>) -> Option<EpochKey>;
}

impl<K: EpochKeyring + ?Sized> EpochKeyring for &K {
    fn key_for(&self, domain_id: &str, epoch: u64, key_id: Option<&str>) -> Option<EpochKey> {
        (**self).key_for(domain_id, epoch, key_id)
    }
}

impl<K: EpochKeyring + ?Sized> EpochKeyring for Arc<K> {
    fn key_for(&self, domain_id: &str, epoch: u64, key_id: Option<&str>) -> Option<EpochKey> {
        (**self).key_for(domain_id, epoch, key_id)
    }
}

/// Process-local keyring
#[derive(Default)]
pub struct MemoryKeyring {
    keys: RwLock<HashMap<(String, u64), EpochKey>>,
}

impl MemoryKeyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the key for one epoch, replacing any previous one
    pub fn insert(&self, domain_id: &str, epoch: u64, key: EpochKey) {
        self.keys
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert((domain_id.to_string(), epoch), key);
    }

    /// Generate, install and return the id of a fresh key
    pub fn generate(&self, domain_id: &str, epoch: u64) -> String {
        let key = EpochKey::generate();
        let key_id = key.key_id().to_string();
        self.insert(domain_id, epoch, key);
        key_id
    }

    /// Drop every key of `domain_id` older than `epoch`
    pub fn forget_before(&self, domain_id: &str, epoch: u64) -> usize {
        let mut keys = self.keys.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = keys.len();
        keys.retain(|(domain, e), _| domain != domain_id || *e >= epoch);
        before - keys.len()
    }
}

impl EpochKeyring for MemoryKeyring {
    fn key_for(&self, domain_id: &str, epoch: u64, key_id: Option<&str>) -> Option<EpochKey> {
        let keys = self.keys.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        keys.get(&(domain_id.to_string(), epoch))
            .filter(|key| key_id.map_or(true, |id| id == key.key_id()))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_epoch_and_id() {
        let keyring = MemoryKeyring::new();
        let id = keyring.generate("g1", 1);

        assert!(keyring.key_for("g1", 1, None).is_some());
        assert!(keyring.key_for("g1", 1, Some(&id)).is_some());
        assert!(keyring.key_for("g1", 1, Some("other")).is_none());
        assert!(keyring.key_for("g1", 2, None).is_none());
        assert!(keyring.key_for("g2", 1, None).is_none());
    }

    #[test]
    fn test_forget_before() {
        let keyring = MemoryKeyring::new();
        for epoch in 1..=3 {
            keyring.generate("g1", epoch);
        }
        keyring.generate("g2", 1);

        assert_eq!(keyring.forget_before("g1", 3), 2);
        assert!(keyring.key_for("g1", 2, None).is_none());
        assert!(keyring.key_for("g1", 3, None).is_some());
        assert!(keyring.key_for("g2", 1, None).is_some());
    }

    #[test]
    fn test_debug_hides_key_bytes() {
        let key = EpochKey::new("k1", [0xab; 32]);
        let rendered = format!("{:?}", key);
        assert!(rendered.contains("k1"));
        assert!(!rendered.contains("171"));
    }
}

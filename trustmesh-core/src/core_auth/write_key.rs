//! Owner write-key auth provider (`write-key-v1`)
//!
//! Adapts a single owner's 32-byte write key to the provider contract. The
//! proof is a BLAKE3 keyed hash of the message.

use super::errors::AuthResult;
use super::proof::{AuthProof, WRITE_KEY_V1};
use super::provider::AuthProvider;
use crate::core_registry::types::UserId;
use crate::metrics;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

pub const WRITE_KEY_LEN: usize = 32;

pub struct WriteKeyAuthProvider {
    owner_id: UserId,
    write_key: Zeroizing<[u8; WRITE_KEY_LEN]>,
}

impl WriteKeyAuthProvider {
    pub fn new(owner_id: UserId, write_key: [u8; WRITE_KEY_LEN]) -> Self {
        Self { owner_id, write_key: Zeroizing::new(write_key) }
    }

    /// Fresh random write key
    pub fn generate(owner_id: UserId) -> Self {
        Self::new(owner_id, rand::random())
    }

    fn mac(&self, message: &[u8]) -> [u8; 32] {
        *blake3::keyed_hash(&self.write_key, message).as_bytes()
    }
}

impl AuthProvider for WriteKeyAuthProvider {
    fn proof_type(&self) -> &'static str {
        WRITE_KEY_V1
    }

    fn create_auth_proof(&self, message: &[u8]) -> AuthResult<AuthProof> {
        metrics::record_proof_created(WRITE_KEY_V1);
        Ok(AuthProof::new(WRITE_KEY_V1, self.mac(message).to_vec()))
    }

    fn verify_auth_proof(&self, message: &[u8], proof: &AuthProof) -> bool {
        let accepted = proof.is_type(WRITE_KEY_V1) && bool::from(self.mac(message).as_slice().ct_eq(&proof.data));
        metrics::record_proof_verification(accepted);
        accepted
    }

    fn public_identifier(&self) -> String {
        self.owner_id.to_string()
    }
}

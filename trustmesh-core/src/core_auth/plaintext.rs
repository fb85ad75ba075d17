//! Plaintext auth provider (`plaintext-v1`)
//!
//! Development only. Proofs carry the actor id and nothing else; any proof of
//! the right scheme verifies.

use super::errors::AuthResult;
use super::proof::{AuthProof, PLAINTEXT_V1};
use super::provider::AuthProvider;
use crate::core_registry::types::UserId;
use crate::metrics;

pub struct PlaintextAuthProvider {
    actor_id: UserId,
}

impl PlaintextAuthProvider {
    pub fn new(actor_id: UserId) -> Self {
        Self { actor_id }
    }
}

impl AuthProvider for PlaintextAuthProvider {
    fn proof_type(&self) -> &'static str {
        PLAINTEXT_V1
    }

    fn create_auth_proof(&self, _message: &[u8]) -> AuthResult<AuthProof> {
        metrics::record_proof_created(PLAINTEXT_V1);
        Ok(AuthProof::new(PLAINTEXT_V1, self.actor_id.as_str().as_bytes().to_vec()))
    }

    fn verify_auth_proof(&self, _message: &[u8], proof: &AuthProof) -> bool {
        let accepted = proof.is_type(PLAINTEXT_V1);
        metrics::record_proof_verification(accepted);
        accepted
    }

    fn public_identifier(&self) -> String {
        self.actor_id.to_string()
    }
}

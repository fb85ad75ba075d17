//! The AuthProvider contract

use super::errors::AuthResult;
use super::proof::AuthProof;

pub trait AuthProvider {
    /// Scheme tag carried in `AuthProof::proof_type`
    fn proof_type(&self) -> &'static str;

    /// Issue a proof over `message`; fails if the actor may not issue one
    fn create_auth_proof(&self, message: &[u8]) -> AuthResult<AuthProof>;

    /// Never fails. Any malformed, mismatched or unverifiable input is `false`.
    fn verify_auth_proof(&self, message: &[u8], proof: &AuthProof) -> bool;

    fn public_identifier(&self) -> String;
}

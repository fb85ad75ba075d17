//! Group auth provider (`group-auth-v1`)
//!
//! Creation asks the roster for the actor's current role and fails loudly for
//! non-members. Verification trusts nothing in the proof: the claimed role
//! must equal the role the verifier's own roster holds right now, so a
//! demotion or removal invalidates every proof issued under the old role.
//! The same holds for epochs: a proof is only valid for the group's live
//! epoch, and a context left behind by a rotation can neither mint nor accept.

use super::errors::{AuthError, AuthResult};
use super::proof::{decode_group_proof, encode_group_proof, group_digest, AuthProof, ProofMetadata, GROUP_AUTH_V1};
use super::provider::AuthProvider;
use crate::config::AuthConfig;
use crate::core_context::{GroupContext, TrustDomain};
use crate::core_registry::types::{Timestamp, UserId};
use crate::core_registry::GroupStorage;
use crate::metrics;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

/// Why a proof was refused; logged, never returned to a peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    WrongScheme,
    Oversized,
    Malformed,
    ForeignDomain,
    UnknownActor,
    RoleMismatch,
    StaleEpoch,
    DigestMismatch,
    StorageUnavailable,
}

pub struct GroupAuthProvider<S> {
    storage: S,
    context: GroupContext,
    max_proof_bytes: usize,
}

impl<S: GroupStorage> GroupAuthProvider<S> {
    pub fn new(storage: S, context: GroupContext) -> Self {
        Self::with_config(storage, context, &AuthConfig::default())
    }

    pub fn with_config(storage: S, context: GroupContext, config: &AuthConfig) -> Self {
        Self { storage, context, max_proof_bytes: config.max_proof_bytes }
    }

    pub fn context(&self) -> &GroupContext {
        &self.context
    }

    fn check(&self, message: &[u8], proof: &AuthProof) -> Result<(), Rejection> {
        if !proof.is_type(GROUP_AUTH_V1) {
            return Err(Rejection::WrongScheme);
        }
        if proof.data.len() > self.max_proof_bytes {
            return Err(Rejection::Oversized);
        }

        let (digest, claims) = decode_group_proof(&proof.data).ok_or(Rejection::Malformed)?;
        let domain_id = self.context.domain_id();
        if claims.domain_id != domain_id {
            return Err(Rejection::ForeignDomain);
        }

        let member = self
            .storage
            .active_member(self.context.group_id(), &UserId::new(claims.actor_id.as_str()))
            .map_err(|e| {
                debug!("Roster lookup failed during verification: {}", e);
                Rejection::StorageUnavailable
            })?
            .ok_or(Rejection::UnknownActor)?;
        if member.role.as_str() != claims.role {
            return Err(Rejection::RoleMismatch);
        }
        let live_epoch = self.storage.get_group_epoch(self.context.group_id()).map_err(|e| {
            debug!("Epoch lookup failed during verification: {}", e);
            Rejection::StorageUnavailable
        })?;
        if claims.epoch != self.context.epoch() || claims.epoch != live_epoch {
            return Err(Rejection::StaleEpoch);
        }

        let expected = group_digest(message, domain_id, &claims.actor_id, &claims.role);
        if bool::from(expected.as_slice().ct_eq(digest)) {
            Ok(())
        } else {
            Err(Rejection::DigestMismatch)
        }
    }
}

impl<S: GroupStorage> AuthProvider for GroupAuthProvider<S> {
    fn proof_type(&self) -> &'static str {
        GROUP_AUTH_V1
    }

    fn create_auth_proof(&self, message: &[u8]) -> AuthResult<AuthProof> {
        let actor = self.context.member_id();
        let member = self
            .storage
            .active_member(self.context.group_id(), actor)?
            .ok_or_else(|| {
                warn!("Refusing proof for non-member {} of {}", actor, self.context.group_id());
                AuthError::NotAMember {
                    actor: actor.to_string(),
                    domain: self.context.group_id().to_string(),
                }
            })?;

        let live_epoch = self.storage.get_group_epoch(self.context.group_id())?;
        if live_epoch != self.context.epoch() {
            warn!(
                "Refusing proof from {} context at epoch {}, group is at {}",
                self.context.group_id(),
                self.context.epoch(),
                live_epoch
            );
            return Err(AuthError::StaleContext { context_epoch: self.context.epoch(), live_epoch });
        }

        let domain_id = self.context.domain_id();
        let role = member.role.as_str();
        let digest = group_digest(message, domain_id, actor.as_str(), role);
        let claims = ProofMetadata {
            domain_id: domain_id.to_string(),
            actor_id: actor.to_string(),
            role: role.to_string(),
            epoch: self.context.epoch(),
            timestamp: Timestamp::now().as_millis(),
        };

        let data = encode_group_proof(&digest, &claims)?;
        metrics::record_proof_created(GROUP_AUTH_V1);
        Ok(AuthProof::new(GROUP_AUTH_V1, data))
    }

    fn verify_auth_proof(&self, message: &[u8], proof: &AuthProof) -> bool {
        let outcome = self.check(message, proof);
        if let Err(reason) = outcome {
            debug!("Rejected {} proof in {}: {:?}", proof.proof_type, self.context.context_id(), reason);
        }
        metrics::record_proof_verification(outcome.is_ok());
        outcome.is_ok()
    }

    fn public_identifier(&self) -> String {
        format!("{}@{}", self.context.member_id(), self.context.context_id())
    }
}

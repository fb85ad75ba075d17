//! AuthProof and the group proof envelope
//!
//! Group proofs carry `len(u32 BE) ++ digest ++ metadata` where metadata is
//! a JSON object `{domainId, actorId, role, epoch, timestamp}`. Everything in
//! `data` comes off the wire, so decoding returns `None` instead of failing.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const GROUP_AUTH_V1: &str = "group-auth-v1";
pub const WRITE_KEY_V1: &str = "write-key-v1";
pub const PLAINTEXT_V1: &str = "plaintext-v1";

const LENGTH_PREFIX_LEN: usize = 4;

/// Transmissible evidence of authorization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthProof {
    /// Scheme tag
    #[serde(rename = "type")]
    pub proof_type: String,
    pub data: Vec<u8>,
}

impl AuthProof {
    pub fn new(proof_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self { proof_type: proof_type.into(), data }
    }

    pub fn is_type(&self, proof_type: &str) -> bool {
        self.proof_type == proof_type
    }
}

/// Claims embedded in a group proof
///
/// Untrusted on the verifying side; `role` stays a string so an unknown role
/// simply fails the roster comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofMetadata {
    pub domain_id: String,
    pub actor_id: String,
    pub role: String,
    pub epoch: u64,
    pub timestamp: u64,
}

/// `SHA-256(message ++ domain_id ++ actor_id ++ role)`
pub fn group_digest(message: &[u8], domain_id: &str, actor_id: &str, role: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(message);
    hasher.update(domain_id.as_bytes());
    hasher.update(actor_id.as_bytes());
    hasher.update(role.as_bytes());
    hasher.finalize().into()
}

pub fn encode_group_proof(digest: &[u8], metadata: &ProofMetadata) -> serde_json::Result<Vec<u8>> {
    let meta = serde_json::to_vec(metadata)?;
    let mut data = Vec::with_capacity(LENGTH_PREFIX_LEN + digest.len() + meta.len());
    data.extend_from_slice(&(digest.len() as u32).to_be_bytes());
    data.extend_from_slice(digest);
    data.extend_from_slice(&meta);
    Ok(data)
}

/// Split a group proof into digest and metadata
pub fn decode_group_proof(data: &[u8]) -> Option<(&[u8], ProofMetadata)> {
    let prefix: [u8; LENGTH_PREFIX_LEN] = data.get(..LENGTH_PREFIX_LEN)?.try_into().ok()?;
    let declared = u32::from_be_bytes(prefix) as usize;

    let rest = &data[LENGTH_PREFIX_LEN..];
    if declared > rest.len() {
        return None;
    }
    let (digest, meta) = rest.split_at(declared);
    let metadata = serde_json::from_slice(meta).ok()?;
    Some((digest, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ProofMetadata {
        ProofMetadata {
            domain_id: "g1".into(),
            actor_id: "admin1".into(),
            role: "admin".into(),
            epoch: 1,
            timestamp: 1234,
        }
    }

    #[test]
    fn test_envelope_layout() {
        let digest = group_digest(b"hello", "g1", "admin1", "admin");
        let data = encode_group_proof(&digest, &metadata()).unwrap();
        assert_eq!(&data[..4], &[0, 0, 0, 32]);
        assert_eq!(&data[4..36], &digest);

        let json: serde_json::Value = serde_json::from_slice(&data[36..]).unwrap();
        assert_eq!(json["domainId"], "g1");
        assert_eq!(json["actorId"], "admin1");
        assert_eq!(json["epoch"], 1);
    }

    #[test]
    fn test_decode_rejects_short_and_overlong() {
        assert!(decode_group_proof(&[]).is_none());
        assert!(decode_group_proof(&[0, 0, 1]).is_none());
        assert!(decode_group_proof(&[0xff, 0xff, 0xff, 0xff, 1, 2]).is_none());
    }

    #[test]
    fn test_decode_rejects_bad_metadata() {
        let mut data = vec![0, 0, 0, 2, 9, 9];
        data.extend_from_slice(b"{not json");
        assert!(decode_group_proof(&data).is_none());

        let mut data = vec![0, 0, 0, 0];
        data.extend_from_slice(br#"{"domainId":"g1"}"#);
        assert!(decode_group_proof(&data).is_none());
    }

    #[test]
    fn test_digest_binds_every_field() {
        let base = group_digest(b"hello", "g1", "admin1", "admin");
        assert_ne!(base, group_digest(b"hellO", "g1", "admin1", "admin"));
        assert_ne!(base, group_digest(b"hello", "g2", "admin1", "admin"));
        assert_ne!(base, group_digest(b"hello", "g1", "admin2", "admin"));
        assert_ne!(base, group_digest(b"hello", "g1", "admin1", "member"));
    }

    #[test]
    fn test_proof_serializes_with_type_tag() {
        let proof = AuthProof::new(GROUP_AUTH_V1, vec![1, 2]);
        let json = serde_json::to_value(&proof).unwrap();
        assert_eq!(json["type"], "group-auth-v1");
    }
}

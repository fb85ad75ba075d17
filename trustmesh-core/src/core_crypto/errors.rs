//! Error types for the encryption providers

use thiserror::Error;

pub type EncryptionResult<T> = Result<T, EncryptionError>;

#[derive(Debug, Error)]
pub enum EncryptionError {
    /// Envelope or context bound to another trust domain
    #[error("Domain mismatch: expected {expected}, got {actual}")]
    DomainMismatch { expected: String, actual: String },

    /// Encrypted envelope from another epoch
    #[error("Epoch mismatch: expected {expected}, got {actual}")]
    EpochMismatch { expected: u64, actual: u64 },

    /// Envelope marked `encrypted: false` offered to a secure provider
    #[error("Refusing insecure payload for domain {0}")]
    InsecurePayload(String),

    #[error("No key for {domain} at epoch {epoch}")]
    KeyUnavailable { domain: String, epoch: u64 },

    #[error("Cipher failure: {0}")]
    Crypto(String),

    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EncryptionError::EpochMismatch { expected: 2, actual: 1 };
        assert_eq!(err.to_string(), "Epoch mismatch: expected 2, got 1");
    }
}

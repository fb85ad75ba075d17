//! Encryption providers
//!
//! Data leaves a trust domain wrapped in an [`EncryptedData`] envelope bound
//! to one context id, domain and epoch.

pub mod envelope;
pub mod errors;
pub mod group;
pub mod insecure;
pub mod keyring;
pub mod provider;

pub use envelope::{EncryptedData, EncryptionMetadata, ALGORITHM_AES_256_GCM, ALGORITHM_NONE};
pub use errors::{EncryptionError, EncryptionResult};
pub use group::GroupEncryptionProvider;
pub use insecure::{PassThroughEncryptionProvider, PlaintextEncryptionProvider};
pub use keyring::{EpochKey, EpochKeyring, MemoryKeyring, EPOCH_KEY_LEN};
pub use provider::EncryptionProvider;

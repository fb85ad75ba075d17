//! TrustMesh core: the trust-domain layer of a local-first sync engine
//!
//! Decides, for every unit of synchronized data, who may produce it, who may
//! read it and with whom it may be exchanged. The replication engine sees
//! only [`SecurityContext`]s, [`AuthProvider`]s, [`EncryptionProvider`]s and
//! the [`MessageRouter`]; whether data belongs to a device owner, one epoch
//! of a group, or the plaintext development domain never leaks into it.

pub mod config;
pub mod core_auth;
pub mod core_context;
pub mod core_crypto;
pub mod core_epoch;
pub mod core_partition;
pub mod core_registry;
pub mod logging;
pub mod metrics;

pub use config::Config;
pub use core_auth::{AuthError, AuthProof, AuthProvider, GroupAuthProvider};
pub use core_context::{GroupContext, OwnerContext, PlaintextContext, SecurityContext, TrustDomain};
pub use core_crypto::{EncryptedData, EncryptionError, EncryptionProvider, GroupEncryptionProvider};
pub use core_epoch::{Epoch, EpochError, EpochManager, EpochReason};
pub use core_partition::{MessageRouter, PartitionStrategy, RouterError, SyncMessage, SyncVisibility};
pub use core_registry::{GroupId, GroupStorage, RegistryError, Role, SqlRegistry, UserId};
pub use logging::{init_logging, LogLevel};

/// Install logging and describe metrics as `config` asks
pub fn init(config: &Config) -> Result<(), logging::LoggingError> {
    logging::init_logging_with_config(logging::LogConfig::from_config(&config.logging)?)?;
    if config.metrics.enabled {
        crate::metrics::init_metrics();
    }
    Ok(())
}

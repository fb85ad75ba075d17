//! Security contexts
//!
//! A [`SecurityContext`] binds an operation to one trust domain: a device
//! owner, one epoch of a group, or the unsecured plaintext domain. The
//! replication engine only ever talks to the [`TrustDomain`] capabilities.

pub mod node_id;
pub mod types;

pub use node_id::GroupNodeId;
pub use types::{
    ContextKind, ContextMetadata, GroupContext, OwnerContext, PlaintextContext, SecurityContext,
    TrustDomain, GLOBAL_PARTITION, PLAINTEXT_CONTEXT_ID,
};

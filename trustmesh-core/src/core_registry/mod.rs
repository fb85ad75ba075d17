//! Group registry
//!
//! Persistent record of trust-domain membership: groups, membership rows
//! (append-and-close, never rewritten), the append-only epoch history and an
//! audit log. Every other subsystem reads membership and epoch facts through
//! the [`GroupStorage`] view; mutations go through the administrative
//! operations on [`SqlRegistry`] / [`RegistryTx`], each of which runs inside a
//! single immediate transaction.

pub mod errors;
pub mod migrations;
pub mod permissions;
pub mod queries;
pub mod sql_store;
pub mod storage;
pub mod types;

pub use errors::{RegistryError, RegistryResult};
pub use migrations::{migrate, CURRENT_REGISTRY_SCHEMA_VERSION};
pub use permissions::{can_perform_action, Action};
pub use sql_store::{RegistryTx, SqlRegistry};
pub use storage::GroupStorage;
pub use types::{ActivityEntry, Group, GroupId, GroupMember, Role, Timestamp, UserId};

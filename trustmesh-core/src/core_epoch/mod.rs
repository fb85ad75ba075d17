//! Epoch management
//!
//! An epoch is a numbered, monotonically increasing version of a group's
//! membership and key material. All implementations share one contract
//! ([`EpochManager`]); they differ only in how much history they retain.

pub mod errors;
pub mod manager;
pub mod memory;
pub mod registry;
pub mod types;
pub mod volatile;

pub use errors::{EpochError, EpochResult};
pub use manager::{verify_history, EpochManager};
pub use memory::MemoryEpochManager;
pub use registry::RegistryEpochManager;
pub use types::{Epoch, EpochReason};
pub use volatile::VolatileEpochManager;

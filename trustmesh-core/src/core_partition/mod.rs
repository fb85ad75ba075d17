//! Partitioning and sync routing
//!
//! Data from different trust domains, and from different epochs of one
//! group, is never compared, batched or exchanged together.

pub mod errors;
pub mod filter;
pub mod message;
pub mod router;
pub mod strategy;
pub mod visibility;

pub use errors::{RouterError, RouterResult};
pub use filter::{ContentFilter, PassThroughFilter};
pub use message::{batch_by_partition, GroupPartition, MessageBatch, SyncMessage, DEFAULT_PARTITION};
pub use router::{MessageRouter, SyncExchange};
pub use strategy::{DefaultPartitionStrategy, PartitionStrategy};
pub use visibility::{compute_visibility, visibility_at, SyncVisibility};

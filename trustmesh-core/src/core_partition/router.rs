/*
    router.rs - Partition-aware sync message router

    Sits between the replication engine and the sync transport:
    - route(): splits outgoing messages into single-partition batches
    - filter_outgoing(): what a recipient may be sent for a group
    - validate_incoming(): accepts or refuses a sender's batch as a unit

    A SyncExchange pins the group epoch for the length of one exchange so
    every decision in it is made against the same epoch.
*/

use super::errors::{RouterError, RouterResult};
use super::filter::{ContentFilter, PassThroughFilter};
use super::message::{batch_by_partition, GroupPartition, MessageBatch, SyncMessage};
use super::visibility::{compute_visibility, visibility_at, SyncVisibility};
use crate::config::PartitionConfig;
use crate::core_registry::errors::RegistryError;
use crate::core_registry::types::{GroupId, UserId};
use crate::core_registry::GroupStorage;
use crate::metrics;
use tracing::debug;

pub struct MessageRouter<S, F = PassThroughFilter> {
    storage: S,
    filter: F,
    max_batch_size: usize,
}

impl<S: GroupStorage> MessageRouter<S, PassThroughFilter> {
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, &PartitionConfig::default())
    }

    pub fn with_config(storage: S, config: &PartitionConfig) -> Self {
        Self { storage, filter: PassThroughFilter, max_batch_size: config.max_batch_size }
    }
}

impl<S: GroupStorage, F: ContentFilter> MessageRouter<S, F> {
    /// Replace the content filter
    pub fn with_filter<G: ContentFilter>(self, filter: G) -> MessageRouter<S, G> {
        MessageRouter { storage: self.storage, filter, max_batch_size: self.max_batch_size }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Split messages into batches that never mix partitions
    pub fn route(&self, messages: Vec<SyncMessage>) -> Vec<MessageBatch> {
        let batches = batch_by_partition(messages, self.max_batch_size);
        for batch in &batches {
            metrics::record_batch_size(batch.len());
        }
        debug!("Routed {} batches", batches.len());
        batches
    }

    /// Visibility at the group's current epoch
    pub fn visibility(&self, member_id: &UserId, group_id: &GroupId) -> RouterResult<SyncVisibility> {
        Ok(compute_visibility(&self.storage, member_id, group_id)?)
    }

    /// Messages `recipient` may be sent for `group_id`
    ///
    /// Empty for non-members. Messages tagged with another partition are
    /// dropped before the content filter sees them. Untagged (`default`)
    /// messages are kept and reach the filter alongside the live group
    /// partition, so the result is not group-only.
    pub fn filter_outgoing(
        &self,
        messages: Vec<SyncMessage>,
        recipient: &UserId,
        group_id: &GroupId,
    ) -> RouterResult<Vec<SyncMessage>> {
        match self.storage.get_group_epoch(group_id) {
            Ok(epoch) => self.filter_outgoing_at(messages, recipient, group_id, epoch),
            Err(RegistryError::GroupNotFound(_)) => {
                metrics::record_outgoing_filtered(false, messages.len());
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Accept `messages` from `sender` only if it may write at the current epoch
    pub fn validate_incoming(
        &self,
        messages: &[SyncMessage],
        sender: &UserId,
        group_id: &GroupId,
    ) -> RouterResult<()> {
        match self.storage.get_group_epoch(group_id) {
            Ok(epoch) => self.validate_incoming_at(messages, sender, group_id, epoch),
            Err(RegistryError::GroupNotFound(_)) => Err(self.deny_write(sender, group_id, messages.len())),
            Err(e) => Err(e.into()),
        }
    }

    /// Pin the group's current epoch for one sync exchange
    pub fn begin_exchange(&self, group_id: &GroupId) -> RouterResult<SyncExchange<'_, S, F>> {
        let epoch = self.storage.get_group_epoch(group_id)?;
        debug!("Sync exchange for {} pinned to epoch {}", group_id, epoch);
        Ok(SyncExchange { router: self, group_id: group_id.clone(), epoch })
    }

    fn filter_outgoing_at(
        &self,
        messages: Vec<SyncMessage>,
        recipient: &UserId,
        group_id: &GroupId,
        epoch: u64,
    ) -> RouterResult<Vec<SyncMessage>> {
        let offered = messages.len();
        let visibility = visibility_at(&self.storage, recipient, group_id, epoch)?;
        if !visibility.can_read {
            debug!("Withholding {} messages of {} from {}", offered, group_id, recipient);
            metrics::record_outgoing_filtered(false, offered);
            return Ok(Vec::new());
        }

        let live = GroupPartition::new(group_id.clone(), epoch);
        let in_partition: Vec<SyncMessage> = messages
            .into_iter()
            .filter(|m| m.partition.as_ref().map_or(true, |p| *p == live))
            .collect();
        let sent = self.filter.filter(recipient, group_id, in_partition);

        metrics::record_outgoing_filtered(true, sent.len());
        metrics::record_outgoing_filtered(false, offered.saturating_sub(sent.len()));
        Ok(sent)
    }

    fn validate_incoming_at(
        &self,
        messages: &[SyncMessage],
        sender: &UserId,
        group_id: &GroupId,
        epoch: u64,
    ) -> RouterResult<()> {
        let visibility = visibility_at(&self.storage, sender, group_id, epoch)?;
        if !visibility.can_write {
            return Err(self.deny_write(sender, group_id, messages.len()));
        }

        let live = GroupPartition::new(group_id.clone(), epoch);
        if let Some(stray) = messages.iter().filter_map(|m| m.partition.as_ref()).find(|p| **p != live) {
            debug!("Refusing batch from {}: message tagged {}", sender, stray);
            metrics::record_incoming_batch(false);
            return Err(RouterError::PartitionMismatch { expected: live.key(), actual: stray.key() });
        }

        metrics::record_incoming_batch(true);
        Ok(())
    }

    fn deny_write(&self, sender: &UserId, group_id: &GroupId, count: usize) -> RouterError {
        debug!("Refusing batch of {} from {} for {}", count, sender, group_id);
        metrics::record_incoming_batch(false);
        RouterError::WriteDenied { sender: sender.to_string(), group: group_id.to_string() }
    }
}

/// One sync exchange with a fixed epoch
///
/// If the group moves to a new epoch mid-exchange, every later check fails
/// closed instead of silently switching epochs.
pub struct SyncExchange<'r, S, F> {
    router: &'r MessageRouter<S, F>,
    group_id: GroupId,
    epoch: u64,
}

impl<S: GroupStorage, F: ContentFilter> SyncExchange<'_, S, F> {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn partition(&self) -> GroupPartition {
        GroupPartition::new(self.group_id.clone(), self.epoch)
    }

    pub fn visibility(&self, member_id: &UserId) -> RouterResult<SyncVisibility> {
        Ok(visibility_at(&self.router.storage, member_id, &self.group_id, self.epoch)?)
    }

    /// Same as [`MessageRouter::filter_outgoing`] at the pinned epoch; untagged messages pass
    pub fn filter_outgoing(&self, messages: Vec<SyncMessage>, recipient: &UserId) -> RouterResult<Vec<SyncMessage>> {
        self.router.filter_outgoing_at(messages, recipient, &self.group_id, self.epoch)
    }

    pub fn validate_incoming(&self, messages: &[SyncMessage], sender: &UserId) -> RouterResult<()> {
        self.router.validate_incoming_at(messages, sender, &self.group_id, self.epoch)
    }
}

//! Partition-tagged sync messages and batching

use crate::core_registry::types::GroupId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Partition of messages that carry no group tag
pub const DEFAULT_PARTITION: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPartition {
    pub group_id: GroupId,
    pub epoch: u64,
}

impl GroupPartition {
    pub fn new(group_id: GroupId, epoch: u64) -> Self {
        Self { group_id, epoch }
    }

    pub fn key(&self) -> String {
        format!("group:{}:{}", self.group_id, self.epoch)
    }
}

impl fmt::Display for GroupPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group:{}:{}", self.group_id, self.epoch)
    }
}

/// One opaque unit of synchronized data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<GroupPartition>,
    pub payload: Vec<u8>,
}

impl SyncMessage {
    pub fn new(partition: Option<GroupPartition>, payload: Vec<u8>) -> Self {
        Self { partition, payload }
    }

    pub fn for_group(group_id: GroupId, epoch: u64, payload: Vec<u8>) -> Self {
        Self::new(Some(GroupPartition::new(group_id, epoch)), payload)
    }

    pub fn untagged(payload: Vec<u8>) -> Self {
        Self::new(None, payload)
    }

    pub fn partition_key(&self) -> String {
        self.partition
            .as_ref()
            .map(GroupPartition::key)
            .unwrap_or_else(|| DEFAULT_PARTITION.to_string())
    }
}

/// Messages of exactly one partition, reconciled together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBatch {
    pub partition_key: String,
    pub messages: Vec<SyncMessage>,
}

impl MessageBatch {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Group messages by partition key, at most `max_batch_size` per batch
///
/// Batches come out ordered by partition key; message order within a
/// partition is kept. Two partitions never share a batch.
pub fn batch_by_partition(messages: Vec<SyncMessage>, max_batch_size: usize) -> Vec<MessageBatch> {
    let max_batch_size = max_batch_size.max(1);
    let mut partitions: BTreeMap<String, Vec<SyncMessage>> = BTreeMap::new();
    for message in messages {
        partitions.entry(message.partition_key()).or_default().push(message);
    }

    let mut batches = Vec::new();
    for (partition_key, messages) in partitions {
        let mut iter = messages.into_iter().peekable();
        while iter.peek().is_some() {
            batches.push(MessageBatch {
                partition_key: partition_key.clone(),
                messages: iter.by_ref().take(max_batch_size).collect(),
            });
        }
    }
    batches
}

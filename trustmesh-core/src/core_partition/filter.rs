//! Content filters applied after the visibility gate
//!
//! Payloads are opaque ciphertext at this layer, so the bundled filter passes
//! everything through. A content-aware filter plugs in here once messages
//! carry embedded group metadata.

use super::message::SyncMessage;
use crate::core_registry::types::{GroupId, UserId};

pub trait ContentFilter {
    fn filter(&self, recipient: &UserId, group_id: &GroupId, messages: Vec<SyncMessage>) -> Vec<SyncMessage>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughFilter;

impl ContentFilter for PassThroughFilter {
    fn filter(&self, _recipient: &UserId, _group_id: &GroupId, messages: Vec<SyncMessage>) -> Vec<SyncMessage> {
        messages
    }
}

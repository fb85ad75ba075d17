//! Per-member sync visibility

use crate::core_registry::errors::{RegistryError, RegistryResult};
use crate::core_registry::types::{GroupId, UserId};
use crate::core_registry::GroupStorage;
use serde::{Deserialize, Serialize};

/// What a member may exchange with a group
///
/// Members only ever see the live epoch; `epoch_range` is `(current, current)`
/// when access is granted and absent otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncVisibility {
    pub can_read: bool,
    pub can_write: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch_range: Option<(u64, u64)>,
}

impl SyncVisibility {
    pub fn denied() -> Self {
        Self { can_read: false, can_write: false, epoch_range: None }
    }

    pub fn live(epoch: u64) -> Self {
        Self { can_read: true, can_write: true, epoch_range: Some((epoch, epoch)) }
    }
}

/// Visibility at the group's current epoch
pub fn compute_visibility<S: GroupStorage>(
    storage: &S,
    member_id: &UserId,
    group_id: &GroupId,
) -> RegistryResult<SyncVisibility> {
    match storage.get_group_epoch(group_id) {
        Ok(epoch) => visibility_at(storage, member_id, group_id, epoch),
        Err(RegistryError::GroupNotFound(_)) => Ok(SyncVisibility::denied()),
        Err(e) => Err(e),
    }
}

/// Visibility pinned to `epoch`; denied once the group has moved past it
pub fn visibility_at<S: GroupStorage>(
    storage: &S,
    member_id: &UserId,
    group_id: &GroupId,
    epoch: u64,
) -> RegistryResult<SyncVisibility> {
    if storage.validate_group_access(member_id, group_id, epoch)? {
        Ok(SyncVisibility::live(epoch))
    } else {
        Ok(SyncVisibility::denied())
    }
}

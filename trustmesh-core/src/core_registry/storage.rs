//! The query surface the sync and auth layers read the registry through
//!
//! Every method returns a `RegistryResult`; none of them panic on missing
//! rows. Implemented by the pooled [`SqlRegistry`](super::SqlRegistry) and by
//! [`RegistryTx`](super::RegistryTx), so the same checks can run inside a
//! caller's ambient transaction.

use super::errors::{RegistryError, RegistryResult};
use super::permissions::{can_perform_action, Action};
use super::types::{GroupId, GroupMember, UserId};
use std::sync::Arc;

pub trait GroupStorage {
    /// Number of the group's open epoch
    fn get_group_epoch(&self, group_id: &GroupId) -> RegistryResult<u64>;

    /// The live membership record for a user, if any
    fn active_member(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> RegistryResult<Option<GroupMember>>;

    /// Append an audit row at the group's current epoch
    fn record_group_operation(
        &self,
        group_id: &GroupId,
        actor_id: &UserId,
        action: &str,
        target_id: Option<&UserId>,
    ) -> RegistryResult<()>;

    /// Whether `actor_id` may access `group_id` at `epoch`
    ///
    /// Only the open epoch is accessible. Unknown groups deny rather than fail.
    fn validate_group_access(
        &self,
        actor_id: &UserId,
        group_id: &GroupId,
        epoch: u64,
    ) -> RegistryResult<bool> {
        let current = match self.get_group_epoch(group_id) {
            Ok(current) => current,
            Err(RegistryError::GroupNotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        if epoch != current {
            return Ok(false);
        }

        Ok(self
            .active_member(group_id, actor_id)?
            .map(|m| m.epoch_joined <= epoch)
            .unwrap_or(false))
    }

    /// Whether `actor_id` may perform `action`, against `target_id` where the
    /// action needs one
    fn validate_group_operation(
        &self,
        actor_id: &UserId,
        action: Action,
        group_id: &GroupId,
        target_id: Option<&UserId>,
    ) -> RegistryResult<bool> {
        let actor = match self.active_member(group_id, actor_id)? {
            Some(actor) => actor,
            None => return Ok(false),
        };
        if !can_perform_action(&actor, action) {
            return Ok(false);
        }

        if action.requires_target() {
            return match target_id {
                Some(target) => Ok(self.active_member(group_id, target)?.is_some()),
                None => Ok(false),
            };
        }

        Ok(true)
    }
}

impl<T: GroupStorage + ?Sized> GroupStorage for &T {
    fn get_group_epoch(&self, group_id: &GroupId) -> RegistryResult<u64> {
        (**self).get_group_epoch(group_id)
    }

    fn active_member(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> RegistryResult<Option<GroupMember>> {
        (**self).active_member(group_id, user_id)
    }

    fn record_group_operation(
        &self,
        group_id: &GroupId,
        actor_id: &UserId,
        action: &str,
        target_id: Option<&UserId>,
    ) -> RegistryResult<()> {
        (**self).record_group_operation(group_id, actor_id, action, target_id)
    }
}

impl<T: GroupStorage + ?Sized> GroupStorage for Arc<T> {
    fn get_group_epoch(&self, group_id: &GroupId) -> RegistryResult<u64> {
        (**self).get_group_epoch(group_id)
    }

    fn active_member(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> RegistryResult<Option<GroupMember>> {
        (**self).active_member(group_id, user_id)
    }

    fn record_group_operation(
        &self,
        group_id: &GroupId,
        actor_id: &UserId,
        action: &str,
        target_id: Option<&UserId>,
    ) -> RegistryResult<()> {
        (**self).record_group_operation(group_id, actor_id, action, target_id)
    }
}

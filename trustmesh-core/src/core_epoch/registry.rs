//! Epoch manager over the persistent registry

use super::errors::{EpochError, EpochResult};
use super::manager::EpochManager;
use super::types::{Epoch, EpochReason};
use crate::core_registry::types::{GroupId, UserId};
use crate::core_registry::SqlRegistry;
use std::sync::Arc;

/// One group's epoch history as stored in a [`SqlRegistry`]
///
/// Every increment runs in its own immediate transaction, so concurrent
/// increments against the same database file serialize and never produce a
/// duplicate number.
pub struct RegistryEpochManager {
    registry: Arc<SqlRegistry>,
    group_id: GroupId,
}

impl RegistryEpochManager {
    pub fn new(registry: Arc<SqlRegistry>, group_id: GroupId) -> Self {
        Self { registry, group_id }
    }

    pub fn group_id(&self) -> &GroupId {
        &self.group_id
    }
}

impl EpochManager for RegistryEpochManager {
    fn current_epoch(&self) -> EpochResult<Epoch> {
        self.registry.transaction(|tx| {
            tx.open_epoch(&self.group_id)?
                .ok_or_else(|| EpochError::InvariantViolation(format!("group {} has no open epoch", self.group_id)))
        })
    }

    fn increment_epoch(&self, reason: EpochReason, initiated_by: &UserId) -> EpochResult<Epoch> {
        self.registry.transaction(|tx| {
            Ok(tx.increment_epoch(&self.group_id, reason, initiated_by, None, None)?)
        })
    }

    fn increment_epoch_from(
        &self,
        expected: u64,
        reason: EpochReason,
        initiated_by: &UserId,
    ) -> EpochResult<Epoch> {
        self.registry.transaction(|tx| {
            let open = tx
                .open_epoch(&self.group_id)?
                .ok_or_else(|| EpochError::InvariantViolation(format!("group {} has no open epoch", self.group_id)))?;
            if open.epoch_number != expected {
                return Err(EpochError::Conflict { expected, actual: open.epoch_number });
            }
            Ok(tx.increment_epoch(&self.group_id, reason, initiated_by, None, Some(expected))?)
        })
    }

    fn is_valid_epoch(&self, number: u64) -> EpochResult<bool> {
        let current = self.current_epoch()?.epoch_number;
        Ok(number >= 1 && number <= current)
    }

    fn get_epoch(&self, number: u64) -> EpochResult<Epoch> {
        self.registry
            .transaction(|tx| Ok::<_, EpochError>(tx.epoch(&self.group_id, number)?))?
            .ok_or(EpochError::NotFound(number))
    }

    fn get_epoch_history(&self) -> EpochResult<Vec<Epoch>> {
        Ok(self.registry.epoch_history(&self.group_id)?)
    }
}

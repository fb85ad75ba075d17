//! In-memory, history-backed epoch manager
//!
//! Epochs live in an append-only arena indexed by number (`epochs[n - 1]`).
//! "Current" is derived from the arena rather than stored separately.

use super::errors::{EpochError, EpochResult};
use super::manager::EpochManager;
use super::types::{Epoch, EpochReason};
use crate::core_registry::types::{GroupId, Timestamp, UserId};
use crate::metrics;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

pub struct MemoryEpochManager {
    group_id: GroupId,
    epochs: Mutex<Vec<Epoch>>,
}

impl MemoryEpochManager {
    /// Start a history at epoch 1 (reason `initial`)
    pub fn new(group_id: GroupId, created_by: UserId) -> Self {
        let initial = Epoch::initial(group_id.clone(), created_by);
        Self { group_id, epochs: Mutex::new(vec![initial]) }
    }

    pub fn group_id(&self) -> &GroupId {
        &self.group_id
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Epoch>> {
        self.epochs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn open_epoch(epochs: &[Epoch]) -> EpochResult<&Epoch> {
        epochs
            .last()
            .filter(|e| e.is_open())
            .ok_or_else(|| EpochError::InvariantViolation("no open epoch".to_string()))
    }

    fn advance(
        &self,
        epochs: &mut Vec<Epoch>,
        reason: EpochReason,
        initiated_by: &UserId,
    ) -> EpochResult<Epoch> {
        let now = Timestamp::now();
        let mut next = Self::open_epoch(epochs)?.successor(reason, initiated_by.clone(), None);
        next.started_at = now;

        if let Some(open) = epochs.last_mut() {
            open.ended_at = Some(now);
        }
        epochs.push(next.clone());

        metrics::record_epoch_increment(reason);
        info!("Group {} advanced to epoch {} ({})", self.group_id, next.epoch_number, reason);
        Ok(next)
    }
}

impl EpochManager for MemoryEpochManager {
    fn current_epoch(&self) -> EpochResult<Epoch> {
        Self::open_epoch(&self.lock()).cloned()
    }

    fn increment_epoch(&self, reason: EpochReason, initiated_by: &UserId) -> EpochResult<Epoch> {
        let mut epochs = self.lock();
        self.advance(&mut epochs, reason, initiated_by)
    }

    fn increment_epoch_from(
        &self,
        expected: u64,
        reason: EpochReason,
        initiated_by: &UserId,
    ) -> EpochResult<Epoch> {
        let mut epochs = self.lock();
        let actual = Self::open_epoch(&epochs)?.epoch_number;
        if actual != expected {
            return Err(EpochError::Conflict { expected, actual });
        }
        self.advance(&mut epochs, reason, initiated_by)
    }

    fn is_valid_epoch(&self, number: u64) -> EpochResult<bool> {
        let current = self.current_epoch()?.epoch_number;
        Ok(number >= 1 && number <= current)
    }

    fn get_epoch(&self, number: u64) -> EpochResult<Epoch> {
        let index = number.checked_sub(1).ok_or(EpochError::NotFound(number))?;
        self.lock().get(index as usize).cloned().ok_or(EpochError::NotFound(number))
    }

    fn get_epoch_history(&self) -> EpochResult<Vec<Epoch>> {
        Ok(self.lock().clone())
    }
}

//! Current-epoch-only epoch manager
//!
//! Retains nothing but the open epoch. `is_valid_epoch(n)` is true only for
//! the current number, `get_epoch` finds only the current epoch, and the
//! history has a single entry. This is a narrowed contract for short-lived
//! contexts that never need to look back, not a lossy history.

use super::errors::{EpochError, EpochResult};
use super::manager::EpochManager;
use super::types::{Epoch, EpochReason};
use crate::core_registry::types::{GroupId, Timestamp, UserId};
use crate::metrics;
use std::sync::{Mutex, MutexGuard};

pub struct VolatileEpochManager {
    current: Mutex<Epoch>,
}

impl VolatileEpochManager {
    pub fn new(group_id: GroupId, created_by: UserId) -> Self {
        Self { current: Mutex::new(Epoch::initial(group_id, created_by)) }
    }

    /// Resume from an epoch learned elsewhere
    pub fn resume(epoch: Epoch) -> Self {
        Self { current: Mutex::new(epoch) }
    }

    fn lock(&self) -> MutexGuard<'_, Epoch> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn advance(current: &mut Epoch, reason: EpochReason, initiated_by: &UserId) -> Epoch {
        let mut next = current.successor(reason, initiated_by.clone(), None);
        next.started_at = Timestamp::now();
        *current = next.clone();
        metrics::record_epoch_increment(reason);
        next
    }
}

impl EpochManager for VolatileEpochManager {
    fn current_epoch(&self) -> EpochResult<Epoch> {
        Ok(self.lock().clone())
    }

    fn increment_epoch(&self, reason: EpochReason, initiated_by: &UserId) -> EpochResult<Epoch> {
        Ok(Self::advance(&mut self.lock(), reason, initiated_by))
    }

    fn increment_epoch_from(
        &self,
        expected: u64,
        reason: EpochReason,
        initiated_by: &UserId,
    ) -> EpochResult<Epoch> {
        let mut current = self.lock();
        if current.epoch_number != expected {
            return Err(EpochError::Conflict { expected, actual: current.epoch_number });
        }
        Ok(Self::advance(&mut current, reason, initiated_by))
    }

    fn is_valid_epoch(&self, number: u64) -> EpochResult<bool> {
        Ok(self.lock().epoch_number == number)
    }

    fn get_epoch(&self, number: u64) -> EpochResult<Epoch> {
        let current = self.lock();
        if current.epoch_number == number {
            Ok(current.clone())
        } else {
            Err(EpochError::NotFound(number))
        }
    }

    fn get_epoch_history(&self) -> EpochResult<Vec<Epoch>> {
        Ok(vec![self.lock().clone()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_current_epoch_is_valid() {
        let m = VolatileEpochManager::new(GroupId::new("g"), UserId::new("a"));
        m.increment_epoch(EpochReason::KeyRotation, &UserId::new("a")).unwrap();

        assert!(m.is_valid_epoch(2).unwrap());
        assert!(!m.is_valid_epoch(1).unwrap());
        assert!(matches!(m.get_epoch(1), Err(EpochError::NotFound(1))));
        assert_eq!(m.get_epoch_history().unwrap().len(), 1);
    }

    #[test]
    fn test_resume_and_conflict() {
        let mut epoch = Epoch::initial(GroupId::new("g"), UserId::new("a"));
        epoch.epoch_number = 4;
        let m = VolatileEpochManager::resume(epoch);

        let err = m.increment_epoch_from(3, EpochReason::Manual, &UserId::new("a")).unwrap_err();
        assert!(err.is_conflict());
        let next = m.increment_epoch_from(4, EpochReason::Manual, &UserId::new("a")).unwrap();
        assert_eq!(next.epoch_number, 5);
        assert!(next.is_open());
    }
}

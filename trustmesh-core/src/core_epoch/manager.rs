//! The EpochManager contract and the history invariant checker

use super::errors::{EpochError, EpochResult};
use super::types::{Epoch, EpochReason};
use crate::core_registry::types::UserId;

/// Owns the monotonic epoch history of one group
///
/// `increment_epoch` is the only state transition: it closes the open epoch
/// and appends its successor as one atomic step.
pub trait EpochManager {
    /// The single open epoch
    fn current_epoch(&self) -> EpochResult<Epoch>;

    /// Close the open epoch and open `current + 1`
    fn increment_epoch(&self, reason: EpochReason, initiated_by: &UserId) -> EpochResult<Epoch>;

    /// Like `increment_epoch`, but fails with `EpochError::Conflict` unless
    /// `expected` is still the open epoch
    fn increment_epoch_from(
        &self,
        expected: u64,
        reason: EpochReason,
        initiated_by: &UserId,
    ) -> EpochResult<Epoch>;

    /// Whether epoch `number` exists in the retained history
    fn is_valid_epoch(&self, number: u64) -> EpochResult<bool>;

    fn get_epoch(&self, number: u64) -> EpochResult<Epoch>;

    /// Retained epochs ascending by number
    fn get_epoch_history(&self) -> EpochResult<Vec<Epoch>>;
}

/// Check a complete epoch history
///
/// Numbers start at 1 and increase by exactly 1, every epoch belongs to the
/// same group, and exactly one epoch (the last) is open.
pub fn verify_history(epochs: &[Epoch]) -> EpochResult<()> {
    let first = epochs
        .first()
        .ok_or_else(|| EpochError::InvariantViolation("history is empty".to_string()))?;

    if first.epoch_number != 1 || first.reason != EpochReason::Initial {
        return Err(EpochError::InvariantViolation(format!(
            "history starts at epoch {} ({})",
            first.epoch_number, first.reason
        )));
    }

    for pair in epochs.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.group_id != first.group_id {
            return Err(EpochError::InvariantViolation(format!(
                "epoch {} belongs to group {}",
                next.epoch_number, next.group_id
            )));
        }
        if next.epoch_number != prev.epoch_number + 1 {
            return Err(EpochError::InvariantViolation(format!(
                "gap between epoch {} and {}",
                prev.epoch_number, next.epoch_number
            )));
        }
        if prev.is_open() {
            return Err(EpochError::InvariantViolation(format!(
                "epoch {} is open but not the latest",
                prev.epoch_number
            )));
        }
    }

    if epochs.last().map(Epoch::is_open) != Some(true) {
        return Err(EpochError::InvariantViolation("latest epoch is closed".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_registry::types::{GroupId, Timestamp};

    fn chain(len: u64) -> Vec<Epoch> {
        let mut epochs = vec![Epoch::initial(GroupId::new("g"), UserId::new("a"))];
        for _ in 1..len {
            let last = epochs.last_mut().unwrap();
            last.ended_at = Some(Timestamp::now());
            let next = last.successor(EpochReason::Manual, UserId::new("a"), None);
            epochs.push(next);
        }
        epochs
    }

    #[test]
    fn test_valid_history() {
        assert!(verify_history(&chain(1)).is_ok());
        assert!(verify_history(&chain(5)).is_ok());
    }

    #[test]
    fn test_empty_history_rejected() {
        assert!(matches!(verify_history(&[]), Err(EpochError::InvariantViolation(_))));
    }

    #[test]
    fn test_gap_rejected() {
        let mut epochs = chain(3);
        epochs.remove(1);
        assert!(verify_history(&epochs).is_err());
    }

    #[test]
    fn test_two_open_epochs_rejected() {
        let mut epochs = chain(3);
        epochs[1].ended_at = None;
        assert!(verify_history(&epochs).is_err());
    }

    #[test]
    fn test_closed_tail_rejected() {
        let mut epochs = chain(2);
        epochs[1].ended_at = Some(Timestamp::now());
        assert!(verify_history(&epochs).is_err());
    }
}

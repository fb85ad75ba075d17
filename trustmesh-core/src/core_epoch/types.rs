//! Epoch records

use crate::core_registry::types::{GroupId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an epoch was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpochReason {
    /// First epoch of a new group
    Initial,
    /// A member was removed and must lose access to new data
    MemberRemoved,
    /// Key material was rotated
    KeyRotation,
    /// Administrator-triggered bump
    Manual,
}

impl EpochReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EpochReason::Initial => "initial",
            EpochReason::MemberRemoved => "member_removed",
            EpochReason::KeyRotation => "key_rotation",
            EpochReason::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initial" => Some(EpochReason::Initial),
            "member_removed" => Some(EpochReason::MemberRemoved),
            "key_rotation" => Some(EpochReason::KeyRotation),
            "manual" => Some(EpochReason::Manual),
            _ => None,
        }
    }
}

impl fmt::Display for EpochReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A versioned key/membership epoch of a group
///
/// Epoch rows are append-only. The only change ever made to a stored epoch is
/// setting `ended_at` when its successor opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Epoch {
    pub id: String,
    pub group_id: GroupId,
    pub epoch_number: u64,
    pub started_at: Timestamp,
    pub ended_at: Option<Timestamp>,
    pub reason: EpochReason,
    pub initiated_by: UserId,
    pub key_hash: Option<String>,
}

impl Epoch {
    /// The opening epoch of a group
    pub fn initial(group_id: GroupId, initiated_by: UserId) -> Self {
        Self::opened(group_id, 1, EpochReason::Initial, initiated_by, None)
    }

    /// A freshly opened epoch
    pub fn opened(
        group_id: GroupId,
        epoch_number: u64,
        reason: EpochReason,
        initiated_by: UserId,
        key_hash: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            group_id,
            epoch_number,
            started_at: Timestamp::now(),
            ended_at: None,
            reason,
            initiated_by,
            key_hash,
        }
    }

    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// The epoch that succeeds this one
    pub fn successor(
        &self,
        reason: EpochReason,
        initiated_by: UserId,
        key_hash: Option<String>,
    ) -> Self {
        Self::opened(self.group_id.clone(), self.epoch_number + 1, reason, initiated_by, key_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_names() {
        for reason in [
            EpochReason::Initial,
            EpochReason::MemberRemoved,
            EpochReason::KeyRotation,
            EpochReason::Manual,
        ] {
            assert_eq!(EpochReason::parse(reason.as_str()), Some(reason));
        }
        assert_eq!(EpochReason::parse("bogus"), None);
    }

    #[test]
    fn test_initial_epoch() {
        let epoch = Epoch::initial(GroupId::new("g"), UserId::new("admin1"));
        assert_eq!(epoch.epoch_number, 1);
        assert_eq!(epoch.reason, EpochReason::Initial);
        assert!(epoch.is_open());
    }

    #[test]
    fn test_successor_numbering() {
        let first = Epoch::initial(GroupId::new("g"), UserId::new("a"));
        let second = first.successor(EpochReason::Manual, UserId::new("a"), None);
        assert_eq!(second.epoch_number, 2);
        assert_eq!(second.group_id, first.group_id);
        assert_ne!(second.id, first.id);
    }
}

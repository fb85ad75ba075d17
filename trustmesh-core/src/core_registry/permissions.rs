//! Role-based permission table for group operations

use super::types::{GroupMember, Role};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An operation a member may attempt inside a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Read,
    Write,
    AddMember,
    RemoveMember,
    ChangeRole,
    RotateKeys,
    IncrementEpoch,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::AddMember => "addMember",
            Action::RemoveMember => "removeMember",
            Action::ChangeRole => "changeRole",
            Action::RotateKeys => "rotateKeys",
            Action::IncrementEpoch => "incrementEpoch",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "read" => Some(Action::Read),
            "write" => Some(Action::Write),
            "addMember" => Some(Action::AddMember),
            "removeMember" => Some(Action::RemoveMember),
            "changeRole" => Some(Action::ChangeRole),
            "rotateKeys" => Some(Action::RotateKeys),
            "incrementEpoch" => Some(Action::IncrementEpoch),
            _ => None,
        }
    }

    /// Actions that act on another member's record
    pub fn requires_target(&self) -> bool {
        matches!(self, Action::RemoveMember | Action::ChangeRole)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Role {
    /// Check if this role may perform the action
    pub fn can_perform(&self, action: Action) -> bool {
        match self {
            Role::Admin => true,
            Role::Member => matches!(action, Action::Read | Action::Write),
        }
    }
}

/// Check whether a membership record grants the action
///
/// Closed records grant nothing.
pub fn can_perform_action(member: &GroupMember, action: Action) -> bool {
    member.is_active() && member.role.can_perform(action)
}

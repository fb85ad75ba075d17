/*
    types.rs - Persisted trust-domain records

    Defines:
    - Timestamps
    - Group and user identifiers
    - Roles
    - Group, GroupMember and audit rows
*/

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Unix timestamp in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Create a timestamp representing the current time
    pub fn now() -> Self {
        let duration = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Timestamp(duration.as_millis() as u64)
    }

    /// Create a timestamp from milliseconds since epoch
    pub fn from_millis(millis: u64) -> Self {
        Timestamp(millis)
    }

    /// Get milliseconds since epoch
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub(crate) fn as_sql(&self) -> i64 {
        self.0 as i64
    }

    pub(crate) fn from_sql(value: i64) -> Self {
        Timestamp(value.max(0) as u64)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a group trust domain
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        GroupId(id.into())
    }

    pub fn generate() -> Self {
        GroupId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a user (actor)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role of a member in a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full control over membership, roles and epochs
    Admin,
    /// Regular member (read and write)
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "member" => Some(Role::Member),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A multi-member trust domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    /// Number of the single open epoch
    pub current_epoch: u64,
    pub created_at: Timestamp,
    pub created_by: UserId,
}

/// Membership record
///
/// Rows are never edited in place except to close them. A role change closes
/// the current row and inserts a replacement, so the history of which role a
/// member held in which epoch survives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: String,
    pub user_id: UserId,
    pub group_id: GroupId,
    pub role: Role,
    pub public_key: Vec<u8>,
    pub joined_at: Timestamp,
    pub left_at: Option<Timestamp>,
    pub epoch_joined: u64,
    pub epoch_left: Option<u64>,
}

impl GroupMember {
    /// Whether this is the live record for the member
    pub fn is_active(&self) -> bool {
        self.left_at.is_none()
    }
}

/// One row of the group audit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: i64,
    pub group_id: GroupId,
    pub actor_id: UserId,
    pub action: String,
    pub target_id: Option<UserId>,
    pub epoch_number: u64,
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_names() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("member"), Some(Role::Member));
        assert_eq!(Role::parse("Admin"), None);
        assert_eq!(Role::Member.to_string(), "member");
    }

    #[test]
    fn test_role_serde_is_lowercase() {
        let json = serde_json::to_string(&Role::Admin).unwrap();
        assert_eq!(json, "\"admin\"");
    }

    #[test]
    fn test_timestamp_sql_clamps_negative() {
        assert_eq!(Timestamp::from_sql(-5), Timestamp(0));
        assert_eq!(Timestamp::from_millis(42).as_sql(), 42);
    }

    #[test]
    fn test_generated_group_ids_differ() {
        assert_ne!(GroupId::generate(), GroupId::generate());
    }
}

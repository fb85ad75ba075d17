//! Row-level queries shared by the pooled store and ambient transactions
//!
//! Every function takes a plain `&Connection`; a `rusqlite::Transaction`
//! derefs to one, so the same code runs inside or outside a transaction.

use super::errors::{RegistryError, RegistryResult};
use super::types::{ActivityEntry, Group, GroupId, GroupMember, Role, Timestamp, UserId};
use crate::core_epoch::types::{Epoch, EpochReason};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

const GROUP_COLUMNS: &str = "id, name, current_epoch, created_at, created_by";
const MEMBER_COLUMNS: &str =
    "id, group_id, user_id, role, public_key, joined_at, left_at, epoch_joined, epoch_left";
const EPOCH_COLUMNS: &str =
    "id, group_id, epoch_number, started_at, ended_at, reason, initiated_by, key_hash";

fn conversion_error(index: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, message.into())
}

fn row_to_group(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: GroupId::new(row.get::<_, String>(0)?),
        name: row.get(1)?,
        current_epoch: row.get::<_, i64>(2)? as u64,
        created_at: Timestamp::from_sql(row.get(3)?),
        created_by: UserId::new(row.get::<_, String>(4)?),
    })
}

fn row_to_member(row: &Row<'_>) -> rusqlite::Result<GroupMember> {
    let role_str: String = row.get(3)?;
    let role =
        Role::parse(&role_str).ok_or_else(|| conversion_error(3, format!("unknown role {}", role_str)))?;

    Ok(GroupMember {
        id: row.get(0)?,
        group_id: GroupId::new(row.get::<_, String>(1)?),
        user_id: UserId::new(row.get::<_, String>(2)?),
        role,
        public_key: row.get(4)?,
        joined_at: Timestamp::from_sql(row.get(5)?),
        left_at: row.get::<_, Option<i64>>(6)?.map(Timestamp::from_sql),
        epoch_joined: row.get::<_, i64>(7)? as u64,
        epoch_left: row.get::<_, Option<i64>>(8)?.map(|n| n as u64),
    })
}

fn row_to_epoch(row: &Row<'_>) -> rusqlite::Result<Epoch> {
    let reason_str: String = row.get(5)?;
    let reason = EpochReason::parse(&reason_str)
        .ok_or_else(|| conversion_error(5, format!("unknown epoch reason {}", reason_str)))?;

    Ok(Epoch {
        id: row.get(0)?,
        group_id: GroupId::new(row.get::<_, String>(1)?),
        epoch_number: row.get::<_, i64>(2)? as u64,
        started_at: Timestamp::from_sql(row.get(3)?),
        ended_at: row.get::<_, Option<i64>>(4)?.map(Timestamp::from_sql),
        reason,
        initiated_by: UserId::new(row.get::<_, String>(6)?),
        key_hash: row.get(7)?,
    })
}

// ===== Groups =====

pub fn insert_group(conn: &Connection, group: &Group) -> RegistryResult<()> {
    conn.execute(
        "INSERT INTO groups (id, name, current_epoch, created_at, created_by) VALUES (?, ?, ?, ?, ?)",
        params![
            group.id.as_str(),
            &group.name,
            group.current_epoch as i64,
            group.created_at.as_sql(),
            group.created_by.as_str(),
        ],
    )?;
    Ok(())
}

pub fn load_group(conn: &Connection, group_id: &GroupId) -> RegistryResult<Option<Group>> {
    let group = conn
        .query_row(
            &format!("SELECT {} FROM groups WHERE id = ?", GROUP_COLUMNS),
            params![group_id.as_str()],
            row_to_group,
        )
        .optional()?;
    Ok(group)
}

pub fn require_group(conn: &Connection, group_id: &GroupId) -> RegistryResult<Group> {
    load_group(conn, group_id)?.ok_or_else(|| RegistryError::GroupNotFound(group_id.to_string()))
}

// ===== Members =====

pub fn insert_member(conn: &Connection, member: &GroupMember) -> RegistryResult<()> {
    conn.execute(
        "INSERT INTO group_members
            (id, group_id, user_id, role, public_key, joined_at, left_at, epoch_joined, epoch_left)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            &member.id,
            member.group_id.as_str(),
            member.user_id.as_str(),
            member.role.as_str(),
            &member.public_key,
            member.joined_at.as_sql(),
            member.left_at.map(|t| t.as_sql()),
            member.epoch_joined as i64,
            member.epoch_left.map(|n| n as i64),
        ],
    )?;
    Ok(())
}

/// Soft-close a live membership record
pub fn close_member(
    conn: &Connection,
    member_id: &str,
    left_at: Timestamp,
    epoch_left: u64,
) -> RegistryResult<()> {
    let updated = conn.execute(
        "UPDATE group_members SET left_at = ?, epoch_left = ? WHERE id = ? AND left_at IS NULL",
        params![left_at.as_sql(), epoch_left as i64, member_id],
    )?;
    if updated != 1 {
        return Err(RegistryError::Conflict(format!(
            "membership record {} is not active",
            member_id
        )));
    }
    Ok(())
}

pub fn load_active_member(
    conn: &Connection,
    group_id: &GroupId,
    user_id: &UserId,
) -> RegistryResult<Option<GroupMember>> {
    let member = conn
        .query_row(
            &format!(
                "SELECT {} FROM group_members WHERE group_id = ? AND user_id = ? AND left_at IS NULL",
                MEMBER_COLUMNS
            ),
            params![group_id.as_str(), user_id.as_str()],
            row_to_member,
        )
        .optional()?;
    Ok(member)
}

pub fn load_active_members(conn: &Connection, group_id: &GroupId) -> RegistryResult<Vec<GroupMember>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM group_members WHERE group_id = ? AND left_at IS NULL ORDER BY joined_at, user_id",
        MEMBER_COLUMNS
    ))?;
    let members = stmt
        .query_map(params![group_id.as_str()], row_to_member)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(members)
}

/// Every record (open and closed) for one user, oldest first
pub fn load_member_history(
    conn: &Connection,
    group_id: &GroupId,
    user_id: &UserId,
) -> RegistryResult<Vec<GroupMember>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM group_members WHERE group_id = ? AND user_id = ?
         ORDER BY epoch_joined, joined_at, left_at IS NULL",
        MEMBER_COLUMNS
    ))?;
    let members = stmt
        .query_map(params![group_id.as_str(), user_id.as_str()], row_to_member)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(members)
}

pub fn count_active_admins(conn: &Connection, group_id: &GroupId) -> RegistryResult<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM group_members WHERE group_id = ? AND role = 'admin' AND left_at IS NULL",
        params![group_id.as_str()],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

// ===== Epochs =====

pub fn insert_epoch(conn: &Connection, epoch: &Epoch) -> RegistryResult<()> {
    conn.execute(
        "INSERT INTO group_epochs
            (id, group_id, epoch_number, started_at, ended_at, reason, initiated_by, key_hash)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            &epoch.id,
            epoch.group_id.as_str(),
            epoch.epoch_number as i64,
            epoch.started_at.as_sql(),
            epoch.ended_at.map(|t| t.as_sql()),
            epoch.reason.as_str(),
            epoch.initiated_by.as_str(),
            &epoch.key_hash,
        ],
    )?;
    Ok(())
}

pub fn load_epoch(conn: &Connection, group_id: &GroupId, number: u64) -> RegistryResult<Option<Epoch>> {
    let epoch = conn
        .query_row(
            &format!(
                "SELECT {} FROM group_epochs WHERE group_id = ? AND epoch_number = ?",
                EPOCH_COLUMNS
            ),
            params![group_id.as_str(), number as i64],
            row_to_epoch,
        )
        .optional()?;
    Ok(epoch)
}

pub fn load_open_epoch(conn: &Connection, group_id: &GroupId) -> RegistryResult<Option<Epoch>> {
    let epoch = conn
        .query_row(
            &format!(
                "SELECT {} FROM group_epochs WHERE group_id = ? AND ended_at IS NULL",
                EPOCH_COLUMNS
            ),
            params![group_id.as_str()],
            row_to_epoch,
        )
        .optional()?;
    Ok(epoch)
}

/// Epoch history ascending by number
pub fn load_epochs(conn: &Connection, group_id: &GroupId) -> RegistryResult<Vec<Epoch>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM group_epochs WHERE group_id = ? ORDER BY epoch_number ASC",
        EPOCH_COLUMNS
    ))?;
    let epochs = stmt
        .query_map(params![group_id.as_str()], row_to_epoch)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(epochs)
}

/// Close the open epoch and append its successor
///
/// With `expected = Some(n)` the call fails with `Conflict` unless epoch `n` is
/// the open one. Must run inside an immediate transaction so the read and the
/// two writes are a single linearizable step.
pub fn advance_epoch(
    conn: &Connection,
    group_id: &GroupId,
    reason: EpochReason,
    initiated_by: &UserId,
    key_hash: Option<String>,
    expected: Option<u64>,
) -> RegistryResult<Epoch> {
    let open = load_open_epoch(conn, group_id)?
        .ok_or_else(|| RegistryError::GroupNotFound(group_id.to_string()))?;

    if let Some(expected) = expected {
        if open.epoch_number != expected {
            return Err(RegistryError::Conflict(format!(
                "group {} is at epoch {}, expected {}",
                group_id, open.epoch_number, expected
            )));
        }
    }

    let now = Timestamp::now();
    let closed = conn.execute(
        "UPDATE group_epochs SET ended_at = ? WHERE id = ? AND ended_at IS NULL",
        params![now.as_sql(), &open.id],
    )?;
    if closed != 1 {
        return Err(RegistryError::Conflict(format!(
            "epoch {} of group {} was closed concurrently",
            open.epoch_number, group_id
        )));
    }

    let mut next = open.successor(reason, initiated_by.clone(), key_hash);
    next.started_at = now;
    insert_epoch(conn, &next)?;

    let bumped = conn.execute(
        "UPDATE groups SET current_epoch = ? WHERE id = ? AND current_epoch = ?",
        params![next.epoch_number as i64, group_id.as_str(), open.epoch_number as i64],
    )?;
    if bumped != 1 {
        return Err(RegistryError::Conflict(format!(
            "group {} current epoch diverged from epoch history",
            group_id
        )));
    }

    Ok(next)
}

// ===== Activity log =====

pub fn insert_activity(
    conn: &Connection,
    group_id: &GroupId,
    actor_id: &UserId,
    action: &str,
    target_id: Option<&UserId>,
    epoch_number: u64,
) -> RegistryResult<()> {
    conn.execute(
        "INSERT INTO group_activity (group_id, actor_id, action, target_id, epoch_number, timestamp)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            group_id.as_str(),
            actor_id.as_str(),
            action,
            target_id.map(|t| t.as_str()),
            epoch_number as i64,
            Timestamp::now().as_sql(),
        ],
    )?;
    Ok(())
}

pub fn load_activity(conn: &Connection, group_id: &GroupId) -> RegistryResult<Vec<ActivityEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, group_id, actor_id, action, target_id, epoch_number, timestamp
         FROM group_activity WHERE group_id = ? ORDER BY id ASC",
    )?;
    let entries = stmt
        .query_map(params![group_id.as_str()], |row| {
            Ok(ActivityEntry {
                id: row.get(0)?,
                group_id: GroupId::new(row.get::<_, String>(1)?),
                actor_id: UserId::new(row.get::<_, String>(2)?),
                action: row.get(3)?,
                target_id: row.get::<_, Option<String>>(4)?.map(UserId::new),
                epoch_number: row.get::<_, i64>(5)? as u64,
                timestamp: Timestamp::from_sql(row.get(6)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

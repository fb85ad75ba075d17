//! SQL-based storage for groups, membership and epoch history

use super::errors::{RegistryError, RegistryResult};
use super::migrations::migrate;
use super::permissions::{can_perform_action, Action};
use super::queries;
use super::storage::GroupStorage;
use super::types::{ActivityEntry, Group, GroupId, GroupMember, Role, Timestamp, UserId};
use crate::config::RegistryConfig;
use crate::core_epoch::types::{Epoch, EpochReason};
use crate::metrics;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, TransactionBehavior};
use tracing::{info, warn};

/// SQL-based registry of group trust domains
pub struct SqlRegistry {
    pool: Pool<SqliteConnectionManager>,
}

impl SqlRegistry {
    /// Open (and migrate) the registry described by `config`
    pub fn open(config: &RegistryConfig) -> RegistryResult<Self> {
        let busy_timeout = config.busy_timeout;
        let (manager, pool_size) = match &config.database_path {
            Some(path) => (SqliteConnectionManager::file(path), config.pool_size),
            None => (SqliteConnectionManager::memory(), 1),
        };
        let manager = manager.with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")
        });

        // An in-memory database lives exactly as long as its single connection.
        let pool = Pool::builder()
            .max_size(pool_size)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?;

        migrate(&pool)?;

        Ok(Self { pool })
    }

    /// Create a new in-memory registry
    pub fn memory() -> RegistryResult<Self> {
        Self::open(&RegistryConfig::default())
    }

    /// Run `f` inside one `BEGIN IMMEDIATE` transaction
    ///
    /// The transaction commits only if `f` returns `Ok`; any error rolls back
    /// every write made through the handle.
    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&RegistryTx<'_>) -> Result<T, E>,
        E: From<RegistryError>,
    {
        let mut conn = self.pool.get().map_err(RegistryError::from)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RegistryError::from)?;

        let out = f(&RegistryTx { conn: &tx })?;

        tx.commit().map_err(RegistryError::from)?;
        Ok(out)
    }

    fn read<T>(&self, f: impl FnOnce(&RegistryTx<'_>) -> RegistryResult<T>) -> RegistryResult<T> {
        let conn = self.pool.get()?;
        f(&RegistryTx { conn: &conn })
    }

    // ===== Administrative operations =====

    pub fn create_group(&self, name: &str, creator: &UserId, public_key: &[u8]) -> RegistryResult<Group> {
        self.transaction(|tx| tx.create_group(name, creator, public_key))
    }

    pub fn add_member(
        &self,
        group_id: &GroupId,
        actor: &UserId,
        user: &UserId,
        role: Role,
        public_key: &[u8],
    ) -> RegistryResult<GroupMember> {
        self.transaction(|tx| tx.add_member(group_id, actor, user, role, public_key))
    }

    pub fn remove_member(&self, group_id: &GroupId, actor: &UserId, target: &UserId) -> RegistryResult<Epoch> {
        self.transaction(|tx| tx.remove_member(group_id, actor, target))
    }

    pub fn change_role(
        &self,
        group_id: &GroupId,
        actor: &UserId,
        target: &UserId,
        role: Role,
    ) -> RegistryResult<GroupMember> {
        self.transaction(|tx| tx.change_role(group_id, actor, target, role))
    }

    pub fn rotate_keys(&self, group_id: &GroupId, actor: &UserId, key_material: &[u8]) -> RegistryResult<Epoch> {
        self.transaction(|tx| tx.rotate_keys(group_id, actor, key_material))
    }

    pub fn bump_epoch(&self, group_id: &GroupId, actor: &UserId) -> RegistryResult<Epoch> {
        self.transaction(|tx| tx.bump_epoch(group_id, actor))
    }

    // ===== Queries =====

    pub fn get_group(&self, group_id: &GroupId) -> RegistryResult<Group> {
        self.read(|tx| tx.get_group(group_id))
    }

    pub fn active_members(&self, group_id: &GroupId) -> RegistryResult<Vec<GroupMember>> {
        self.read(|tx| tx.active_members(group_id))
    }

    pub fn member_history(&self, group_id: &GroupId, user_id: &UserId) -> RegistryResult<Vec<GroupMember>> {
        self.read(|tx| tx.member_history(group_id, user_id))
    }

    pub fn epoch_history(&self, group_id: &GroupId) -> RegistryResult<Vec<Epoch>> {
        self.read(|tx| tx.epoch_history(group_id))
    }

    pub fn activity_log(&self, group_id: &GroupId) -> RegistryResult<Vec<ActivityEntry>> {
        self.read(|tx| tx.activity_log(group_id))
    }
}

impl GroupStorage for SqlRegistry {
    fn get_group_epoch(&self, group_id: &GroupId) -> RegistryResult<u64> {
        self.read(|tx| tx.get_group_epoch(group_id))
    }

    fn active_member(&self, group_id: &GroupId, user_id: &UserId) -> RegistryResult<Option<GroupMember>> {
        self.read(|tx| tx.active_member(group_id, user_id))
    }

    fn record_group_operation(
        &self,
        group_id: &GroupId,
        actor_id: &UserId,
        action: &str,
        target_id: Option<&UserId>,
    ) -> RegistryResult<()> {
        self.transaction(|tx| tx.record_group_operation(group_id, actor_id, action, target_id))
    }
}

/// Registry handle bound to one open connection or transaction
pub struct RegistryTx<'a> {
    conn: &'a Connection,
}

impl<'a> RegistryTx<'a> {
    /// Wrap a caller-owned connection or transaction
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn require_actor(&self, group_id: &GroupId, actor: &UserId, action: Action) -> RegistryResult<GroupMember> {
        match queries::load_active_member(self.conn, group_id, actor)? {
            Some(member) if can_perform_action(&member, action) => Ok(member),
            _ => {
                warn!("{} denied {} in group {}", actor, action, group_id);
                Err(RegistryError::PermissionDenied {
                    actor: actor.to_string(),
                    action: action.to_string(),
                    group: group_id.to_string(),
                })
            }
        }
    }

    fn require_member(&self, group_id: &GroupId, user: &UserId) -> RegistryResult<GroupMember> {
        queries::load_active_member(self.conn, group_id, user)?.ok_or_else(|| RegistryError::MemberNotFound {
            group: group_id.to_string(),
            member: user.to_string(),
        })
    }

    fn ensure_other_admin(&self, group_id: &GroupId, leaving: &GroupMember) -> RegistryResult<()> {
        if leaving.role == Role::Admin && queries::count_active_admins(self.conn, group_id)? <= 1 {
            return Err(RegistryError::LastAdmin(group_id.to_string()));
        }
        Ok(())
    }

    /// Create a group at epoch 1 with `creator` as its first admin
    pub fn create_group(&self, name: &str, creator: &UserId, public_key: &[u8]) -> RegistryResult<Group> {
        let now = Timestamp::now();
        let group = Group {
            id: GroupId::generate(),
            name: name.to_string(),
            current_epoch: 1,
            created_at: now,
            created_by: creator.clone(),
        };
        queries::insert_group(self.conn, &group)?;

        let mut epoch = Epoch::initial(group.id.clone(), creator.clone());
        epoch.started_at = now;
        queries::insert_epoch(self.conn, &epoch)?;

        queries::insert_member(
            self.conn,
            &GroupMember {
                id: uuid::Uuid::new_v4().to_string(),
                user_id: creator.clone(),
                group_id: group.id.clone(),
                role: Role::Admin,
                public_key: public_key.to_vec(),
                joined_at: now,
                left_at: None,
                epoch_joined: 1,
                epoch_left: None,
            },
        )?;
        queries::insert_activity(self.conn, &group.id, creator, "createGroup", None, 1)?;

        info!("Created group {} ({}) by {}", group.id, group.name, creator);
        Ok(group)
    }

    pub fn add_member(
        &self,
        group_id: &GroupId,
        actor: &UserId,
        user: &UserId,
        role: Role,
        public_key: &[u8],
    ) -> RegistryResult<GroupMember> {
        let group = queries::require_group(self.conn, group_id)?;
        self.require_actor(group_id, actor, Action::AddMember)?;

        if queries::load_active_member(self.conn, group_id, user)?.is_some() {
            return Err(RegistryError::MemberExists {
                group: group_id.to_string(),
                member: user.to_string(),
            });
        }

        let member = GroupMember {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.clone(),
            group_id: group_id.clone(),
            role,
            public_key: public_key.to_vec(),
            joined_at: Timestamp::now(),
            left_at: None,
            epoch_joined: group.current_epoch,
            epoch_left: None,
        };
        queries::insert_member(self.conn, &member)?;
        queries::insert_activity(self.conn, group_id, actor, Action::AddMember.as_str(), Some(user), group.current_epoch)?;

        info!("Added {} to group {} as {} at epoch {}", user, group_id, role, group.current_epoch);
        Ok(member)
    }

    /// Close the member's record and open a new epoch, in this transaction
    pub fn remove_member(&self, group_id: &GroupId, actor: &UserId, target: &UserId) -> RegistryResult<Epoch> {
        let group = queries::require_group(self.conn, group_id)?;
        self.require_actor(group_id, actor, Action::RemoveMember)?;
        let member = self.require_member(group_id, target)?;
        self.ensure_other_admin(group_id, &member)?;

        queries::close_member(self.conn, &member.id, Timestamp::now(), group.current_epoch)?;
        let epoch = self.increment_epoch(
            group_id,
            EpochReason::MemberRemoved,
            actor,
            None,
            Some(group.current_epoch),
        )?;
        queries::insert_activity(self.conn, group_id, actor, Action::RemoveMember.as_str(), Some(target), epoch.epoch_number)?;

        info!("Removed {} from group {}; now at epoch {}", target, group_id, epoch.epoch_number);
        Ok(epoch)
    }

    /// Replace the member's record with one carrying `role`
    pub fn change_role(
        &self,
        group_id: &GroupId,
        actor: &UserId,
        target: &UserId,
        role: Role,
    ) -> RegistryResult<GroupMember> {
        let group = queries::require_group(self.conn, group_id)?;
        self.require_actor(group_id, actor, Action::ChangeRole)?;
        let current = self.require_member(group_id, target)?;
        if current.role == role {
            return Ok(current);
        }
        self.ensure_other_admin(group_id, &current)?;

        let now = Timestamp::now();
        queries::close_member(self.conn, &current.id, now, group.current_epoch)?;

        let replacement = GroupMember {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            joined_at: now,
            left_at: None,
            epoch_joined: group.current_epoch,
            epoch_left: None,
            ..current
        };
        queries::insert_member(self.conn, &replacement)?;
        queries::insert_activity(self.conn, group_id, actor, Action::ChangeRole.as_str(), Some(target), group.current_epoch)?;

        info!("Changed role of {} in group {} to {}", target, group_id, role);
        Ok(replacement)
    }

    /// Open a key-rotation epoch recording a hash of the new key material
    pub fn rotate_keys(&self, group_id: &GroupId, actor: &UserId, key_material: &[u8]) -> RegistryResult<Epoch> {
        queries::require_group(self.conn, group_id)?;
        self.require_actor(group_id, actor, Action::RotateKeys)?;

        let key_hash = blake3::hash(key_material).to_hex().to_string();
        let epoch = self.increment_epoch(group_id, EpochReason::KeyRotation, actor, Some(key_hash), None)?;
        queries::insert_activity(self.conn, group_id, actor, Action::RotateKeys.as_str(), None, epoch.epoch_number)?;
        Ok(epoch)
    }

    /// Administrator-triggered epoch bump
    pub fn bump_epoch(&self, group_id: &GroupId, actor: &UserId) -> RegistryResult<Epoch> {
        queries::require_group(self.conn, group_id)?;
        self.require_actor(group_id, actor, Action::IncrementEpoch)?;

        let epoch = self.increment_epoch(group_id, EpochReason::Manual, actor, None, None)?;
        queries::insert_activity(self.conn, group_id, actor, Action::IncrementEpoch.as_str(), None, epoch.epoch_number)?;
        Ok(epoch)
    }

    /// Close the open epoch and append the next one
    ///
    /// No permission check; administrative callers check before calling.
    pub fn increment_epoch(
        &self,
        group_id: &GroupId,
        reason: EpochReason,
        initiated_by: &UserId,
        key_hash: Option<String>,
        expected: Option<u64>,
    ) -> RegistryResult<Epoch> {
        let epoch = queries::advance_epoch(self.conn, group_id, reason, initiated_by, key_hash, expected)?;
        metrics::record_epoch_increment(reason);
        info!("Group {} advanced to epoch {} ({}) by {}", group_id, epoch.epoch_number, reason, initiated_by);
        Ok(epoch)
    }

    pub fn get_group(&self, group_id: &GroupId) -> RegistryResult<Group> {
        queries::require_group(self.conn, group_id)
    }

    pub fn active_members(&self, group_id: &GroupId) -> RegistryResult<Vec<GroupMember>> {
        queries::load_active_members(self.conn, group_id)
    }

    pub fn member_history(&self, group_id: &GroupId, user_id: &UserId) -> RegistryResult<Vec<GroupMember>> {
        queries::load_member_history(self.conn, group_id, user_id)
    }

    pub fn epoch(&self, group_id: &GroupId, number: u64) -> RegistryResult<Option<Epoch>> {
        queries::load_epoch(self.conn, group_id, number)
    }

    pub fn open_epoch(&self, group_id: &GroupId) -> RegistryResult<Option<Epoch>> {
        queries::load_open_epoch(self.conn, group_id)
    }

    pub fn epoch_history(&self, group_id: &GroupId) -> RegistryResult<Vec<Epoch>> {
        queries::load_epochs(self.conn, group_id)
    }

    pub fn activity_log(&self, group_id: &GroupId) -> RegistryResult<Vec<ActivityEntry>> {
        queries::load_activity(self.conn, group_id)
    }
}

impl GroupStorage for RegistryTx<'_> {
    fn get_group_epoch(&self, group_id: &GroupId) -> RegistryResult<u64> {
        Ok(queries::require_group(self.conn, group_id)?.current_epoch)
    }

    fn active_member(&self, group_id: &GroupId, user_id: &UserId) -> RegistryResult<Option<GroupMember>> {
        queries::load_active_member(self.conn, group_id, user_id)
    }

    fn record_group_operation(
        &self,
        group_id: &GroupId,
        actor_id: &UserId,
        action: &str,
        target_id: Option<&UserId>,
    ) -> RegistryResult<()> {
        let epoch = self.get_group_epoch(group_id)?;
        queries::insert_activity(self.conn, group_id, actor_id, action, target_id, epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (SqlRegistry, GroupId, UserId) {
        let registry = SqlRegistry::memory().unwrap();
        let admin = UserId::new("admin1");
        let group = registry.create_group("Team", &admin, b"admin-pk").unwrap();
        (registry, group.id, admin)
    }

    #[test]
    fn test_create_group_starts_at_epoch_one() {
        let (registry, group_id, admin) = setup();

        let group = registry.get_group(&group_id).unwrap();
        assert_eq!(group.current_epoch, 1);
        assert_eq!(group.created_by, admin);

        let history = registry.epoch_history(&group_id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reason, EpochReason::Initial);
        assert!(history[0].is_open());

        let creator = registry.active_member(&group_id, &admin).unwrap().unwrap();
        assert_eq!(creator.role, Role::Admin);
        assert_eq!(creator.epoch_joined, 1);
    }

    #[test]
    fn test_add_member_requires_permission() {
        let (registry, group_id, admin) = setup();
        let bob = UserId::new("bob");
        let carol = UserId::new("carol");

        registry.add_member(&group_id, &admin, &bob, Role::Member, b"bob").unwrap();
        let err = registry.add_member(&group_id, &bob, &carol, Role::Member, b"carol").unwrap_err();
        assert!(matches!(err, RegistryError::PermissionDenied { .. }));
        assert!(registry.active_member(&group_id, &carol).unwrap().is_none());
    }

    #[test]
    fn test_add_member_twice_is_rejected() {
        let (registry, group_id, admin) = setup();
        let bob = UserId::new("bob");

        registry.add_member(&group_id, &admin, &bob, Role::Member, b"bob").unwrap();
        let err = registry.add_member(&group_id, &admin, &bob, Role::Member, b"bob").unwrap_err();
        assert!(matches!(err, RegistryError::MemberExists { .. }));
    }

    #[test]
    fn test_remove_member_bumps_epoch_atomically() {
        let (registry, group_id, admin) = setup();
        let bob = UserId::new("bob");
        registry.add_member(&group_id, &admin, &bob, Role::Member, b"bob").unwrap();

        let epoch = registry.remove_member(&group_id, &admin, &bob).unwrap();
        assert_eq!(epoch.epoch_number, 2);
        assert_eq!(epoch.reason, EpochReason::MemberRemoved);
        assert_eq!(registry.get_group_epoch(&group_id).unwrap(), 2);

        assert!(registry.active_member(&group_id, &bob).unwrap().is_none());
        let history = registry.member_history(&group_id, &bob).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].epoch_left, Some(1));
        assert!(history[0].left_at.is_some());
    }

    #[test]
    fn test_failed_removal_leaves_no_partial_state() {
        let (registry, group_id, admin) = setup();

        let err = registry.remove_member(&group_id, &admin, &admin).unwrap_err();
        assert!(matches!(err, RegistryError::LastAdmin(_)));
        assert_eq!(registry.get_group_epoch(&group_id).unwrap(), 1);
        assert!(registry.active_member(&group_id, &admin).unwrap().is_some());
        assert_eq!(registry.epoch_history(&group_id).unwrap().len(), 1);
    }

    #[test]
    fn test_change_role_replaces_record() {
        let (registry, group_id, admin) = setup();
        let bob = UserId::new("bob");
        let original = registry.add_member(&group_id, &admin, &bob, Role::Admin, b"bob").unwrap();

        let replacement = registry.change_role(&group_id, &admin, &bob, Role::Member).unwrap();
        assert_ne!(replacement.id, original.id);
        assert_eq!(replacement.role, Role::Member);
        assert_eq!(replacement.public_key, b"bob".to_vec());

        let history = registry.member_history(&group_id, &bob).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::Admin);
        assert!(!history[0].is_active());
        assert!(history[1].is_active());
        assert_eq!(registry.active_members(&group_id).unwrap().len(), 2);
    }

    #[test]
    fn test_cannot_demote_last_admin() {
        let (registry, group_id, admin) = setup();
        let err = registry.change_role(&group_id, &admin, &admin, Role::Member).unwrap_err();
        assert!(matches!(err, RegistryError::LastAdmin(_)));
    }

    #[test]
    fn test_rotate_keys_stores_hash_only() {
        let (registry, group_id, admin) = setup();
        let epoch = registry.rotate_keys(&group_id, &admin, b"new-key-material").unwrap();

        assert_eq!(epoch.reason, EpochReason::KeyRotation);
        let hash = epoch.key_hash.unwrap();
        assert_eq!(hash, blake3::hash(b"new-key-material").to_hex().to_string());
        assert!(!hash.contains("new-key-material"));
    }

    #[test]
    fn test_increment_epoch_expected_mismatch_conflicts() {
        let (registry, group_id, admin) = setup();
        let err = registry
            .transaction(|tx| tx.increment_epoch(&group_id, EpochReason::Manual, &admin, None, Some(7)))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Conflict(_)));
        assert_eq!(registry.get_group_epoch(&group_id).unwrap(), 1);
    }

    #[test]
    fn test_validate_group_access_only_current_epoch() {
        let (registry, group_id, admin) = setup();
        assert!(registry.validate_group_access(&admin, &group_id, 1).unwrap());

        registry.bump_epoch(&group_id, &admin).unwrap();
        assert!(!registry.validate_group_access(&admin, &group_id, 1).unwrap());
        assert!(registry.validate_group_access(&admin, &group_id, 2).unwrap());
        assert!(!registry.validate_group_access(&UserId::new("stranger"), &group_id, 2).unwrap());
        assert!(!registry.validate_group_access(&admin, &GroupId::new("nope"), 1).unwrap());
    }

    #[test]
    fn test_validate_group_operation() {
        let (registry, group_id, admin) = setup();
        let bob = UserId::new("bob");
        registry.add_member(&group_id, &admin, &bob, Role::Member, b"bob").unwrap();

        assert!(registry.validate_group_operation(&admin, Action::RemoveMember, &group_id, Some(&bob)).unwrap());
        assert!(!registry.validate_group_operation(&admin, Action::RemoveMember, &group_id, None).unwrap());
        assert!(!registry.validate_group_operation(&bob, Action::RemoveMember, &group_id, Some(&admin)).unwrap());
        assert!(registry.validate_group_operation(&bob, Action::Read, &group_id, None).unwrap());
    }

    #[test]
    fn test_audit_log_records_mutations() {
        let (registry, group_id, admin) = setup();
        let bob = UserId::new("bob");
        registry.add_member(&group_id, &admin, &bob, Role::Member, b"bob").unwrap();
        registry.remove_member(&group_id, &admin, &bob).unwrap();
        registry.record_group_operation(&group_id, &admin, "exportKeys", None).unwrap();

        let actions: Vec<(String, u64)> = registry
            .activity_log(&group_id)
            .unwrap()
            .into_iter()
            .map(|e| (e.action, e.epoch_number))
            .collect();
        assert_eq!(
            actions,
            vec![
                ("createGroup".to_string(), 1),
                ("addMember".to_string(), 1),
                ("removeMember".to_string(), 2),
                ("exportKeys".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_unknown_group() {
        let registry = SqlRegistry::memory().unwrap();
        let err = registry.get_group_epoch(&GroupId::new("missing")).unwrap_err();
        assert!(matches!(err, RegistryError::GroupNotFound(_)));
    }
}

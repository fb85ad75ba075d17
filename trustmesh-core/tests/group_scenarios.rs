/*
    group_scenarios.rs - End-to-end trust-domain scenarios

    Registry, epoch manager, contexts and auth providers working together
    against one in-memory registry.
*/

use std::sync::Arc;
use trustmesh_core::core_auth::{AuthError, AuthProvider, GroupAuthProvider};
use trustmesh_core::core_context::{GroupContext, TrustDomain};
use trustmesh_core::core_epoch::{verify_history, EpochManager, EpochReason, RegistryEpochManager};
use trustmesh_core::core_registry::{can_perform_action, Action, GroupId, Role, SqlRegistry, UserId};

fn provider(registry: &Arc<SqlRegistry>, group: &GroupId, epoch: u64, actor: &UserId) -> GroupAuthProvider<Arc<SqlRegistry>> {
    GroupAuthProvider::new(Arc::clone(registry), GroupContext::new(group.clone(), epoch, actor.clone()))
}

#[test]
fn test_proofs_are_bound_to_their_epoch() {
    let registry = Arc::new(SqlRegistry::memory().unwrap());
    let admin1 = UserId::new("admin1");
    let group = registry.create_group("G", &admin1, b"pk-admin1").unwrap();
    assert_eq!(group.current_epoch, 1);

    let epochs = RegistryEpochManager::new(Arc::clone(&registry), group.id.clone());
    let initial = epochs.current_epoch().unwrap();
    assert_eq!(initial.reason, EpochReason::Initial);
    assert!(initial.ended_at.is_none());

    let p1 = provider(&registry, &group.id, 1, &admin1).create_auth_proof(b"hello").unwrap();
    assert!(provider(&registry, &group.id, 1, &admin1).verify_auth_proof(b"hello", &p1));

    let e2 = epochs.increment_epoch(EpochReason::MemberRemoved, &admin1).unwrap();
    assert_eq!(e2.epoch_number, 2);

    assert!(!provider(&registry, &group.id, 2, &admin1).verify_auth_proof(b"hello", &p1));

    let p2 = provider(&registry, &group.id, 2, &admin1).create_auth_proof(b"hello").unwrap();
    assert!(provider(&registry, &group.id, 2, &admin1).verify_auth_proof(b"hello", &p2));
    assert!(!provider(&registry, &group.id, 1, &admin1).verify_auth_proof(b"hello", &p2));

    verify_history(&epochs.get_epoch_history().unwrap()).unwrap();
}

#[test]
fn test_member_role_limits_actions() {
    let registry = SqlRegistry::memory().unwrap();
    let admin = UserId::new("admin1");
    let m = UserId::new("m");
    let group = registry.create_group("G", &admin, b"pk").unwrap().id;
    let member = registry.add_member(&group, &admin, &m, Role::Member, b"pk-m").unwrap();

    assert!(!can_perform_action(&member, Action::RemoveMember));
    assert!(can_perform_action(&member, Action::Read));
    assert!(registry.remove_member(&group, &m, &admin).is_err());
}

#[test]
fn test_removal_revokes_and_advances_atomically() {
    let registry = Arc::new(SqlRegistry::memory().unwrap());
    let admin = UserId::new("admin1");
    let bob = UserId::new("bob");
    let group = registry.create_group("G", &admin, b"pk").unwrap().id;
    registry.add_member(&group, &admin, &bob, Role::Member, b"pk-bob").unwrap();

    let bob_proof = provider(&registry, &group, 1, &bob).create_auth_proof(b"draft").unwrap();
    let epoch = registry.remove_member(&group, &admin, &bob).unwrap();
    assert_eq!(epoch.epoch_number, 2);
    assert_eq!(epoch.reason, EpochReason::MemberRemoved);

    // Historical row survives with its closing epoch
    let history = registry.member_history(&group, &bob).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].epoch_left, Some(1));

    assert!(!provider(&registry, &group, 1, &admin).verify_auth_proof(b"draft", &bob_proof));
    let err = provider(&registry, &group, 2, &bob).create_auth_proof(b"draft").unwrap_err();
    assert!(matches!(err, AuthError::NotAMember { .. }));

    let actions: Vec<String> = registry.activity_log(&group).unwrap().into_iter().map(|a| a.action).collect();
    assert_eq!(actions, vec!["createGroup", "addMember", "removeMember"]);
}

#[test]
fn test_key_rotation_records_hash_only() {
    let registry = SqlRegistry::memory().unwrap();
    let admin = UserId::new("admin1");
    let group = registry.create_group("G", &admin, b"pk").unwrap().id;

    let epoch = registry.rotate_keys(&group, &admin, b"new key material").unwrap();
    assert_eq!(epoch.reason, EpochReason::KeyRotation);
    let key_hash = epoch.key_hash.unwrap();
    assert_eq!(key_hash, blake3::hash(b"new key material").to_hex().to_string());
    assert!(!key_hash.contains("new key"));
}

#[test]
fn test_node_ids_follow_the_epoch() {
    let registry = Arc::new(SqlRegistry::memory().unwrap());
    let admin = UserId::new("admin1");
    let group = registry.create_group("G", &admin, b"pk").unwrap().id;

    let ctx1 = GroupContext::new(group.clone(), 1, admin.clone());
    let id = ctx1.create_node_id();
    assert!(ctx1.is_valid_node_id(&id));

    let e2 = registry.bump_epoch(&group, &admin).unwrap();
    let ctx2 = ctx1.at_epoch(e2.epoch_number);
    assert!(!ctx2.is_valid_node_id(&id));
    assert_ne!(ctx1.partition_key(), ctx2.partition_key());
}

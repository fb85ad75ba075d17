/*
    partition_isolation.rs - Data from different domains and epochs never mixes
*/

use proptest::prelude::*;
use std::sync::Arc;
use trustmesh_core::core_context::{SecurityContext, TrustDomain};
use trustmesh_core::core_crypto::{EncryptionProvider, GroupEncryptionProvider, MemoryKeyring};
use trustmesh_core::core_partition::{
    DefaultPartitionStrategy, MessageRouter, PartitionStrategy, SyncMessage, SyncVisibility,
};
use trustmesh_core::core_registry::{GroupId, Role, SqlRegistry, UserId};

#[test]
fn test_router_never_batches_across_epochs() {
    let registry = Arc::new(SqlRegistry::memory().unwrap());
    let router = MessageRouter::new(Arc::clone(&registry));
    let g = GroupId::new("g1");

    let messages = vec![
        SyncMessage::for_group(g.clone(), 1, b"a".to_vec()),
        SyncMessage::for_group(g.clone(), 2, b"b".to_vec()),
        SyncMessage::for_group(g.clone(), 1, b"c".to_vec()),
        SyncMessage::for_group(GroupId::new("g2"), 1, b"d".to_vec()),
    ];
    for batch in router.route(messages) {
        let keys: Vec<String> = batch.messages.iter().map(SyncMessage::partition_key).collect();
        assert!(keys.iter().all(|k| *k == batch.partition_key));
    }
}

#[test]
fn test_non_member_gets_empty_set() {
    let registry = Arc::new(SqlRegistry::memory().unwrap());
    let admin = UserId::new("admin1");
    let group = registry.create_group("G", &admin, b"pk").unwrap().id;
    let router = MessageRouter::new(Arc::clone(&registry));

    let outgoing = vec![SyncMessage::for_group(group.clone(), 1, b"secret".to_vec())];
    let eve = UserId::new("eve");
    assert_eq!(router.visibility(&eve, &group).unwrap(), SyncVisibility::denied());
    assert!(router.filter_outgoing(outgoing.clone(), &eve, &group).unwrap().is_empty());
    assert_eq!(router.filter_outgoing(outgoing, &admin, &group).unwrap().len(), 1);
}

#[test]
fn test_rotated_epoch_data_stays_out_of_reach() {
    let registry = Arc::new(SqlRegistry::memory().unwrap());
    let admin = UserId::new("admin1");
    let bob = UserId::new("bob");
    let group = registry.create_group("G", &admin, b"pk").unwrap().id;
    registry.add_member(&group, &admin, &bob, Role::Member, b"pk-bob").unwrap();

    let keyring = Arc::new(MemoryKeyring::new());
    keyring.generate(group.as_str(), 1);
    let mut crypto = GroupEncryptionProvider::new(group.clone(), 1, Arc::clone(&keyring));
    let ctx1 = SecurityContext::group(group.clone(), 1, admin.clone());
    let old = crypto.encrypt(b"epoch one", &ctx1).unwrap();

    let e2 = registry.remove_member(&group, &admin, &bob).unwrap().epoch_number;
    let key_id = keyring.generate(group.as_str(), e2);
    crypto.update_epoch(e2, Some(key_id));
    let ctx2 = SecurityContext::group(group.clone(), e2, admin.clone());
    let new = crypto.encrypt(b"epoch two", &ctx2).unwrap();

    let strategy = DefaultPartitionStrategy;
    assert!(!strategy.should_sync(&ctx1, &ctx2));
    assert!(!strategy.can_access(&ctx2, &old));
    assert!(strategy.can_access(&ctx2, &new));
    assert!(!crypto.can_decrypt(&old, &ctx2));
    assert_eq!(crypto.decrypt(&new, &ctx2).unwrap(), b"epoch two");

    let router = MessageRouter::new(Arc::clone(&registry));
    assert_eq!(router.visibility(&bob, &group).unwrap(), SyncVisibility::denied());
    assert_eq!(router.visibility(&admin, &group).unwrap().epoch_range, Some((e2, e2)));
}

fn context() -> impl Strategy<Value = SecurityContext> {
    prop_oneof![
        (0u8..3, 1u64..4, 0u8..3).prop_map(|(g, e, m)| {
            SecurityContext::group(GroupId::new(format!("g{}", g)), e, UserId::new(format!("m{}", m)))
        }),
        (0u8..3).prop_map(|o| SecurityContext::owner(UserId::new(format!("m{}", o)))),
        Just(SecurityContext::plaintext()),
    ]
}

proptest! {
    #[test]
    fn prop_should_sync_iff_partition_keys_match(a in context(), b in context()) {
        let strategy = DefaultPartitionStrategy;
        prop_assert_eq!(strategy.should_sync(&a, &b), a.partition_key() == b.partition_key());
        if let (Some(ga), Some(gb)) = (a.as_group(), b.as_group()) {
            if ga.epoch() != gb.epoch() {
                prop_assert!(!strategy.should_sync(&a, &b));
            }
        }
    }

    #[test]
    fn prop_sync_targets_share_local_partition(local in context(), candidates in proptest::collection::vec(context(), 0..12)) {
        let targets = DefaultPartitionStrategy.filter_sync_targets(&local, &candidates);
        for target in targets {
            prop_assert_eq!(target.partition_key(), local.partition_key());
        }
    }
}

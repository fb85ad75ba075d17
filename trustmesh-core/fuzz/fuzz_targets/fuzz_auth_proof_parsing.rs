#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;
use trustmesh_core::core_auth::proof::decode_group_proof;
use trustmesh_core::core_auth::{AuthProof, AuthProvider, GroupAuthProvider, GROUP_AUTH_V1};
use trustmesh_core::core_context::GroupContext;
use trustmesh_core::core_registry::{GroupId, SqlRegistry, UserId};

struct Target {
    registry: SqlRegistry,
    group: GroupId,
}

fn target() -> &'static Target {
    static TARGET: OnceLock<Target> = OnceLock::new();
    TARGET.get_or_init(|| {
        let registry = SqlRegistry::memory().unwrap();
        let group = registry.create_group("fuzz", &UserId::new("admin1"), b"pk").unwrap().id;
        Target { registry, group }
    })
}

fuzz_target!(|data: &[u8]| {
    // Envelope parsing on its own must never panic
    let _ = decode_group_proof(data);

    // Full verification path: arbitrary bytes must only ever yield `false`
    let t = target();
    let verifier = GroupAuthProvider::new(
        &t.registry,
        GroupContext::new(t.group.clone(), 1, UserId::new("admin1")),
    );
    let proof = AuthProof::new(GROUP_AUTH_V1, data.to_vec());
    assert!(!verifier.verify_auth_proof(b"fuzz", &proof));
});

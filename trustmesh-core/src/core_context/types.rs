//! SecurityContext family

use super::node_id::{self, GroupNodeId};
use crate::core_registry::types::{GroupId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Partition key shared by every plaintext context
pub const GLOBAL_PARTITION: &str = "global";

/// Context id of every plaintext context
pub const PLAINTEXT_CONTEXT_ID: &str = "plaintext";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    Owner,
    Group,
    Plaintext,
}

impl ContextKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextKind::Owner => "owner",
            ContextKind::Group => "group",
            ContextKind::Plaintext => "plaintext",
        }
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive snapshot of a context, suitable for logging and envelopes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMetadata {
    pub kind: ContextKind,
    pub domain_id: String,
    pub epoch: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_id: Option<UserId>,
}

/// Capabilities every trust domain offers the replication engine
///
/// Owner and plaintext domains are unversioned and report epoch 0.
pub trait TrustDomain {
    fn kind(&self) -> ContextKind;

    /// Identity of the trust domain (owner id, group id or `global`)
    fn domain_id(&self) -> &str;

    fn epoch(&self) -> u64;

    /// Pure function of kind, domain identity and epoch
    fn context_id(&self) -> String;

    /// Two contexts may sync iff their partition keys are equal
    fn partition_key(&self) -> String;

    /// Id for the causal clock
    fn create_node_id(&self) -> String;

    /// Structural check against this context's own domain and epoch
    fn is_valid_node_id(&self, id: &str) -> bool;

    /// Member identity recoverable from a valid node id
    fn member_from_node_id(&self, id: &str) -> Option<String>;

    fn metadata(&self) -> ContextMetadata;
}

/// A single device owner's private domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerContext {
    owner_id: UserId,
}

impl OwnerContext {
    pub fn new(owner_id: UserId) -> Self {
        Self { owner_id }
    }

    pub fn owner_id(&self) -> &UserId {
        &self.owner_id
    }
}

impl TrustDomain for OwnerContext {
    fn kind(&self) -> ContextKind {
        ContextKind::Owner
    }

    fn domain_id(&self) -> &str {
        self.owner_id.as_str()
    }

    fn epoch(&self) -> u64 {
        0
    }

    fn context_id(&self) -> String {
        format!("owner:{}", self.owner_id)
    }

    fn partition_key(&self) -> String {
        self.context_id()
    }

    fn create_node_id(&self) -> String {
        node_id::opaque_node_id()
    }

    fn is_valid_node_id(&self, id: &str) -> bool {
        node_id::is_opaque_node_id(id)
    }

    /// Every node id of an owner context belongs to the owner
    fn member_from_node_id(&self, id: &str) -> Option<String> {
        self.is_valid_node_id(id).then(|| self.owner_id.to_string())
    }

    fn metadata(&self) -> ContextMetadata {
        ContextMetadata {
            kind: self.kind(),
            domain_id: self.owner_id.to_string(),
            epoch: 0,
            member_id: Some(self.owner_id.clone()),
        }
    }
}

/// One member's view of one epoch of a group
///
/// A context is bound to a single epoch. After an epoch increment callers
/// build a new context; the old one keeps rejecting the new epoch's ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupContext {
    group_id: GroupId,
    epoch: u64,
    member_id: UserId,
}

impl GroupContext {
    pub fn new(group_id: GroupId, epoch: u64, member_id: UserId) -> Self {
        Self { group_id, epoch, member_id }
    }

    pub fn group_id(&self) -> &GroupId {
        &self.group_id
    }

    pub fn member_id(&self) -> &UserId {
        &self.member_id
    }

    /// The same member in another epoch of the same group
    pub fn at_epoch(&self, epoch: u64) -> Self {
        Self { epoch, ..self.clone() }
    }
}

impl TrustDomain for GroupContext {
    fn kind(&self) -> ContextKind {
        ContextKind::Group
    }

    fn domain_id(&self) -> &str {
        self.group_id.as_str()
    }

    fn epoch(&self) -> u64 {
        self.epoch
    }

    fn context_id(&self) -> String {
        format!("group:{}:{}", self.group_id, self.epoch)
    }

    fn partition_key(&self) -> String {
        format!("group:{}:{}", self.group_id, self.epoch)
    }

    fn create_node_id(&self) -> String {
        node_id::group_node_id(
            self.group_id.as_str(),
            self.epoch,
            self.member_id.as_str(),
            Timestamp::now().as_millis(),
        )
    }

    fn is_valid_node_id(&self, id: &str) -> bool {
        GroupNodeId::parse(id)
            .map(|parsed| parsed.belongs_to(self.group_id.as_str(), self.epoch))
            .unwrap_or(false)
    }

    /// The 4-char member prefix; resolving it to a full id needs the roster
    fn member_from_node_id(&self, id: &str) -> Option<String> {
        GroupNodeId::parse(id)
            .filter(|parsed| parsed.belongs_to(self.group_id.as_str(), self.epoch))
            .map(|parsed| parsed.member_prefix.to_string())
    }

    fn metadata(&self) -> ContextMetadata {
        ContextMetadata {
            kind: self.kind(),
            domain_id: self.group_id.to_string(),
            epoch: self.epoch,
            member_id: Some(self.member_id.clone()),
        }
    }
}

/// Unsecured development domain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaintextContext;

impl TrustDomain for PlaintextContext {
    fn kind(&self) -> ContextKind {
        ContextKind::Plaintext
    }

    fn domain_id(&self) -> &str {
        GLOBAL_PARTITION
    }

    fn epoch(&self) -> u64 {
        0
    }

    fn context_id(&self) -> String {
        PLAINTEXT_CONTEXT_ID.to_string()
    }

    fn partition_key(&self) -> String {
        GLOBAL_PARTITION.to_string()
    }

    fn create_node_id(&self) -> String {
        node_id::opaque_node_id()
    }

    fn is_valid_node_id(&self, id: &str) -> bool {
        node_id::is_opaque_node_id(id)
    }

    fn member_from_node_id(&self, _id: &str) -> Option<String> {
        None
    }

    fn metadata(&self) -> ContextMetadata {
        ContextMetadata {
            kind: self.kind(),
            domain_id: GLOBAL_PARTITION.to_string(),
            epoch: 0,
            member_id: None,
        }
    }
}

/// Closed set of trust domains the replication engine dispatches over
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityContext {
    Owner(OwnerContext),
    Group(GroupContext),
    Plaintext(PlaintextContext),
}

impl SecurityContext {
    pub fn owner(owner_id: UserId) -> Self {
        SecurityContext::Owner(OwnerContext::new(owner_id))
    }

    pub fn group(group_id: GroupId, epoch: u64, member_id: UserId) -> Self {
        SecurityContext::Group(GroupContext::new(group_id, epoch, member_id))
    }

    pub fn plaintext() -> Self {
        SecurityContext::Plaintext(PlaintextContext)
    }

    pub fn as_group(&self) -> Option<&GroupContext> {
        match self {
            SecurityContext::Group(ctx) => Some(ctx),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn TrustDomain {
        match self {
            SecurityContext::Owner(ctx) => ctx,
            SecurityContext::Group(ctx) => ctx,
            SecurityContext::Plaintext(ctx) => ctx,
        }
    }
}

impl TrustDomain for SecurityContext {
    fn kind(&self) -> ContextKind {
        self.inner().kind()
    }

    fn domain_id(&self) -> &str {
        self.inner().domain_id()
    }

    fn epoch(&self) -> u64 {
        self.inner().epoch()
    }

    fn context_id(&self) -> String {
        self.inner().context_id()
    }

    fn partition_key(&self) -> String {
        self.inner().partition_key()
    }

    fn create_node_id(&self) -> String {
        self.inner().create_node_id()
    }

    fn is_valid_node_id(&self, id: &str) -> bool {
        self.inner().is_valid_node_id(id)
    }

    fn member_from_node_id(&self, id: &str) -> Option<String> {
        self.inner().member_from_node_id(id)
    }

    fn metadata(&self) -> ContextMetadata {
        self.inner().metadata()
    }
}

impl From<OwnerContext> for SecurityContext {
    fn from(ctx: OwnerContext) -> Self {
        SecurityContext::Owner(ctx)
    }
}

impl From<GroupContext> for SecurityContext {
    fn from(ctx: GroupContext) -> Self {
        SecurityContext::Group(ctx)
    }
}

impl From<PlaintextContext> for SecurityContext {
    fn from(ctx: PlaintextContext) -> Self {
        SecurityContext::Plaintext(ctx)
    }
}

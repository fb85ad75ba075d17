//! Node id codec
//!
//! Group node ids look like `g<suffix>-e<epoch>-m<prefix>-<ts>-<salt>`:
//! the last 6 alphanumeric chars of the group id, the epoch in base36 (at
//! least 2 digits), the first 4 alphanumeric chars of the member id, the
//! wall-clock millis in base36 and 6 random base36 chars. Provenance can be
//! checked with nothing but the expected group and epoch.

use rand::Rng;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub const GROUP_SUFFIX_LEN: usize = 6;
pub const MEMBER_PREFIX_LEN: usize = 4;
pub const SALT_LEN: usize = 6;
const EPOCH_MIN_WIDTH: usize = 2;

/// Random-hex node id length for owner and plaintext contexts
pub const OPAQUE_NODE_ID_LEN: usize = 16;

pub fn encode_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

pub fn decode_base36(s: &str) -> Option<u64> {
    if s.is_empty() {
        return None;
    }
    s.chars().try_fold(0u64, |acc, c| {
        let digit = c.to_digit(36)?;
        if c.is_ascii_uppercase() {
            return None;
        }
        acc.checked_mul(36)?.checked_add(digit as u64)
    })
}

fn is_base36(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
}

fn alphanumeric(s: &str) -> Vec<char> {
    s.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Last 6 alphanumeric chars of a group id, left-padded with `0`
pub fn group_suffix(group_id: &str) -> String {
    let chars = alphanumeric(group_id);
    let tail: String = chars[chars.len().saturating_sub(GROUP_SUFFIX_LEN)..].iter().collect();
    format!("{:0>width$}", tail, width = GROUP_SUFFIX_LEN)
}

/// First 4 alphanumeric chars of a member id, left-padded with `0`
pub fn member_prefix(member_id: &str) -> String {
    let head: String = alphanumeric(member_id).into_iter().take(MEMBER_PREFIX_LEN).collect();
    format!("{:0>width$}", head, width = MEMBER_PREFIX_LEN)
}

pub fn encode_epoch(epoch: u64) -> String {
    format!("{:0>width$}", encode_base36(epoch), width = EPOCH_MIN_WIDTH)
}

fn random_base36(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len).map(|_| BASE36[rng.random_range(0..BASE36.len())] as char).collect()
}

/// Mint a group node id
pub fn group_node_id(group_id: &str, epoch: u64, member_id: &str, now_millis: u64) -> String {
    format!(
        "g{}-e{}-m{}-{}-{}",
        group_suffix(group_id),
        encode_epoch(epoch),
        member_prefix(member_id),
        encode_base36(now_millis),
        random_base36(SALT_LEN)
    )
}

/// Random hex id for contexts without group provenance
pub fn opaque_node_id() -> String {
    hex::encode(rand::random::<[u8; OPAQUE_NODE_ID_LEN / 2]>())
}

pub fn is_opaque_node_id(id: &str) -> bool {
    id.len() == OPAQUE_NODE_ID_LEN && id.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'a'..=b'f'))
}

/// The decoded components of a group node id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupNodeId<'a> {
    pub group_suffix: &'a str,
    pub epoch: u64,
    pub member_prefix: &'a str,
    pub timestamp: u64,
    pub salt: &'a str,
}

impl<'a> GroupNodeId<'a> {
    /// Structural parse; `None` for anything that is not a well-formed id
    pub fn parse(id: &'a str) -> Option<Self> {
        let mut parts = id.split('-');
        let group = parts.next()?.strip_prefix('g')?;
        let epoch = parts.next()?.strip_prefix('e')?;
        let member = parts.next()?.strip_prefix('m')?;
        let timestamp = parts.next()?;
        let salt = parts.next()?;
        if parts.next().is_some() {
            return None;
        }

        let alnum = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_alphanumeric());
        if !alnum(group, GROUP_SUFFIX_LEN) || !alnum(member, MEMBER_PREFIX_LEN) {
            return None;
        }
        if epoch.len() < EPOCH_MIN_WIDTH || salt.len() != SALT_LEN || !is_base36(salt) {
            return None;
        }

        // One spelling per id: padding beyond the canonical width is refused
        let epoch_number = decode_base36(epoch)?;
        let timestamp_millis = decode_base36(timestamp)?;
        if encode_epoch(epoch_number) != epoch || encode_base36(timestamp_millis) != timestamp {
            return None;
        }

        Some(Self {
            group_suffix: group,
            epoch: epoch_number,
            member_prefix: member,
            timestamp: timestamp_millis,
            salt,
        })
    }

    /// Whether this id was minted for `group_id` at `epoch`
    pub fn belongs_to(&self, group_id: &str, epoch: u64) -> bool {
        self.group_suffix == group_suffix(group_id) && self.epoch == epoch
    }
}

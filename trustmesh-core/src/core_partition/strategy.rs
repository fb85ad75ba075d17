//! Partition strategy: which contexts may exchange which data

use crate::core_context::{SecurityContext, TrustDomain};
use crate::core_crypto::EncryptedData;

pub trait PartitionStrategy {
    /// By default, equality of partition keys
    fn should_sync(&self, local: &SecurityContext, remote: &SecurityContext) -> bool {
        local.partition_key() == remote.partition_key()
    }

    /// Whether `data` is bound to this context's domain and epoch
    fn can_access(&self, context: &SecurityContext, data: &EncryptedData) -> bool {
        data.context_id == context.context_id()
            && data.metadata.domain_id == context.domain_id()
            && (!data.metadata.encrypted || data.metadata.epoch == context.epoch())
    }

    fn filter_sync_targets<'a>(
        &self,
        local: &SecurityContext,
        candidates: &'a [SecurityContext],
    ) -> Vec<&'a SecurityContext> {
        candidates.iter().filter(|remote| self.should_sync(local, remote)).collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPartitionStrategy;

impl PartitionStrategy for DefaultPartitionStrategy {}

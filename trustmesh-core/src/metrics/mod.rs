/*
    Metrics - Trust-domain counters for monitoring

    Counts proof issuance and verification outcomes, epoch increments by
    reason, and the accept/reject decisions the sync router makes. Nothing
    here labels by actor or group, so exported series never leak membership.

    Recording is a no-op until the host application installs a recorder.
*/

use crate::core_epoch::types::EpochReason;
use metrics::{counter, describe_counter, describe_histogram, histogram};

pub const RESULT_ACCEPTED: &str = "accepted";
pub const RESULT_REJECTED: &str = "rejected";

fn result_label(accepted: bool) -> &'static str {
    if accepted {
        RESULT_ACCEPTED
    } else {
        RESULT_REJECTED
    }
}

/// Initialize metric descriptions (call once at startup)
pub fn init_metrics() {
    describe_counter!(
        "trustmesh_auth_proofs_created_total",
        "Total number of auth proofs issued, labeled by scheme"
    );

    describe_counter!(
        "trustmesh_auth_proof_verifications_total",
        "Total number of auth proof verifications, labeled by result (accepted, rejected)"
    );

    describe_counter!(
        "trustmesh_epoch_increments_total",
        "Total number of epoch increments, labeled by reason (member_removed, key_rotation, manual)"
    );

    describe_counter!(
        "trustmesh_outgoing_messages_filtered_total",
        "Total number of outgoing messages considered by the sync filter, labeled by result (accepted, rejected)"
    );

    describe_counter!(
        "trustmesh_incoming_batches_total",
        "Total number of incoming sync batches, labeled by result (accepted, rejected)"
    );

    describe_counter!(
        "trustmesh_decryptions_rejected_total",
        "Total number of envelopes refused before decryption (foreign domain, stale epoch, insecure payload)"
    );

    describe_histogram!(
        "trustmesh_routed_batch_messages",
        "Number of messages per routed sync batch"
    );
}

/// Record an issued proof
pub fn record_proof_created(scheme: &'static str) {
    counter!("trustmesh_auth_proofs_created_total", "scheme" => scheme).increment(1);
}

/// Record a verification outcome
pub fn record_proof_verification(accepted: bool) {
    counter!("trustmesh_auth_proof_verifications_total", "result" => result_label(accepted)).increment(1);
}

/// Record an epoch increment
pub fn record_epoch_increment(reason: EpochReason) {
    counter!("trustmesh_epoch_increments_total", "reason" => reason.as_str()).increment(1);
}

/// Record outgoing messages passed or dropped by the sync filter
pub fn record_outgoing_filtered(accepted: bool, count: usize) {
    counter!("trustmesh_outgoing_messages_filtered_total", "result" => result_label(accepted))
        .increment(count as u64);
}

/// Record an incoming batch decision
pub fn record_incoming_batch(accepted: bool) {
    counter!("trustmesh_incoming_batches_total", "result" => result_label(accepted)).increment(1);
}

/// Record an envelope refused before decryption
pub fn record_decryption_rejected() {
    counter!("trustmesh_decryptions_rejected_total").increment(1);
}

/// Record the size of a routed batch
pub fn record_batch_size(messages: usize) {
    histogram!("trustmesh_routed_batch_messages").record(messages as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_compilation() {
        // No recorder installed; every call must be a harmless no-op
        init_metrics();
        record_proof_created("group-auth-v1");
        record_proof_verification(true);
        record_proof_verification(false);
        record_epoch_increment(EpochReason::MemberRemoved);
        record_outgoing_filtered(true, 3);
        record_incoming_batch(false);
        record_decryption_rejected();
        record_batch_size(12);
    }

    #[test]
    fn test_result_labels() {
        assert_eq!(result_label(true), "accepted");
        assert_eq!(result_label(false), "rejected");
    }
}

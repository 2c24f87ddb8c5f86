pub use lighthouse_metrics::*;

lazy_static! {
    pub static ref VC_ATTESTATIONS_SIGNED_TOTAL: Result<IntCounter> = try_create_int_counter(
        "vc_attestations_signed_total",
        "Count of attestations this validator client has signed"
    );
    pub static ref VC_BLOCKS_SIGNED_TOTAL: Result<IntCounter> = try_create_int_counter(
        "vc_blocks_signed_total",
        "Count of blocks this validator client has signed"
    );
    pub static ref VC_SYNC_MESSAGES_SIGNED_TOTAL: Result<IntCounter> = try_create_int_counter(
        "vc_sync_committee_messages_signed_total",
        "Count of sync committee messages this validator client has signed"
    );
}

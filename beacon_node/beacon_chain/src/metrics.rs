pub use lighthouse_metrics::*;

lazy_static! {
    pub static ref BLOCK_PROCESSING_TIMES: Result<Histogram> = try_create_histogram(
        "beacon_block_processing_seconds",
        "Full time taken to verify and import a block, from gossip/RPC to fork choice update"
    );
    pub static ref BLOCK_PRODUCTION_TIMES: Result<Histogram> = try_create_histogram(
        "beacon_block_production_seconds",
        "Full time taken to produce a new block"
    );
    pub static ref FORK_CHOICE_HEAD_TIMES: Result<Histogram> = try_create_histogram(
        "beacon_fork_choice_head_seconds",
        "Time taken to run get_head"
    );
    pub static ref ATTESTATION_PROCESSING_TIMES: Result<Histogram> = try_create_histogram(
        "beacon_attestation_processing_seconds",
        "Time taken to verify and import an attestation"
    );
    pub static ref OPERATIONS_PER_BLOCK_ATTESTATION: Result<Histogram> = try_create_histogram(
        "beacon_operations_per_block_attestation_total",
        "Number of attestations in a produced block"
    );
    pub static ref HEAD_SLOT: Result<IntGauge> =
        try_create_int_gauge("beacon_head_slot", "Slot of the current head block");
    pub static ref FINALIZED_EPOCH: Result<IntGauge> =
        try_create_int_gauge("beacon_finalized_epoch", "Current finalized epoch");
    pub static ref CURRENT_JUSTIFIED_EPOCH: Result<IntGauge> = try_create_int_gauge(
        "beacon_current_justified_epoch",
        "Current justified epoch"
    );
    pub static ref QUARANTINE_SIZE: Result<IntGauge> = try_create_int_gauge(
        "beacon_quarantine_size",
        "Number of blocks currently queued with an unknown parent"
    );
}

pub use lighthouse_metrics::*;

lazy_static! {
    pub static ref ATTESTATION_POOL_INSERT: Result<Histogram> = try_create_histogram(
        "operation_pool_attestation_insert_seconds",
        "Time taken to insert an attestation into the operation pool"
    );
    pub static ref ATTESTATION_POOL_GET: Result<Histogram> = try_create_histogram(
        "operation_pool_attestation_get_seconds",
        "Time taken to collect attestations for block assembly"
    );
    pub static ref ATTESTATION_POOL_SIZE: Result<IntGauge> = try_create_int_gauge(
        "operation_pool_attestation_pool_size",
        "Number of distinct attestation aggregates held in the pool"
    );
    pub static ref PROPOSER_SLASHING_POOL_SIZE: Result<IntGauge> = try_create_int_gauge(
        "operation_pool_proposer_slashing_pool_size",
        "Number of proposer slashings held in the pool"
    );
    pub static ref ATTESTER_SLASHING_POOL_SIZE: Result<IntGauge> = try_create_int_gauge(
        "operation_pool_attester_slashing_pool_size",
        "Number of attester slashings held in the pool"
    );
    pub static ref VOLUNTARY_EXIT_POOL_SIZE: Result<IntGauge> = try_create_int_gauge(
        "operation_pool_voluntary_exit_pool_size",
        "Number of voluntary exits held in the pool"
    );
}

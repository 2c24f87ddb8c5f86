use beacon_chain::AttestationError as AttnError;
pub use lighthouse_metrics::*;

lazy_static! {
    /*
     * Gossip Rx/Tx
     */
    pub static ref GOSSIP_BLOCKS_RX: Result<IntCounter> = try_create_int_counter(
        "network_gossip_blocks_rx_total",
        "Count of gossip blocks received"
    );
    pub static ref GOSSIP_ATTESTATIONS_RX: Result<IntCounter> = try_create_int_counter(
        "network_gossip_attestations_rx_total",
        "Count of gossip attestations received"
    );
    pub static ref GOSSIP_BLOCKS_TX: Result<IntCounter> = try_create_int_counter(
        "network_gossip_blocks_tx_total",
        "Count of gossip blocks transmitted"
    );
    pub static ref GOSSIP_ATTESTATIONS_TX: Result<IntCounter> = try_create_int_counter(
        "network_gossip_attestations_tx_total",
        "Count of gossip attestations transmitted"
    );

    /*
     * Gossip processor
     */
    pub static ref GOSSIP_PROCESSOR_WORKERS_SPAWNED_TOTAL: Result<IntCounter> = try_create_int_counter(
        "gossip_processor_workers_spawned_total",
        "The number of workers ever spawned by the gossip processing pool."
    );
    pub static ref GOSSIP_PROCESSOR_WORKERS_ACTIVE_TOTAL: Result<IntGauge> = try_create_int_gauge(
        "gossip_processor_workers_active_total",
        "Count of active workers in the gossip processing pool."
    );
    pub static ref GOSSIP_PROCESSOR_EVENTS_TOTAL: Result<IntCounter> = try_create_int_counter(
        "gossip_processor_events_total",
        "Count of events (work or worker-idle) processed by the gossip processor manager."
    );
    pub static ref GOSSIP_PROCESSOR_EVENT_HANDLING_SECONDS: Result<Histogram> = try_create_histogram(
        "gossip_processor_event_handling_seconds",
        "Time spent handling a new message and allocating it to a queue or worker."
    );
    pub static ref GOSSIP_PROCESSOR_WORKER_TIME: Result<Histogram> = try_create_histogram(
        "gossip_processor_worker_time",
        "Time taken for a worker to fully process some parcel of work."
    );
    pub static ref GOSSIP_PROCESSOR_ATTESTATION_QUEUE_TOTAL: Result<IntGauge> = try_create_int_gauge(
        "gossip_processor_attestation_queue_total",
        "Count of attestations waiting to be processed."
    );
    pub static ref GOSSIP_PROCESSOR_ATTESTATION_WORKER_TIME: Result<Histogram> = try_create_histogram(
        "gossip_processor_attestation_worker_time",
        "Time taken for a worker to fully process an attestation."
    );
    pub static ref GOSSIP_PROCESSOR_ATTESTATION_VERIFIED_TOTAL: Result<IntCounter> = try_create_int_counter(
        "gossip_processor_attestation_verified_total",
        "Total number of attestations verified for gossip."
    );
    pub static ref GOSSIP_PROCESSOR_ATTESTATION_IMPORTED_TOTAL: Result<IntCounter> = try_create_int_counter(
        "gossip_processor_attestation_imported_total",
        "Total number of attestations imported to the operation pool / fork choice."
    );

    /*
     * Attestation gossip-verification errors (spec.md §4.9: `Reject` penalizes, others don't)
     */
    pub static ref GOSSIP_ATTESTATION_ERROR_FUTURE_EPOCH: Result<IntCounter> = try_create_int_counter(
        "gossip_attestation_error_future_epoch", "Count of an specific error type (see metric name)");
    pub static ref GOSSIP_ATTESTATION_ERROR_PAST_EPOCH: Result<IntCounter> = try_create_int_counter(
        "gossip_attestation_error_past_epoch", "Count of an specific error type (see metric name)");
    pub static ref GOSSIP_ATTESTATION_ERROR_FUTURE_SLOT: Result<IntCounter> = try_create_int_counter(
        "gossip_attestation_error_future_slot", "Count of an specific error type (see metric name)");
    pub static ref GOSSIP_ATTESTATION_ERROR_PAST_SLOT: Result<IntCounter> = try_create_int_counter(
        "gossip_attestation_error_past_slot", "Count of an specific error type (see metric name)");
    pub static ref GOSSIP_ATTESTATION_ERROR_INVALID_SIGNATURE: Result<IntCounter> = try_create_int_counter(
        "gossip_attestation_error_invalid_signature", "Count of an specific error type (see metric name)");
    pub static ref GOSSIP_ATTESTATION_ERROR_UNKNOWN_HEAD_BLOCK: Result<IntCounter> = try_create_int_counter(
        "gossip_attestation_error_unknown_head_block", "Count of an specific error type (see metric name)");
    pub static ref GOSSIP_ATTESTATION_ERROR_NO_COMMITTEE_FOR_SLOT_AND_INDEX: Result<IntCounter> = try_create_int_counter(
        "gossip_attestation_error_no_committee_for_slot_and_index", "Count of an specific error type (see metric name)");
    pub static ref GOSSIP_ATTESTATION_ERROR_NOT_EXACTLY_ONE_AGGREGATION_BIT_SET: Result<IntCounter> = try_create_int_counter(
        "gossip_attestation_error_not_exactly_one_aggregation_bit_set", "Count of an specific error type (see metric name)");
    pub static ref GOSSIP_ATTESTATION_ERROR_BEACON_CHAIN_ERROR: Result<IntCounter> = try_create_int_counter(
        "gossip_attestation_error_beacon_chain_error", "Count of an specific error type (see metric name)");

    /*
     * Peer manager (C8)
     */
    pub static ref PEER_CONNECTED_PEERS: Result<IntGauge> = try_create_int_gauge(
        "peer_manager_connected_peers", "Count of peers currently in the Connected state");
    pub static ref PEER_DISCONNECTIONS_TOTAL: Result<IntCounter> = try_create_int_counter(
        "peer_manager_disconnections_total", "Count of peer disconnections initiated by this node");
    pub static ref PEER_BANS_TOTAL: Result<IntCounter> = try_create_int_counter(
        "peer_manager_bans_total", "Count of peers blacklisted for falling below the score floor");
    pub static ref PEER_SCORE_UPDATES_TOTAL: Result<IntCounter> = try_create_int_counter(
        "peer_manager_score_updates_total", "Count of peer score adjustments applied");

    /*
     * Sync manager (C10)
     */
    pub static ref SYNC_HEAD_SLOT: Result<IntGauge> = try_create_int_gauge(
        "sync_manager_head_slot", "The highest slot the sync manager believes the network has");
    pub static ref SYNC_TARGET_SLOT: Result<IntGauge> = try_create_int_gauge(
        "sync_manager_target_slot", "The slot the sliding window is currently advancing towards");
    pub static ref SYNC_REWINDS_TOTAL: Result<IntCounter> = try_create_int_counter(
        "sync_manager_rewinds_total", "Count of times the sliding window rewound after a gap or ordering violation");
}

pub fn register_attestation_error(error: &AttnError) {
    match error {
        AttnError::FutureEpoch { .. } => inc_counter(&GOSSIP_ATTESTATION_ERROR_FUTURE_EPOCH),
        AttnError::PastEpoch { .. } => inc_counter(&GOSSIP_ATTESTATION_ERROR_PAST_EPOCH),
        AttnError::FutureSlot { .. } => inc_counter(&GOSSIP_ATTESTATION_ERROR_FUTURE_SLOT),
        AttnError::PastSlot { .. } => inc_counter(&GOSSIP_ATTESTATION_ERROR_PAST_SLOT),
        AttnError::InvalidSignature => inc_counter(&GOSSIP_ATTESTATION_ERROR_INVALID_SIGNATURE),
        AttnError::UnknownHeadBlock { .. } => {
            inc_counter(&GOSSIP_ATTESTATION_ERROR_UNKNOWN_HEAD_BLOCK)
        }
        AttnError::NoCommitteeForSlotAndIndex { .. } => {
            inc_counter(&GOSSIP_ATTESTATION_ERROR_NO_COMMITTEE_FOR_SLOT_AND_INDEX)
        }
        AttnError::NotExactlyOneAggregationBitSet(_) => {
            inc_counter(&GOSSIP_ATTESTATION_ERROR_NOT_EXACTLY_ONE_AGGREGATION_BIT_SET)
        }
        AttnError::BeaconChainError(_) => inc_counter(&GOSSIP_ATTESTATION_ERROR_BEACON_CHAIN_ERROR),
    }
}

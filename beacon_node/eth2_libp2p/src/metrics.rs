pub use lighthouse_metrics::*;

lazy_static! {
    pub static ref PEERS_CONNECTED: Result<IntGauge> =
        try_create_int_gauge("libp2p_peers", "Count of libp2p peers currently connected");
    pub static ref GOSSIPSUB_SUBSCRIBED_PEERS: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "libp2p_gossipsub_subscribed_peers",
        "Count of peers subscribed per gossip topic",
        &["topic"]
    );
    pub static ref RPC_REQUESTS_TOTAL: Result<IntCounterVec> = try_create_int_counter_vec(
        "libp2p_rpc_requests_total",
        "Count of RPC requests sent, by protocol",
        &["protocol"]
    );
    pub static ref RPC_ERRORS_TOTAL: Result<IntCounterVec> = try_create_int_counter_vec(
        "libp2p_rpc_errors_total",
        "Count of RPC errors received, by protocol",
        &["protocol"]
    );
}

//! Protocol-level network configuration: peer targets, gossipsub tuning knobs, and the local
//! data directory. Transport concerns that a real libp2p stack would own (multiaddrs, discv5
//! session parameters, noise/yamux settings) are not represented here — they belong to whatever
//! implements the [`crate::service::Eth2Libp2pService`] trait boundary.

use crate::types::GossipKind;
use crate::PeerIdSerialized;
use directory::{DEFAULT_BEACON_NODE_DIR, DEFAULT_ROOT_DIR};
use serde_derive::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const GOSSIP_MAX_SIZE: usize = 1_048_576;

/// Gossipsub's message-acceptance verdict, returned by a topic validator. `Accept` propagates and
/// credits the sender; `Ignore` neither propagates nor penalizes; `Reject` penalizes the sender
/// and drops the message (spec.md §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationResult {
    Accept,
    Ignore,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GossipsubConfig {
    pub max_transmit_size: usize,
    pub heartbeat_interval: Duration,
    pub mesh_n: usize,
    pub mesh_n_low: usize,
    pub mesh_n_high: usize,
    pub history_length: usize,
    pub history_gossip: usize,
    /// How long a message id is remembered to suppress re-delivery of duplicates.
    pub duplicate_cache_time: Duration,
}

impl Default for GossipsubConfig {
    fn default() -> Self {
        GossipsubConfig {
            max_transmit_size: GOSSIP_MAX_SIZE,
            heartbeat_interval: Duration::from_millis(700),
            mesh_n: 8,
            mesh_n_low: 6,
            mesh_n_high: 12,
            history_length: 12,
            history_gossip: 3,
            // 550 heartbeats * 700ms.
            duplicate_cache_time: Duration::from_secs(385),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the network private key and persisted DHT/peer records.
    pub network_dir: PathBuf,

    pub listen_address: IpAddr,
    pub libp2p_port: u16,
    pub discovery_port: u16,

    /// Target number of connected peers (spec.md §6 `max_peers`).
    pub target_peers: usize,
    /// Kick threshold; defaults to 1.5x `target_peers`.
    pub hard_max_peers: usize,

    pub gs_config: GossipsubConfig,

    /// ENRs to dial at startup.
    pub boot_nodes_enr: Vec<String>,
    /// Peers that are never scored or disconnected for low score.
    pub trusted_peers: Vec<PeerIdSerialized>,

    pub discovery_enabled: bool,
    pub client_version: String,

    /// Subscribe to every attestation subnet for the duration of the runtime, rather than only
    /// the ones local validators need.
    pub subscribe_all_subnets: bool,

    pub topics: Vec<GossipKind>,

    /// Dial timeout for new outbound connections (spec.md §5: 60s, or 10s in local-testnet mode).
    pub dial_timeout: Duration,
    /// How often the metadata pinger refreshes a peer's attnets/syncnets bitfield.
    pub metadata_refresh_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        let network_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_ROOT_DIR)
            .join(DEFAULT_BEACON_NODE_DIR)
            .join("network");

        let target_peers = 50;
        Config {
            network_dir,
            listen_address: "0.0.0.0".parse().expect("valid ip address"),
            libp2p_port: 9000,
            discovery_port: 9000,
            target_peers,
            hard_max_peers: target_peers + target_peers / 2,
            gs_config: GossipsubConfig::default(),
            boot_nodes_enr: vec![],
            trusted_peers: vec![],
            discovery_enabled: true,
            client_version: "lighthouse-student/v0.1.0".to_string(),
            subscribe_all_subnets: false,
            topics: Vec::new(),
            dial_timeout: Duration::from_secs(60),
            metadata_refresh_interval: Duration::from_secs(30 * 60),
        }
    }
}

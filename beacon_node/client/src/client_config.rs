use directory::DEFAULT_BEACON_NODE_DIR;
use serde_derive::{Deserialize, Serialize};
use std::path::PathBuf;
use types::{ChainSpec, Graffiti};

/// How this node's genesis state is obtained. There is no bootstrap-from-peer path in this
/// workspace (`BeaconChainBuilder` only ever starts `from_genesis`, see
/// `beacon_chain::BeaconChainBuilder`), so this only chooses between the two local ways of
/// producing one.
#[derive(Debug, Clone)]
pub enum ClientGenesis {
    /// `genesis::interop_genesis_state` with `validator_count` deterministic interop keys.
    Interop {
        validator_count: usize,
        genesis_time: u64,
    },
    /// `genesis::state_from_deposit_cache`, replaying an `eth1::DepositCache` built up from
    /// `Client::add_eth1_deposit`.
    FromDepositCache {
        eth1_block_hash: types::Hash256,
        eth1_timestamp: u64,
        genesis_time: u64,
    },
}

/// Stores the client configuration for this beacon node instance.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub data_dir: PathBuf,
    pub db_name: PathBuf,
    pub spec: ChainSpec,
    pub store: store::StoreConfig,
    pub chain: beacon_chain::ChainConfig,
    pub network: eth2_libp2p::Config,
    pub genesis: ClientGenesis,
    /// Graffiti this node embeds in any block it proposes through its in-process validator
    /// client; only read when `validator_client` is `Some`.
    pub graffiti: Graffiti,
    /// Local validator indices/keypairs to run in-process (spec.md §A: no REST duties client in
    /// this workspace, see `validator_client::ValidatorClient`). Empty means no local validators.
    pub validator_client: Option<validator_client::Config>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let data_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_BEACON_NODE_DIR);
        Self {
            db_name: data_dir.join("chain_db"),
            data_dir,
            spec: ChainSpec::mainnet(),
            store: store::StoreConfig::default(),
            chain: beacon_chain::ChainConfig::default(),
            network: eth2_libp2p::Config::default(),
            genesis: ClientGenesis::Interop {
                validator_count: 16,
                genesis_time: genesis::recent_genesis_time(5),
            },
            graffiti: Graffiti::default(),
            validator_client: None,
        }
    }
}

/// On-disk representation of [`ClientConfig`], minus the types that don't round-trip through
/// serde (`ChainSpec`'s preset fields aren't `Serialize`; callers that need a non-mainnet spec
/// set `ClientConfig::spec` after loading this).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigFile {
    pub data_dir: PathBuf,
    pub db_name: PathBuf,
    pub network: eth2_libp2p::Config,
}

impl Default for ClientConfigFile {
    fn default() -> Self {
        let defaults = ClientConfig::default();
        Self {
            data_dir: defaults.data_dir,
            db_name: defaults.db_name,
            network: defaults.network,
        }
    }
}

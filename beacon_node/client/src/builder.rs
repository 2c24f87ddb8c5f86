//! Assembles a [`Client`] the same way `beacon_chain::BeaconChainBuilder` assembles a
//! `BeaconChain`: pieces are supplied one at a time and `build()` fails loudly if a required one
//! is missing, rather than a constructor with a dozen positional arguments.

use crate::client_config::ClientGenesis;
use crate::Client;
use beacon_chain::{BeaconChain, BeaconChainTypes, ChainConfig, InteropEth1Chain};
use eth1::DepositCache;
use network::SyncManager;
use parking_lot::Mutex;
use slog::{info, Logger};
use slot_clock::SlotClock;
use std::sync::Arc;
use std::time::Duration;
use types::{BeaconState, ChainSpec};

pub struct ClientBuilder<T: BeaconChainTypes> {
    store: Option<Arc<T::Store>>,
    slot_clock: Option<T::SlotClock>,
    genesis_state: Option<BeaconState<T::EthSpec>>,
    chain_config: ChainConfig,
    validator_client: Option<validator_client::ValidatorClient<T>>,
    log: Logger,
}

impl<T: BeaconChainTypes> ClientBuilder<T> {
    pub fn new(log: Logger) -> Self {
        Self {
            store: None,
            slot_clock: None,
            genesis_state: None,
            chain_config: ChainConfig::default(),
            validator_client: None,
            log,
        }
    }

    pub fn store(mut self, store: Arc<T::Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn chain_config(mut self, chain_config: ChainConfig) -> Self {
        self.chain_config = chain_config;
        self
    }

    pub fn validator_client(mut self, vc: validator_client::ValidatorClient<T>) -> Self {
        self.validator_client = Some(vc);
        self
    }

    /// Builds the genesis state described by `genesis` and wires a [`SlotClock`] to it, ready
    /// for `build()`.
    pub fn genesis(
        mut self,
        genesis: &ClientGenesis,
        spec: &ChainSpec,
    ) -> Result<Self, String> {
        let genesis_state = match genesis {
            ClientGenesis::Interop {
                validator_count,
                genesis_time,
            } => genesis::interop_genesis_state::<T::EthSpec>(*validator_count, *genesis_time, spec)
                .map_err(|e| format!("Unable to build interop genesis state: {:?}", e))?,
            ClientGenesis::FromDepositCache {
                eth1_block_hash,
                eth1_timestamp,
                genesis_time,
            } => {
                let cache = DepositCache::default();
                genesis::state_from_deposit_cache::<T::EthSpec>(
                    *eth1_block_hash,
                    *eth1_timestamp,
                    *genesis_time,
                    &cache,
                    spec,
                )
                .map_err(|e| format!("Unable to build genesis state from deposit cache: {:?}", e))?
            }
        };

        let genesis_time = genesis_state.genesis_time();
        self.slot_clock = Some(T::SlotClock::new(
            spec.genesis_slot,
            Duration::from_secs(genesis_time),
            Duration::from_secs(spec.seconds_per_slot),
        ));

        info!(self.log, "Genesis state built"; "validators" => genesis_state.validators().len(), "genesis_time" => genesis_time);

        self.genesis_state = Some(genesis_state);
        Ok(self)
    }

    pub fn build(self, spec: ChainSpec) -> Result<Client<T>, String> {
        let store = self.store.ok_or("ClientBuilder requires a store")?;
        let slot_clock = self.slot_clock.ok_or("ClientBuilder requires genesis() to be called first")?;
        let genesis_state = self
            .genesis_state
            .ok_or("ClientBuilder requires genesis() to be called first")?;
        let genesis_block = genesis::genesis_block(&genesis_state, &spec);

        let eth1_chain: Option<Box<dyn beacon_chain::Eth1Chain<T> + Send + Sync>> =
            Some(Box::new(InteropEth1Chain::default()));

        let beacon_chain = BeaconChain::from_genesis(
            store,
            slot_clock,
            eth1_chain,
            genesis_state,
            genesis_block,
            self.chain_config,
            spec,
            self.log.clone(),
        )
        .map_err(|e| format!("Unable to build beacon chain: {:?}", e))?;
        let beacon_chain = Arc::new(beacon_chain);

        let sync = SyncManager::new(beacon_chain.clone(), 32, self.log.clone());

        Ok(Client {
            beacon_chain,
            sync: Arc::new(Mutex::new(sync)),
            validator_client: self.validator_client,
            log: self.log,
        })
    }
}

//! Wires C1 (the slot clock) through C10 (the sync manager) into a single running node: builds
//! the genesis `BeaconChain` (`ClientBuilder`), then drives a per-slot loop off `SlotClock` the
//! same way `validator_client::ValidatorClient::start` drives its own duty loop, spawned on the
//! shared `TaskExecutor`.

mod builder;
mod client_config;

pub use beacon_chain::{BeaconChainTypes, ChainConfig};
pub use builder::ClientBuilder;
pub use client_config::{ClientConfig, ClientConfigFile, ClientGenesis};

use beacon_chain::BeaconChain;
use network::{SyncManager, SyncMessage};
use parking_lot::Mutex;
use slog::{debug, info, Logger};
use slot_clock::SlotClock;
use std::sync::Arc;
use task_executor::TaskExecutor;
use types::EthSpec;
use validator_client::ValidatorClient;

/// A fully-assembled node: a `BeaconChain` plus the background services that keep it moving
/// forward in time. Holds `sync` idle — nothing in this workspace feeds it `SyncMessage`s, since
/// no concrete `Eth2LibP2pService` is implemented (see `eth2_libp2p::service`) — but it is wired
/// up and ready for whatever supplies real `NetworkEvent`s to drive it via `handle_message`.
pub struct Client<T: BeaconChainTypes> {
    pub(crate) beacon_chain: Arc<BeaconChain<T>>,
    pub(crate) sync: Arc<Mutex<SyncManager<T>>>,
    pub(crate) validator_client: Option<ValidatorClient<T>>,
    pub(crate) log: Logger,
}

impl<T: BeaconChainTypes> Client<T> {
    pub fn beacon_chain(&self) -> Arc<BeaconChain<T>> {
        self.beacon_chain.clone()
    }

    /// Attaches an in-process validator client built from this node's own `beacon_chain()`,
    /// replacing any validator client already attached. Kept separate from `ClientBuilder`
    /// because a `ValidatorClient` needs the already-built `BeaconChain` it signs duties
    /// against.
    pub fn attach_validator_client(&mut self, validator_client: ValidatorClient<T>) {
        self.validator_client = Some(validator_client);
    }

    /// Feeds a sync message straight to the (idle, until wired to a transport) sync manager.
    pub fn handle_sync_message(&self, peer_id: eth2_libp2p::PeerId, message: SyncMessage<T::EthSpec>) {
        self.sync.lock().handle_message(peer_id, message);
    }

    /// Spawns the slot-timer loop and, if configured, the in-process validator client. Returns
    /// immediately; both loops run until `executor`'s shutdown signal fires.
    pub fn start(&mut self, executor: TaskExecutor, slot_clock: T::SlotClock) {
        let chain = self.beacon_chain.clone();
        let log = self.log.clone();
        let clock = slot_clock.clone();

        executor.spawn(
            async move {
                loop {
                    let sleep_time = match clock.duration_to_next_slot() {
                        Some(duration) => duration,
                        None => clock.slot_duration(),
                    };
                    tokio::time::sleep(sleep_time).await;

                    match clock.now() {
                        Some(slot) => {
                            debug!(log, "Slot tick"; "slot" => slot.as_u64(), "head" => ?chain.canonical_head_block_root());
                        }
                        None => continue,
                    }
                }
            },
            "client_slot_timer",
        );

        if let Some(validator_client) = self.validator_client.take() {
            info!(self.log, "Starting in-process validator client"; "validators" => validator_client.num_validators());
            validator_client.start(executor, slot_clock);
        }
    }
}

/// The concrete [`BeaconChainTypes`] every `lighthouse` binary invocation runs: an in-memory
/// store and the real system clock. There is no on-disk `HotColdDB<LevelDB<E>>` wiring in this
/// workspace yet — `ClientConfig::db_name` is read but unused until that lands.
pub struct InteropClientTypes<E: EthSpec>(std::marker::PhantomData<E>);

impl<E: EthSpec + Send + Sync + 'static> BeaconChainTypes for InteropClientTypes<E> {
    type Store = store::MemoryStore<E>;
    type SlotClock = slot_clock::SystemTimeSlotClock;
    type EthSpec = E;
}

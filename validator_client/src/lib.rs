//! C11 (spec.md §4.11): computes each local validator's upcoming attestation, proposal and
//! sync-committee duties one epoch ahead from the chain's head state, and drives them to
//! completion as their slot deadlines arrive. This workspace has no networked REST duties API or
//! remote signer (SPEC_FULL.md §A Non-goals) — `ValidatorClient` is driven directly against an
//! in-process `BeaconChain`, the way `beacon_node/network`'s `SyncManager` is driven directly
//! against one rather than through a client library.

#[macro_use]
extern crate lazy_static;

mod attestation_service;
mod block_service;
mod config;
mod duties_service;
mod metrics;
mod sync_committee_service;
mod validator_store;

pub use config::Config;
pub use duties_service::{AttesterDuty, DutiesService, ProposerDuty, SyncDuty};
pub use validator_store::{Error as SigningError, ValidatorStore};

use attestation_service::AttestationService;
use beacon_chain::{BeaconChain, BeaconChainTypes};
use block_service::BlockService;
use slog::{info, Logger};
use slot_clock::SlotClock;
use std::sync::Arc;
use sync_committee_service::SyncCommitteeService;
use task_executor::TaskExecutor;

/// Owns the three duty-driving services and the executor they're spawned on. Analogous to
/// `beacon_node/client`'s event-loop wiring, but for the validator side of the process.
pub struct ValidatorClient<T: BeaconChainTypes> {
    duties_service: Arc<DutiesService<T>>,
    attestation_service: AttestationService<T>,
    block_service: BlockService<T>,
    sync_committee_service: SyncCommitteeService<T>,
    log: Logger,
}

impl<T: BeaconChainTypes> ValidatorClient<T> {
    pub fn new(
        chain: Arc<BeaconChain<T>>,
        validator_store: Arc<ValidatorStore>,
        config: Config,
        log: Logger,
    ) -> Self {
        let duties_service = Arc::new(DutiesService::new(
            chain.clone(),
            validator_store.clone(),
            log.clone(),
        ));
        Self {
            attestation_service: AttestationService::new(
                chain.clone(),
                duties_service.clone(),
                validator_store.clone(),
                log.clone(),
            ),
            block_service: BlockService::new(
                chain.clone(),
                duties_service.clone(),
                validator_store.clone(),
                config.graffiti,
                log.clone(),
            ),
            sync_committee_service: SyncCommitteeService::new(
                chain,
                duties_service.clone(),
                validator_store,
                log.clone(),
            ),
            duties_service,
            log,
        }
    }

    pub fn num_validators(&self) -> usize {
        self.duties_service.num_validators()
    }

    /// Spawns the per-slot duty loop on `executor`. Each tick recomputes duties if a new epoch
    /// has started, then fires whichever of attest/propose/sync-committee are due this slot.
    pub fn start(self, executor: TaskExecutor, slot_clock: T::SlotClock) {
        info!(self.log, "Validator client started"; "validators" => self.duties_service.num_validators());
        let log = self.log.clone();
        let duties_service = self.duties_service;
        let attestation_service = self.attestation_service;
        let block_service = self.block_service;
        let sync_committee_service = self.sync_committee_service;

        executor.spawn(
            async move {
                loop {
                    let sleep = match slot_clock.duration_to_next_slot() {
                        Some(d) => d,
                        None => {
                            tokio::time::sleep(slot_clock.slot_duration()).await;
                            continue;
                        }
                    };
                    tokio::time::sleep(sleep).await;
                    let slot = match slot_clock.now() {
                        Some(slot) => slot,
                        None => continue,
                    };

                    if let Err(e) = duties_service.update_if_new_epoch(slot) {
                        slog::error!(log, "Failed to update duties"; "error" => ?e);
                        continue;
                    }

                    block_service.do_duty(slot);
                    attestation_service.do_duty(slot);
                    sync_committee_service.do_duty(slot);
                }
            },
            "validator_client_slot_timer",
        );
    }
}

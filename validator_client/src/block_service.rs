//! Drives step 2 of spec.md §4.11 ("Propose"): assembles a block via `BeaconChain::produce_block`,
//! signs it, and imports it straight back through `BeaconChain::process_block`.

use crate::duties_service::DutiesService;
use crate::metrics;
use crate::validator_store::ValidatorStore;
use beacon_chain::{BeaconChain, BeaconChainTypes};
use slog::{error, info, Logger};
use std::sync::Arc;
use types::{EthSpec, Graffiti, Slot};

pub struct BlockService<T: BeaconChainTypes> {
    chain: Arc<BeaconChain<T>>,
    duties_service: Arc<DutiesService<T>>,
    validator_store: Arc<ValidatorStore>,
    graffiti: Graffiti,
    log: Logger,
}

impl<T: BeaconChainTypes> BlockService<T> {
    pub fn new(
        chain: Arc<BeaconChain<T>>,
        duties_service: Arc<DutiesService<T>>,
        validator_store: Arc<ValidatorStore>,
        graffiti: Graffiti,
        log: Logger,
    ) -> Self {
        Self {
            chain,
            duties_service,
            validator_store,
            graffiti,
            log,
        }
    }

    pub fn do_duty(&self, slot: Slot) {
        for duty in self.duties_service.proposer_duties_for_slot(slot) {
            let fork = *self.chain.head().beacon_state.fork();
            let epoch = slot.epoch(T::EthSpec::slots_per_epoch());

            let randao_reveal = match self.validator_store.randao_reveal(duty.validator_index, epoch, &fork) {
                Ok(sig) => sig,
                Err(e) => {
                    error!(self.log, "Failed to produce RANDAO reveal";
                        "validator_index" => duty.validator_index, "error" => ?e);
                    continue;
                }
            };

            let block = match self.chain.produce_block(randao_reveal, slot, self.graffiti) {
                Ok(block) => block,
                Err(e) => {
                    error!(self.log, "Failed to produce block";
                        "slot" => slot.as_u64(), "error" => ?e);
                    continue;
                }
            };

            let signed_block = match self
                .validator_store
                .sign_block::<T::EthSpec>(duty.validator_index, block, &fork)
            {
                Ok(signed) => signed,
                Err(e) => {
                    error!(self.log, "Failed to sign block";
                        "validator_index" => duty.validator_index, "error" => ?e);
                    continue;
                }
            };

            match self.chain.process_block(signed_block) {
                Ok(status) => {
                    metrics::inc_counter(&metrics::VC_BLOCKS_SIGNED_TOTAL);
                    info!(self.log, "Published block"; "slot" => slot.as_u64(), "status" => ?status);
                }
                Err(e) => error!(self.log, "Failed to import own block";
                    "slot" => slot.as_u64(), "error" => ?e),
            }
        }
    }
}

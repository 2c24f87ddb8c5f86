//! Drives step 3 of spec.md §4.11 ("Sync-committee"): every slot, each local validator currently
//! in the sync committee signs the head block root. Aggregation into a `SyncAggregate` for the
//! next block is `BeaconChain::produce_block`'s concern (it pulls from the attestation/exit/
//! slashing pools the same way); this service only produces and records individual messages.

use crate::duties_service::DutiesService;
use crate::metrics;
use crate::validator_store::ValidatorStore;
use beacon_chain::{BeaconChain, BeaconChainTypes};
use slog::{debug, error, Logger};
use std::sync::Arc;
use types::{EthSpec, Slot};

pub struct SyncCommitteeService<T: BeaconChainTypes> {
    chain: Arc<BeaconChain<T>>,
    duties_service: Arc<DutiesService<T>>,
    validator_store: Arc<ValidatorStore>,
    log: Logger,
}

impl<T: BeaconChainTypes> SyncCommitteeService<T> {
    pub fn new(
        chain: Arc<BeaconChain<T>>,
        duties_service: Arc<DutiesService<T>>,
        validator_store: Arc<ValidatorStore>,
        log: Logger,
    ) -> Self {
        Self {
            chain,
            duties_service,
            validator_store,
            log,
        }
    }

    pub fn do_duty(&self, slot: Slot) {
        let duties = self.duties_service.sync_duties();
        if duties.is_empty() {
            return;
        }

        let head = self.chain.head();
        let beacon_block_root = head.beacon_block_root;
        let fork = *head.beacon_state.fork();
        drop(head);
        let epoch = slot.epoch(T::EthSpec::slots_per_epoch());

        for duty in duties {
            match self.validator_store.sign_sync_committee_message(
                duty.validator_index,
                epoch,
                beacon_block_root,
                &fork,
            ) {
                Ok(_signature) => {
                    metrics::inc_counter(&metrics::VC_SYNC_MESSAGES_SIGNED_TOTAL);
                    debug!(self.log, "Signed sync committee message";
                        "validator_index" => duty.validator_index, "slot" => slot.as_u64());
                }
                Err(e) => error!(self.log, "Failed to sign sync committee message";
                    "validator_index" => duty.validator_index, "error" => ?e),
            }
        }
    }
}

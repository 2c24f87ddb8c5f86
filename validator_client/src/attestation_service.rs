//! Drives step 1 of spec.md §4.11 ("Attest"): for every local validator with a duty in the
//! current slot, builds `AttestationData` off the head, signs it, and feeds it straight into
//! `BeaconChain::process_attestation` — this workspace's stand-in for "publish" (SPEC_FULL.md §A:
//! no gossip/REST surface here, see `beacon_node/network` for that boundary).

use crate::duties_service::DutiesService;
use crate::metrics;
use crate::validator_store::ValidatorStore;
use beacon_chain::{BeaconChain, BeaconChainTypes};
use slog::{error, Logger};
use std::sync::Arc;
use types::{AttestationData, Checkpoint, EthSpec, Slot};

pub struct AttestationService<T: BeaconChainTypes> {
    chain: Arc<BeaconChain<T>>,
    duties_service: Arc<DutiesService<T>>,
    validator_store: Arc<ValidatorStore>,
    log: Logger,
}

impl<T: BeaconChainTypes> AttestationService<T> {
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
        let duties = self.duties_service.attester_duties_for_slot(slot);
        if duties.is_empty() {
            return;
        }

        let head = self.chain.head();
        let beacon_block_root = head.beacon_block_root;
        let current_epoch = head.beacon_state.current_epoch();
        let epoch_start_slot = current_epoch.start_slot(T::EthSpec::slots_per_epoch());
        let target_root = if head.beacon_state.slot() == epoch_start_slot {
            beacon_block_root
        } else {
            match head.beacon_state.get_block_root(epoch_start_slot) {
                Ok(root) => *root,
                Err(_) => beacon_block_root,
            }
        };
        let source = *head.beacon_state.current_justified_checkpoint();
        let fork = *head.beacon_state.fork();
        drop(head);

        for duty in duties {
            let data = AttestationData {
                slot,
                index: duty.committee_index,
                beacon_block_root,
                source,
                target: Checkpoint::new(current_epoch, target_root),
            };

            let attestation = self.validator_store.sign_attestation::<T::EthSpec>(
                duty.validator_index,
                duty.committee_position,
                duty.committee_len,
                data,
                &fork,
            );

            match attestation {
                Ok(attestation) => {
                    if let Err(e) = self.chain.process_attestation(attestation) {
                        error!(self.log, "Failed to process own attestation";
                            "validator_index" => duty.validator_index, "error" => ?e);
                    } else {
                        metrics::inc_counter(&metrics::VC_ATTESTATIONS_SIGNED_TOTAL);
                    }
                }
                Err(e) => error!(self.log, "Failed to sign attestation";
                    "validator_index" => duty.validator_index, "error" => ?e),
            }
        }
    }
}

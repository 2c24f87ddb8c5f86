//! Computes each local validator's duties for the epoch one ahead of the current one, from the
//! chain's head state advanced to that epoch's first slot (spec.md §4.11: "one epoch ahead using
//! the head state").

use crate::validator_store::ValidatorStore;
use beacon_chain::{BeaconChain, BeaconChainTypes};
use parking_lot::RwLock;
use slog::{debug, Logger};
use std::sync::Arc;
use types::{Epoch, EthSpec, RelativeEpoch, Slot};

#[derive(Debug, Clone, Copy)]
pub struct AttesterDuty {
    pub validator_index: usize,
    pub slot: Slot,
    pub committee_index: u64,
    pub committee_position: usize,
    pub committee_len: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct ProposerDuty {
    pub validator_index: usize,
    pub slot: Slot,
}

#[derive(Debug, Clone, Copy)]
pub struct SyncDuty {
    pub validator_index: usize,
}

#[derive(Debug)]
pub enum Error {
    BeaconChain(beacon_chain::BeaconChainError),
    BeaconState(types::BeaconStateError),
}

impl From<beacon_chain::BeaconChainError> for Error {
    fn from(e: beacon_chain::BeaconChainError) -> Self {
        Error::BeaconChain(e)
    }
}

impl From<types::BeaconStateError> for Error {
    fn from(e: types::BeaconStateError) -> Self {
        Error::BeaconState(e)
    }
}

#[derive(Default)]
struct Duties {
    epoch: Option<Epoch>,
    attesters: Vec<AttesterDuty>,
    proposers: Vec<ProposerDuty>,
    sync: Vec<SyncDuty>,
}

pub struct DutiesService<T: BeaconChainTypes> {
    chain: Arc<BeaconChain<T>>,
    validator_store: Arc<ValidatorStore>,
    duties: RwLock<Duties>,
    log: Logger,
}

impl<T: BeaconChainTypes> DutiesService<T> {
    pub fn new(chain: Arc<BeaconChain<T>>, validator_store: Arc<ValidatorStore>, log: Logger) -> Self {
        Self {
            chain,
            validator_store,
            duties: RwLock::new(Duties::default()),
            log,
        }
    }

    pub fn num_validators(&self) -> usize {
        self.validator_store.num_validators()
    }

    /// Recomputes duties for `current_slot`'s epoch plus one, unless they were already computed
    /// for that target epoch.
    pub fn update_if_new_epoch(&self, current_slot: Slot) -> Result<(), Error> {
        let slots_per_epoch = T::EthSpec::slots_per_epoch();
        let target_epoch = current_slot.epoch(slots_per_epoch) + 1;

        if self.duties.read().epoch == Some(target_epoch) {
            return Ok(());
        }

        let indices = self.validator_store.validator_indices();
        if indices.is_empty() {
            *self.duties.write() = Duties {
                epoch: Some(target_epoch),
                ..Duties::default()
            };
            return Ok(());
        }

        let target_slot = target_epoch.start_slot(slots_per_epoch);
        let state = self.chain.state_at_slot(target_slot)?;
        let relative_epoch = RelativeEpoch::from_epoch(state.current_epoch(), target_epoch)
            .unwrap_or(RelativeEpoch::Current);

        let mut attesters = Vec::new();
        let mut proposers = Vec::new();
        let mut sync = Vec::new();

        for &validator_index in &indices {
            if let Some(duty) = state.get_attestation_duties(validator_index, relative_epoch)? {
                attesters.push(AttesterDuty {
                    validator_index,
                    slot: duty.slot,
                    committee_index: duty.index,
                    committee_position: duty.committee_position,
                    committee_len: duty.committee_len,
                });
            }
            let in_sync_committee = state
                .current_sync_committee()
                .ok()
                .zip(state.validators().get(validator_index))
                .map_or(false, |(committee, validator)| {
                    committee.pubkeys.iter().any(|pk| *pk == validator.pubkey)
                });
            if in_sync_committee {
                sync.push(SyncDuty { validator_index });
            }
        }

        for slot in target_epoch.slot_iter(slots_per_epoch) {
            let proposer_state = self.chain.state_at_slot(slot)?;
            let proposer_index = proposer_state.get_beacon_proposer_index(slot, &self.chain.spec)?;
            if indices.contains(&proposer_index) {
                proposers.push(ProposerDuty {
                    validator_index: proposer_index,
                    slot,
                });
            }
        }

        debug!(
            self.log, "Updated validator duties";
            "epoch" => target_epoch.as_u64(),
            "attesters" => attesters.len(),
            "proposers" => proposers.len(),
            "sync" => sync.len(),
        );

        *self.duties.write() = Duties {
            epoch: Some(target_epoch),
            attesters,
            proposers,
            sync,
        };
        Ok(())
    }

    pub fn attester_duties_for_slot(&self, slot: Slot) -> Vec<AttesterDuty> {
        self.duties
            .read()
            .attesters
            .iter()
            .filter(|d| d.slot == slot)
            .copied()
            .collect()
    }

    pub fn proposer_duties_for_slot(&self, slot: Slot) -> Vec<ProposerDuty> {
        self.duties
            .read()
            .proposers
            .iter()
            .filter(|d| d.slot == slot)
            .copied()
            .collect()
    }

    pub fn sync_duties(&self) -> Vec<SyncDuty> {
        self.duties.read().sync.clone()
    }
}

//! The on-disk shape of a restore-point/diff state (§4.2): everything a full `BeaconState`
//! carries except the validator registry, which is split into [`ImmutableValidator`] (written
//! once, ever, per validator, to the `immutable_validators` column) and [`ValidatorMutable`]
//! (the handful of fields that actually change, carried inline here). Grounded on the
//! lazy-loading `PartialBeaconState` pattern from the wider corpus, generalized from its
//! pre-altair field set to ours and built around the registry split rather than the vector
//! fields (§4.2's rationale: "a typical state is >90% validator pubkeys").

use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use ssz_types::{BitVector, FixedVector, VariableList};
use std::sync::Arc;
use tree_hash_derive::TreeHash;
use types::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct ImmutableValidator {
    pub pubkey: PublicKeyBytes,
    pub withdrawal_credentials: Hash256,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct ValidatorMutable {
    pub effective_balance: u64,
    pub slashed: bool,
    pub activation_eligibility_epoch: Epoch,
    pub activation_epoch: Epoch,
    pub exit_epoch: Epoch,
    pub withdrawable_epoch: Epoch,
}

pub fn split_validator(validator: &Validator) -> (ImmutableValidator, ValidatorMutable) {
    (
        ImmutableValidator {
            pubkey: validator.pubkey.clone(),
            withdrawal_credentials: validator.withdrawal_credentials,
        },
        ValidatorMutable {
            effective_balance: validator.effective_balance,
            slashed: validator.slashed,
            activation_eligibility_epoch: validator.activation_eligibility_epoch,
            activation_epoch: validator.activation_epoch,
            exit_epoch: validator.exit_epoch,
            withdrawable_epoch: validator.withdrawable_epoch,
        },
    )
}

pub fn join_validator(immutable: &ImmutableValidator, mutable: &ValidatorMutable) -> Validator {
    Validator {
        pubkey: immutable.pubkey.clone(),
        withdrawal_credentials: immutable.withdrawal_credentials,
        effective_balance: mutable.effective_balance,
        slashed: mutable.slashed,
        activation_eligibility_epoch: mutable.activation_eligibility_epoch,
        activation_epoch: mutable.activation_epoch,
        exit_epoch: mutable.exit_epoch,
        withdrawable_epoch: mutable.withdrawable_epoch,
    }
}

/// Everything a `BeaconState<T>` holds except `validators`. One value of this type backs both
/// the `BeaconState` column (restore points) and the `BeaconStateDiff` column (every other
/// slot); which column a given instance lives in is a property of how `HotColdDB` chose to
/// write it, not of this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
#[serde(bound = "T: EthSpec")]
pub struct PartialBeaconState<T: EthSpec> {
    /// `ForkName` as a raw discriminant: SSZ has no native encoding for a bare enum, and this
    /// value never needs to be anything but `0`/`1`/`2` on the wire.
    pub fork_name_byte: u8,

    pub genesis_time: u64,
    pub genesis_validators_root: Hash256,
    pub slot: Slot,
    pub fork: Fork,

    pub latest_block_header: BeaconBlockHeader,
    pub block_roots: FixedVector<Hash256, T::SlotsPerHistoricalRoot>,
    pub state_roots: FixedVector<Hash256, T::SlotsPerHistoricalRoot>,
    pub historical_roots: VariableList<Hash256, T::HistoricalRootsLimit>,

    pub eth1_data: Eth1Data,
    pub eth1_data_votes: VariableList<Eth1Data, T::SlotsPerEpoch>,
    pub eth1_deposit_index: u64,

    pub balances: VariableList<u64, T::ValidatorRegistryLimit>,
    pub validators_mutable: VariableList<ValidatorMutable, T::ValidatorRegistryLimit>,

    pub randao_mixes: FixedVector<Hash256, T::EpochsPerHistoricalVector>,
    pub slashings: FixedVector<u64, T::EpochsPerSlashingsVector>,

    pub previous_epoch_attestations: VariableList<PendingAttestation<T>, T::MaxAttestations>,
    pub current_epoch_attestations: VariableList<PendingAttestation<T>, T::MaxAttestations>,
    pub previous_epoch_participation: VariableList<ParticipationFlags, T::ValidatorRegistryLimit>,
    pub current_epoch_participation: VariableList<ParticipationFlags, T::ValidatorRegistryLimit>,

    pub justification_bits: BitVector<T::JustificationBitsLength>,
    pub previous_justified_checkpoint: Checkpoint,
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,

    pub inactivity_scores: VariableList<u64, T::ValidatorRegistryLimit>,
    pub current_sync_committee: Option<Arc<SyncCommittee<T>>>,
    pub next_sync_committee: Option<Arc<SyncCommittee<T>>>,

    pub latest_execution_payload_header_root: Option<Hash256>,
}

impl<T: EthSpec> PartialBeaconState<T> {
    /// Splits a full state into its storable form plus the immutable validator records that
    /// should be appended to the `immutable_validators` column (only the ones past
    /// `known_validator_count`, since earlier ones are already there by construction).
    pub fn from_state(
        state: &BeaconState<T>,
        known_validator_count: usize,
    ) -> (Self, Vec<ImmutableValidator>) {
        let fork_name_byte: u8 = match state {
            BeaconState::Base(_) => 0,
            BeaconState::Altair(_) => 1,
            BeaconState::Bellatrix(_) => 2,
        };

        let mut validators_mutable = Vec::with_capacity(state.validators().len());
        let mut new_immutable = Vec::new();
        for (i, validator) in state.validators().iter().enumerate() {
            let (immutable, mutable) = split_validator(validator);
            validators_mutable.push(mutable);
            if i >= known_validator_count {
                new_immutable.push(immutable);
            }
        }

        let previous_epoch_attestations = match state {
            BeaconState::Base(inner) => inner.previous_epoch_attestations.clone(),
            _ => VariableList::empty(),
        };
        let current_epoch_attestations = match state {
            BeaconState::Base(inner) => inner.current_epoch_attestations.clone(),
            _ => VariableList::empty(),
        };
        let previous_epoch_participation = state
            .previous_epoch_participation()
            .ok()
            .cloned()
            .unwrap_or_else(VariableList::empty);
        let current_epoch_participation = state
            .current_epoch_participation()
            .ok()
            .cloned()
            .unwrap_or_else(VariableList::empty);
        let inactivity_scores = state
            .inactivity_scores()
            .ok()
            .cloned()
            .unwrap_or_else(VariableList::empty);
        let current_sync_committee = state.current_sync_committee().ok().cloned();
        let next_sync_committee = state.next_sync_committee().ok().cloned();
        let latest_execution_payload_header_root =
            state.latest_execution_payload_header_root().ok();

        let partial = PartialBeaconState {
            fork_name_byte,
            genesis_time: state.genesis_time(),
            genesis_validators_root: state.genesis_validators_root(),
            slot: state.slot(),
            fork: *state.fork(),
            latest_block_header: *state.latest_block_header(),
            block_roots: state.block_roots().clone(),
            state_roots: state.state_roots().clone(),
            historical_roots: state.historical_roots().clone(),
            eth1_data: state.eth1_data().clone(),
            eth1_data_votes: state.eth1_data_votes().clone(),
            eth1_deposit_index: state.eth1_deposit_index(),
            balances: state.balances().clone(),
            validators_mutable: VariableList::new(validators_mutable)
                .unwrap_or_else(|_| VariableList::empty()),
            randao_mixes: state.randao_mixes().clone(),
            slashings: state.slashings().clone(),
            previous_epoch_attestations,
            current_epoch_attestations,
            previous_epoch_participation,
            current_epoch_participation,
            justification_bits: state.justification_bits().clone(),
            previous_justified_checkpoint: *state.previous_justified_checkpoint(),
            current_justified_checkpoint: *state.current_justified_checkpoint(),
            finalized_checkpoint: *state.finalized_checkpoint(),
            inactivity_scores,
            current_sync_committee,
            next_sync_committee,
            latest_execution_payload_header_root,
        };
        (partial, new_immutable)
    }

    /// Reassembles a full `BeaconState` given the `immutable_validators` rows for every index
    /// referenced by `self.validators_mutable`.
    pub fn into_state(
        self,
        immutable_validators: &[ImmutableValidator],
    ) -> Result<BeaconState<T>, crate::Error> {
        let validators: Vec<Validator> = self
            .validators_mutable
            .iter()
            .enumerate()
            .map(|(i, mutable)| {
                let immutable = immutable_validators
                    .get(i)
                    .ok_or(crate::Error::NoContinuationData)?;
                Ok(join_validator(immutable, mutable))
            })
            .collect::<Result<_, crate::Error>>()?;
        let validators = VariableList::new(validators)?;

        Ok(match self.fork_name_byte {
            0 => BeaconState::Base(BeaconStateBase {
                genesis_time: self.genesis_time,
                genesis_validators_root: self.genesis_validators_root,
                slot: self.slot,
                fork: self.fork,
                latest_block_header: self.latest_block_header,
                block_roots: self.block_roots,
                state_roots: self.state_roots,
                historical_roots: self.historical_roots,
                eth1_data: self.eth1_data,
                eth1_data_votes: self.eth1_data_votes,
                eth1_deposit_index: self.eth1_deposit_index,
                validators,
                balances: self.balances,
                randao_mixes: self.randao_mixes,
                slashings: self.slashings,
                previous_epoch_attestations: self.previous_epoch_attestations,
                current_epoch_attestations: self.current_epoch_attestations,
                justification_bits: self.justification_bits,
                previous_justified_checkpoint: self.previous_justified_checkpoint,
                current_justified_checkpoint: self.current_justified_checkpoint,
                finalized_checkpoint: self.finalized_checkpoint,
                committee_caches: [
                    CommitteeCache::default(),
                    CommitteeCache::default(),
                    CommitteeCache::default(),
                ],
                pubkey_cache: PubkeyCache::default(),
                exit_cache: ExitCache::default(),
                tree_hash_cache: None,
            }),
            1 => BeaconState::Altair(BeaconStateAltair {
                genesis_time: self.genesis_time,
                genesis_validators_root: self.genesis_validators_root,
                slot: self.slot,
                fork: self.fork,
                latest_block_header: self.latest_block_header,
                block_roots: self.block_roots,
                state_roots: self.state_roots,
                historical_roots: self.historical_roots,
                eth1_data: self.eth1_data,
                eth1_data_votes: self.eth1_data_votes,
                eth1_deposit_index: self.eth1_deposit_index,
                validators,
                balances: self.balances,
                randao_mixes: self.randao_mixes,
                slashings: self.slashings,
                previous_epoch_participation: self.previous_epoch_participation,
                current_epoch_participation: self.current_epoch_participation,
                justification_bits: self.justification_bits,
                previous_justified_checkpoint: self.previous_justified_checkpoint,
                current_justified_checkpoint: self.current_justified_checkpoint,
                finalized_checkpoint: self.finalized_checkpoint,
                inactivity_scores: self.inactivity_scores,
                current_sync_committee: self
                    .current_sync_committee
                    .ok_or(crate::Error::NoContinuationData)?,
                next_sync_committee: self
                    .next_sync_committee
                    .ok_or(crate::Error::NoContinuationData)?,
                committee_caches: [
                    CommitteeCache::default(),
                    CommitteeCache::default(),
                    CommitteeCache::default(),
                ],
                pubkey_cache: PubkeyCache::default(),
                exit_cache: ExitCache::default(),
                tree_hash_cache: None,
            }),
            2 => BeaconState::Bellatrix(BeaconStateBellatrix {
                genesis_time: self.genesis_time,
                genesis_validators_root: self.genesis_validators_root,
                slot: self.slot,
                fork: self.fork,
                latest_block_header: self.latest_block_header,
                block_roots: self.block_roots,
                state_roots: self.state_roots,
                historical_roots: self.historical_roots,
                eth1_data: self.eth1_data,
                eth1_data_votes: self.eth1_data_votes,
                eth1_deposit_index: self.eth1_deposit_index,
                validators,
                balances: self.balances,
                randao_mixes: self.randao_mixes,
                slashings: self.slashings,
                previous_epoch_participation: self.previous_epoch_participation,
                current_epoch_participation: self.current_epoch_participation,
                justification_bits: self.justification_bits,
                previous_justified_checkpoint: self.previous_justified_checkpoint,
                current_justified_checkpoint: self.current_justified_checkpoint,
                finalized_checkpoint: self.finalized_checkpoint,
                inactivity_scores: self.inactivity_scores,
                current_sync_committee: self
                    .current_sync_committee
                    .ok_or(crate::Error::NoContinuationData)?,
                next_sync_committee: self
                    .next_sync_committee
                    .ok_or(crate::Error::NoContinuationData)?,
                latest_execution_payload_header_root: self
                    .latest_execution_payload_header_root
                    .ok_or(crate::Error::NoContinuationData)?,
                committee_caches: [
                    CommitteeCache::default(),
                    CommitteeCache::default(),
                    CommitteeCache::default(),
                ],
                pubkey_cache: PubkeyCache::default(),
                exit_cache: ExitCache::default(),
                tree_hash_cache: None,
            }),
            _ => return Err(crate::Error::NoContinuationData),
        })
    }
}

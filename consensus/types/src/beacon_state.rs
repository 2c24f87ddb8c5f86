mod clone_config;
mod committee_cache;
mod exit_cache;
mod pubkey_cache;
#[cfg(test)]
mod tests;

pub use clone_config::CloneConfig;
pub use committee_cache::{BeaconCommittee, CommitteeCache};
pub use exit_cache::ExitCache;
pub use pubkey_cache::PubkeyCache;

use crate::test_utils::TestRandom;
use crate::*;
use safe_arith::SafeArith;
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use ssz_types::{BitVector, FixedVector, VariableList};
use std::sync::Arc;
use superstruct::superstruct;
use test_random_derive::TestRandom;
use tree_hash_derive::TreeHash;

/// One of the committee duties a validator has in the current/previous/next epoch, resolved
/// from the committee cache.
#[derive(Debug, PartialEq, Clone)]
pub struct AttestationDuty {
    pub slot: Slot,
    pub index: u64,
    pub committee_position: usize,
    pub committee_len: usize,
}

/// The beacon chain's structured state (§3): validator registry, balances, historical roots,
/// justification bits, finalized checkpoint, randao mixes, slashings, and per-fork extras.
/// Validators are append-mostly; the store (C2) relies on that to de-duplicate their immutable
/// fields.
#[superstruct(
    variants(Base, Altair, Bellatrix),
    variant_attributes(
        derive(Debug, PartialEq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash, TestRandom),
        serde(bound = "T: EthSpec")
    ),
    partial_getter_error(ty = "BeaconStateError", expr = "BeaconStateError::IncorrectStateVariant")
)]
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, TreeHash)]
#[serde(bound = "T: EthSpec")]
#[tree_hash(enum_behaviour = "transparent")]
pub struct BeaconState<T: EthSpec> {
    // Versioning
    #[superstruct(getter(copy))]
    pub genesis_time: u64,
    #[superstruct(getter(copy))]
    pub genesis_validators_root: Hash256,
    #[superstruct(getter(copy))]
    pub slot: Slot,
    pub fork: Fork,

    // History
    pub latest_block_header: BeaconBlockHeader,
    pub block_roots: FixedVector<Hash256, T::SlotsPerHistoricalRoot>,
    pub state_roots: FixedVector<Hash256, T::SlotsPerHistoricalRoot>,
    pub historical_roots: VariableList<Hash256, T::HistoricalRootsLimit>,

    // Eth1
    pub eth1_data: Eth1Data,
    pub eth1_data_votes: VariableList<Eth1Data, T::SlotsPerEpoch>,
    #[superstruct(getter(copy))]
    pub eth1_deposit_index: u64,

    // Registry
    pub validators: VariableList<Validator, T::ValidatorRegistryLimit>,
    pub balances: VariableList<u64, T::ValidatorRegistryLimit>,

    // Randomness
    pub randao_mixes: FixedVector<Hash256, T::EpochsPerHistoricalVector>,

    // Slashings
    pub slashings: FixedVector<u64, T::EpochsPerSlashingsVector>,

    // Attestations (phase0 only; altair+ uses participation flags instead)
    #[superstruct(only(Base))]
    pub previous_epoch_attestations: VariableList<PendingAttestation<T>, T::MaxAttestations>,
    #[superstruct(only(Base))]
    pub current_epoch_attestations: VariableList<PendingAttestation<T>, T::MaxAttestations>,

    // Participation (altair+)
    #[superstruct(only(Altair, Bellatrix))]
    pub previous_epoch_participation: VariableList<ParticipationFlags, T::ValidatorRegistryLimit>,
    #[superstruct(only(Altair, Bellatrix))]
    pub current_epoch_participation: VariableList<ParticipationFlags, T::ValidatorRegistryLimit>,

    // Finality
    pub justification_bits: BitVector<T::JustificationBitsLength>,
    pub previous_justified_checkpoint: Checkpoint,
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,

    // Inactivity (altair+)
    #[superstruct(only(Altair, Bellatrix))]
    pub inactivity_scores: VariableList<u64, T::ValidatorRegistryLimit>,

    // Sync committees (altair+)
    #[superstruct(only(Altair, Bellatrix))]
    pub current_sync_committee: Arc<SyncCommittee<T>>,
    #[superstruct(only(Altair, Bellatrix))]
    pub next_sync_committee: Arc<SyncCommittee<T>>,

    // Execution (bellatrix+; out of scope per spec.md §1, carried as an opaque root)
    #[superstruct(only(Bellatrix))]
    pub latest_execution_payload_header_root: Hash256,

    // Caching
    #[superstruct(only(Base, Altair, Bellatrix))]
    #[serde(skip_serializing, skip_deserializing)]
    #[ssz(skip_serializing, skip_deserializing)]
    #[tree_hash(skip_hashing)]
    pub committee_caches: [CommitteeCache; 3],
    #[superstruct(only(Base, Altair, Bellatrix))]
    #[serde(skip_serializing, skip_deserializing)]
    #[ssz(skip_serializing, skip_deserializing)]
    #[tree_hash(skip_hashing)]
    pub pubkey_cache: PubkeyCache,
    #[superstruct(only(Base, Altair, Bellatrix))]
    #[serde(skip_serializing, skip_deserializing)]
    #[ssz(skip_serializing, skip_deserializing)]
    #[tree_hash(skip_hashing)]
    pub exit_cache: ExitCache,
    #[superstruct(only(Base, Altair, Bellatrix))]
    #[serde(skip_serializing, skip_deserializing)]
    #[ssz(skip_serializing, skip_deserializing)]
    #[tree_hash(skip_hashing)]
    pub tree_hash_cache: Option<Hash256>,
}

impl<T: EthSpec> BeaconState<T> {
    pub fn current_epoch(&self) -> Epoch {
        self.slot().epoch(T::slots_per_epoch())
    }

    pub fn previous_epoch(&self) -> Epoch {
        let current = self.current_epoch();
        if current > T::genesis_epoch() {
            current - 1
        } else {
            current
        }
    }

    pub fn next_epoch(&self) -> Epoch {
        self.current_epoch() + 1
    }

    /// Indices of validators active at `epoch`, in ascending order.
    pub fn get_active_validator_indices(
        &self,
        epoch: Epoch,
        _spec: &ChainSpec,
    ) -> Result<Vec<usize>, BeaconStateError> {
        Ok(self
            .validators()
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_active_at(epoch))
            .map(|(i, _)| i)
            .collect())
    }

    fn relative_epoch(&self, epoch: Epoch) -> Result<RelativeEpoch, BeaconStateError> {
        RelativeEpoch::from_epoch(self.current_epoch(), epoch)
    }

    fn cache_index(relative_epoch: RelativeEpoch) -> usize {
        match relative_epoch {
            RelativeEpoch::Previous => 0,
            RelativeEpoch::Current => 1,
            RelativeEpoch::Next => 2,
        }
    }

    pub fn committee_cache(
        &self,
        relative_epoch: RelativeEpoch,
    ) -> Result<&CommitteeCache, BeaconStateError> {
        let cache = &self.committee_caches()[Self::cache_index(relative_epoch)];
        if cache.initialized_epoch() == Some(relative_epoch.into_epoch(self.current_epoch())) {
            Ok(cache)
        } else {
            Err(BeaconStateError::CommitteeCacheUninitialized(Some(
                relative_epoch,
            )))
        }
    }

    pub fn build_committee_cache(
        &mut self,
        relative_epoch: RelativeEpoch,
        spec: &ChainSpec,
    ) -> Result<(), BeaconStateError> {
        let epoch = relative_epoch.into_epoch(self.current_epoch());
        if self.committee_cache(relative_epoch).is_ok() {
            return Ok(());
        }
        self.force_build_committee_cache(relative_epoch, spec)?;
        let _ = epoch;
        Ok(())
    }

    pub fn force_build_committee_cache(
        &mut self,
        relative_epoch: RelativeEpoch,
        spec: &ChainSpec,
    ) -> Result<(), BeaconStateError> {
        let epoch = relative_epoch.into_epoch(self.current_epoch());
        let cache = CommitteeCache::initialized(self, epoch, spec)?;
        let index = Self::cache_index(relative_epoch);
        self.committee_caches_mut()[index] = cache;
        Ok(())
    }

    pub fn build_all_caches(&mut self, spec: &ChainSpec) -> Result<(), BeaconStateError> {
        for re in [
            RelativeEpoch::Previous,
            RelativeEpoch::Current,
            RelativeEpoch::Next,
        ] {
            self.build_committee_cache(re, spec)?;
        }
        let validators = self.validators().clone();
        *self.exit_cache_mut() = ExitCache::new(validators.iter());
        for (i, validator) in self.validators().iter().enumerate() {
            self.pubkey_cache_mut().insert(validator.pubkey, i);
        }
        Ok(())
    }

    pub fn drop_committee_cache(&mut self, relative_epoch: RelativeEpoch) {
        let index = Self::cache_index(relative_epoch);
        self.committee_caches_mut()[index] = CommitteeCache::default();
    }

    pub fn update_tree_hash_cache(&mut self) -> Result<Hash256, BeaconStateError> {
        let root = self.tree_hash_root_uncached();
        *self.tree_hash_cache_mut() = Some(root);
        Ok(root)
    }

    fn tree_hash_root_uncached(&self) -> Hash256 {
        use tree_hash::TreeHash;
        match self {
            BeaconState::Base(s) => s.tree_hash_root(),
            BeaconState::Altair(s) => s.tree_hash_root(),
            BeaconState::Bellatrix(s) => s.tree_hash_root(),
        }
    }

    pub fn get_cached_active_validator_indices(
        &self,
        relative_epoch: RelativeEpoch,
    ) -> Result<&[usize], BeaconStateError> {
        Ok(self.committee_cache(relative_epoch)?.active_validator_indices())
    }

    pub fn get_epoch_committee_count(
        &self,
        relative_epoch: RelativeEpoch,
    ) -> Result<u64, BeaconStateError> {
        Ok(self.committee_cache(relative_epoch)?.epoch_committee_count())
    }

    pub fn get_beacon_committees_at_slot(
        &self,
        slot: Slot,
    ) -> Result<Vec<BeaconCommittee>, BeaconStateError> {
        let epoch = slot.epoch(T::slots_per_epoch());
        let relative_epoch = self.relative_epoch(epoch)?;
        Ok(self
            .committee_cache(relative_epoch)?
            .get_all_beacon_committees(slot))
    }

    pub fn get_beacon_committee(
        &self,
        slot: Slot,
        index: u64,
    ) -> Result<BeaconCommittee, BeaconStateError> {
        let epoch = slot.epoch(T::slots_per_epoch());
        let relative_epoch = self.relative_epoch(epoch)?;
        self.committee_cache(relative_epoch)?
            .get_committee(slot, index)
            .ok_or(BeaconStateError::NoCommitteeFound { slot, index })
    }

    pub fn get_attestation_duties(
        &self,
        validator_index: usize,
        relative_epoch: RelativeEpoch,
    ) -> Result<Option<AttestationDuty>, BeaconStateError> {
        let cache = self.committee_cache(relative_epoch)?;
        if cache.attestation_duty_index_position(validator_index).is_none() {
            return Ok(None);
        }
        let epoch = relative_epoch.into_epoch(self.current_epoch());
        for slot in epoch.slot_iter(T::slots_per_epoch()) {
            for committee in cache.get_all_beacon_committees(slot) {
                if let Some(committee_position) =
                    committee.committee.iter().position(|&v| v == validator_index)
                {
                    return Ok(Some(AttestationDuty {
                        slot,
                        index: committee.index,
                        committee_position,
                        committee_len: committee.committee.len(),
                    }));
                }
            }
        }
        Ok(None)
    }

    /// The shuffling seed for `epoch`, bound to `domain` so attester shuffling and proposer
    /// shuffling never share a seed. Uses the randao mix from `MIN_SEED_LOOKAHEAD` epochs back so
    /// it can't be influenced by randao reveals from the epoch being seeded.
    pub fn get_seed(
        &self,
        epoch: Epoch,
        domain: Domain,
        spec: &ChainSpec,
    ) -> Result<[u8; 32], BeaconStateError> {
        let randao_epoch = epoch
            .safe_add(spec.min_seed_lookahead)
            .and_then(|e| e.safe_sub(Epoch::new(1)))
            .unwrap_or(epoch);
        let mix = self.get_randao_mix(randao_epoch)?;

        let mut preimage = Vec::with_capacity(4 + 8 + 32);
        preimage.extend_from_slice(&domain_to_u32(domain).to_le_bytes());
        preimage.extend_from_slice(&epoch.as_u64().to_le_bytes());
        preimage.extend_from_slice(mix.as_bytes());
        let digest = eth2_hashing::hash(&preimage);
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&digest[..32]);
        Ok(seed)
    }

    pub fn get_beacon_proposer_seed(
        &self,
        slot: Slot,
        spec: &ChainSpec,
    ) -> Result<[u8; 32], BeaconStateError> {
        let epoch = slot.epoch(T::slots_per_epoch());
        let mix = self.get_randao_mix(epoch.saturating_sub(Epoch::new(1)))?;
        let mut preimage = Vec::with_capacity(8 + 32);
        preimage.extend_from_slice(&slot.as_u64().to_le_bytes());
        preimage.extend_from_slice(mix.as_bytes());
        let _ = spec;
        let digest = eth2_hashing::hash(&preimage);
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&digest[..32]);
        Ok(seed)
    }

    fn get_randao_mix(&self, epoch: Epoch) -> Result<Hash256, BeaconStateError> {
        let index = epoch.as_u64() as usize % T::epochs_per_historical_vector();
        self.randao_mixes()
            .get(index)
            .copied()
            .ok_or(BeaconStateError::InsufficientRandaoMixes)
    }

    /// Returns the block root at the given slot, provided that slot is within the most recent
    /// `T::SlotsPerHistoricalRoot` slots.
    pub fn get_block_root(&self, slot: Slot) -> Result<&Hash256, BeaconStateError> {
        if slot >= self.slot() || self.slot() > slot.safe_add(Slot::new(T::slots_per_historical_root() as u64))? {
            return Err(BeaconStateError::SlotOutOfBounds);
        }
        let index = slot.as_u64() as usize % T::slots_per_historical_root();
        self.block_roots()
            .get(index)
            .ok_or(BeaconStateError::InsufficientBlockRoots)
    }

    /// Returns the block root at the start of the given epoch.
    pub fn get_block_root_at_epoch(&self, epoch: Epoch) -> Result<&Hash256, BeaconStateError> {
        self.get_block_root(epoch.start_slot(T::slots_per_epoch()))
    }

    /// Sets the block root for the slot immediately prior to `self.slot()`, called during block
    /// processing once the state root of the previous slot is known.
    pub fn set_block_root(
        &mut self,
        slot: Slot,
        block_root: Hash256,
    ) -> Result<(), BeaconStateError> {
        let i = slot.as_u64() as usize % T::slots_per_historical_root();
        *self
            .block_roots_mut()
            .get_mut(i)
            .ok_or(BeaconStateError::InsufficientBlockRoots)? = block_root;
        Ok(())
    }

    /// Returns the state root at the given slot, provided that slot is within the most recent
    /// `T::SlotsPerHistoricalRoot` slots.
    pub fn get_state_root(&self, slot: Slot) -> Result<&Hash256, BeaconStateError> {
        if slot >= self.slot() || self.slot() > slot.safe_add(Slot::new(T::slots_per_historical_root() as u64))? {
            return Err(BeaconStateError::SlotOutOfBounds);
        }
        let index = slot.as_u64() as usize % T::slots_per_historical_root();
        self.state_roots()
            .get(index)
            .ok_or(BeaconStateError::InsufficientStateRoots)
    }

    /// Sets the state root for the slot immediately prior to `self.slot()`.
    pub fn set_state_root(
        &mut self,
        slot: Slot,
        state_root: Hash256,
    ) -> Result<(), BeaconStateError> {
        let i = slot.as_u64() as usize % T::slots_per_historical_root();
        *self
            .state_roots_mut()
            .get_mut(i)
            .ok_or(BeaconStateError::InsufficientStateRoots)? = state_root;
        Ok(())
    }

    pub fn get_validator(&self, validator_index: usize) -> Result<&Validator, BeaconStateError> {
        self.validators()
            .get(validator_index)
            .ok_or(BeaconStateError::UnknownValidator(validator_index))
    }

    pub fn get_effective_balance(&self, validator_index: usize) -> Result<u64, BeaconStateError> {
        Ok(self.get_validator(validator_index)?.effective_balance)
    }

    /// Equivalent to the specification `is_eligible_validator` function: participated (or could
    /// have participated) in the previous epoch, or was slashed but not yet past its
    /// penalty-withholding period.
    pub fn is_eligible_validator(&self, validator_index: usize) -> Result<bool, BeaconStateError> {
        let previous_epoch = self.previous_epoch();
        let validator = self.get_validator(validator_index)?;
        Ok(validator.is_active_at(previous_epoch)
            || (validator.slashed && previous_epoch + 1 < validator.withdrawable_epoch))
    }

    pub fn get_inactivity_score(&self, validator_index: usize) -> Result<u64, BeaconStateError> {
        self.inactivity_scores()?
            .get(validator_index)
            .copied()
            .ok_or(BeaconStateError::UnknownValidator(validator_index))
    }

    pub fn set_inactivity_score(
        &mut self,
        validator_index: usize,
        score: u64,
    ) -> Result<(), BeaconStateError> {
        *self
            .inactivity_scores_mut()?
            .get_mut(validator_index)
            .ok_or(BeaconStateError::UnknownValidator(validator_index))? = score;
        Ok(())
    }

    /// Equivalent to the specification `is_in_inactivity_leak` function: the chain has failed to
    /// finalize for more than `min_epochs_to_inactivity_penalty` epochs.
    pub fn is_in_inactivity_leak(&self, previous_epoch: Epoch, spec: &ChainSpec) -> bool {
        previous_epoch
            .saturating_sub(self.finalized_checkpoint().epoch)
            .as_u64()
            > spec.min_epochs_to_inactivity_penalty
    }

    /// Proposer selection (§5): walk candidates in shuffled order, each accepted with
    /// probability proportional to its effective balance, using a fresh random byte per trial.
    pub fn get_beacon_proposer_index(
        &self,
        slot: Slot,
        spec: &ChainSpec,
    ) -> Result<usize, BeaconStateError> {
        let epoch = slot.epoch(T::slots_per_epoch());
        let seed = self.get_beacon_proposer_seed(slot, spec)?;
        let indices = self.get_active_validator_indices(epoch, spec)?;
        if indices.is_empty() {
            return Err(BeaconStateError::InsufficientValidators);
        }

        let mut i: usize = 0;
        loop {
            let shuffled_index =
                swap_or_not_shuffle::compute_shuffled_index(
                    i % indices.len(),
                    indices.len(),
                    &seed,
                    spec.shuffle_round_count,
                )
                .ok_or(BeaconStateError::UnableToDetermineProducer)?;
            let candidate_index = indices[shuffled_index];
            let random_byte = {
                let mut preimage = seed.to_vec();
                preimage.extend_from_slice(&((i / 32) as u64).to_le_bytes());
                eth2_hashing::hash(&preimage)[i % 32]
            };
            let effective_balance = self
                .validators()
                .get(candidate_index)
                .ok_or(BeaconStateError::UnknownValidator(candidate_index))?
                .effective_balance;
            if effective_balance.safe_mul(255)?
                >= spec.max_effective_balance.safe_mul(random_byte as u64)?
            {
                return Ok(candidate_index);
            }
            i += 1;
        }
    }

    pub fn get_outstanding_deposit_len(&self) -> Result<u64, BeaconStateError> {
        self.eth1_data()
            .deposit_count
            .checked_sub(self.eth1_deposit_index())
            .ok_or(BeaconStateError::InvalidDepositState {
                deposit_count: self.eth1_data().deposit_count,
                deposit_index: self.eth1_deposit_index(),
            })
    }

    pub fn clone_with(&self, config: CloneConfig) -> Self {
        let mut new = self.clone();
        if !config.committee_caches {
            for cache in new.committee_caches_mut().iter_mut() {
                *cache = CommitteeCache::default();
            }
        }
        if !config.pubkey_cache {
            *new.pubkey_cache_mut() = PubkeyCache::default();
        }
        if !config.exit_cache {
            *new.exit_cache_mut() = ExitCache::default();
        }
        if !config.tree_hash_cache {
            *new.tree_hash_cache_mut() = None;
        }
        new
    }
}

fn domain_to_u32(domain: Domain) -> u32 {
    match domain {
        Domain::BeaconProposer => 0x0000_0000,
        Domain::BeaconAttester => 0x0100_0000,
        Domain::Randao => 0x0200_0000,
        Domain::Deposit => 0x0300_0000,
        Domain::VoluntaryExit => 0x0400_0000,
        Domain::SelectionProof => 0x0500_0000,
        Domain::AggregateAndProof => 0x0600_0000,
        Domain::SyncCommittee => 0x0700_0000,
        Domain::SyncCommitteeSelectionProof => 0x0800_0000,
        Domain::ContributionAndProof => 0x0900_0000,
    }
}

pub type FoundationBeaconState = BeaconState<MainnetEthSpec>;

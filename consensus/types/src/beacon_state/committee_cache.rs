use crate::*;
use safe_arith::SafeArith;
use swap_or_not_shuffle::shuffle_list;

/// One committee: the slot/index it sits at and the (shuffled) validator indices assigned to it.
#[derive(Debug, PartialEq, Clone)]
pub struct BeaconCommittee<'a> {
    pub slot: Slot,
    pub index: u64,
    pub committee: &'a [usize],
}

/// Built once per `RelativeEpoch` from a shuffling seed and the active validator set; every
/// later committee/proposer lookup in that epoch is then O(1) instead of re-shuffling.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct CommitteeCache {
    initialized_epoch: Option<Epoch>,
    shuffling: Vec<usize>,
    shuffling_positions: Vec<Option<std::num::NonZeroUsize>>,
    committees_per_slot: u64,
    slots_per_epoch: u64,
}

impl CommitteeCache {
    pub fn initialized<E: EthSpec>(
        state: &BeaconState<E>,
        epoch: Epoch,
        spec: &ChainSpec,
    ) -> Result<Self, BeaconStateError> {
        let active_validator_indices = state.get_active_validator_indices(epoch, spec)?;
        if active_validator_indices.is_empty() {
            return Err(BeaconStateError::InsufficientValidators);
        }

        let committees_per_slot =
            Self::committees_per_slot(active_validator_indices.len(), spec);
        let slots_per_epoch = E::slots_per_epoch();

        let seed = state.get_seed(epoch, Domain::BeaconAttester, spec)?;
        let shuffling = shuffle_list(
            active_validator_indices.clone(),
            spec.shuffle_round_count,
            &seed[..],
            false,
        )
        .ok_or(BeaconStateError::UnableToDetermineProducer)?;

        let mut shuffling_positions = vec![None; state.validators().len()];
        for (i, &validator_index) in shuffling.iter().enumerate() {
            shuffling_positions[validator_index] = std::num::NonZeroUsize::new(i + 1);
        }

        Ok(Self {
            initialized_epoch: Some(epoch),
            shuffling,
            shuffling_positions,
            committees_per_slot,
            slots_per_epoch,
        })
    }

    pub fn committees_per_slot(active_validator_count: usize, spec: &ChainSpec) -> u64 {
        std::cmp::max(
            1,
            std::cmp::min(
                spec.max_committees_per_slot,
                active_validator_count / spec.target_committee_size.max(1),
            ),
        ) as u64
    }

    pub fn initialized_epoch(&self) -> Option<Epoch> {
        self.initialized_epoch
    }

    pub fn epoch_committee_count(&self) -> u64 {
        self.committees_per_slot.safe_mul(self.slots_per_epoch).unwrap_or(0)
    }

    pub fn active_validator_indices(&self) -> &[usize] {
        &self.shuffling
    }

    fn compute_committee_range(&self, index: u64) -> Option<(usize, usize)> {
        let count = self.epoch_committee_count() as usize;
        if count == 0 || index as usize >= count {
            return None;
        }
        let len = self.shuffling.len();
        let start = (len * index as usize) / count;
        let end = (len * (index as usize + 1)) / count;
        Some((start, end))
    }

    pub fn get_committee(&self, slot: Slot, index: u64) -> Option<BeaconCommittee> {
        let slot_committee_index = (slot.as_u64() % self.slots_per_epoch) * self.committees_per_slot + index;
        let (start, end) = self.compute_committee_range(slot_committee_index)?;
        Some(BeaconCommittee {
            slot,
            index,
            committee: &self.shuffling[start..end],
        })
    }

    pub fn get_all_beacon_committees(&self, slot: Slot) -> Vec<BeaconCommittee> {
        (0..self.committees_per_slot)
            .filter_map(|index| self.get_committee(slot, index))
            .collect()
    }

    pub fn attestation_duty_index_position(&self, validator_index: usize) -> Option<usize> {
        self.shuffling_positions
            .get(validator_index)
            .and_then(|maybe| maybe.map(|p| p.get() - 1))
    }
}

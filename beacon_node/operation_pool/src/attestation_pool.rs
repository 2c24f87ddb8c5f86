//! Storage for `Attestation`s awaiting inclusion in a future block, bucketed by
//! `(slot, committee_index)` as described by the gossip subnet split they arrive on.
//!
//! Attestations sharing the same `AttestationData` are combined by aggregating their
//! `aggregation_bits` whenever two are signed by disjoint sets of committee members. When two
//! attestations for the same data overlap (neither is a subset of the other and their bits
//! intersect) they cannot be losslessly combined, so both candidates are kept and the larger one
//! wins at selection time.
//!
//! **This pool does no signature or state validity checking.** Callers (gossip validation) are
//! expected to have already confirmed each `Attestation` is well-formed and correctly signed
//! before calling [`AttestationPool::insert`].

use std::collections::HashMap;
use tree_hash::TreeHash;
use types::typenum::Unsigned;
use types::{Attestation, AttestationData, BeaconState, ChainSpec, EthSpec, Hash256, Slot};

#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    /// `attestation.aggregation_bits` had no bit set; there is no signer to credit.
    NoAggregationBitsSet,
    /// `attestation.aggregation_bits` had a different length than the committee already stored
    /// under the same `AttestationData`.
    InconsistentBitfieldLengths,
}

/// All distinct (non-mergeable) aggregates seen so far for one `AttestationData`.
#[derive(Default)]
struct AggregateSet<T: EthSpec> {
    candidates: Vec<Attestation<T>>,
}

impl<T: EthSpec> AggregateSet<T> {
    fn insert(&mut self, attestation: Attestation<T>) -> Result<(), Error> {
        if attestation.aggregation_bits.is_zero() {
            return Err(Error::NoAggregationBitsSet);
        }

        for existing in self.candidates.iter_mut() {
            if existing.aggregation_bits.len() != attestation.aggregation_bits.len() {
                return Err(Error::InconsistentBitfieldLengths);
            }
            if is_superset(existing, &attestation) {
                // Already covered by a stored aggregate; idempotent no-op.
                return Ok(());
            }
            if existing.signers_disjoint_from(&attestation) {
                existing.aggregate(&attestation);
                return Ok(());
            }
        }

        // Overlapping but not mergeable with anything on file: drop any candidate the new
        // attestation makes redundant, then keep it as its own candidate.
        self.candidates
            .retain(|existing| !is_superset(&attestation, existing));
        self.candidates.push(attestation);
        Ok(())
    }

    /// The single largest aggregate on file for this data, by signer count.
    fn best(&self) -> Option<&Attestation<T>> {
        self.candidates
            .iter()
            .max_by_key(|a| a.aggregation_bits.num_set_bits())
    }
}

fn is_superset<T: EthSpec>(a: &Attestation<T>, b: &Attestation<T>) -> bool {
    a.aggregation_bits
        .intersection(&b.aggregation_bits)
        .num_set_bits()
        == b.aggregation_bits.num_set_bits()
}

#[derive(Default)]
struct SlotBucket<T: EthSpec> {
    by_data: HashMap<Hash256, AggregateSet<T>>,
}

impl<T: EthSpec> SlotBucket<T> {
    fn insert(&mut self, attestation: Attestation<T>, data_root: Hash256) -> Result<(), Error> {
        self.by_data.entry(data_root).or_default().insert(attestation)
    }
}

/// Bucketed-by-slot attestation pool used to assemble a block's `attestations` list.
pub struct AttestationPool<T: EthSpec> {
    buckets: HashMap<Slot, SlotBucket<T>>,
}

impl<T: EthSpec> Default for AttestationPool<T> {
    fn default() -> Self {
        Self {
            buckets: HashMap::new(),
        }
    }
}

impl<T: EthSpec> AttestationPool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `attestation`, aggregating it with any existing disjoint aggregate for the same
    /// `AttestationData`.
    pub fn insert(&mut self, attestation: Attestation<T>) -> Result<(), Error> {
        let _timer = crate::metrics::start_timer(&crate::metrics::ATTESTATION_POOL_INSERT);
        let data_root = attestation.data.tree_hash_root();
        let slot = attestation.data.slot;
        self.buckets
            .entry(slot)
            .or_default()
            .insert(attestation, data_root)
    }

    pub fn num_attestations(&self) -> usize {
        self.buckets
            .values()
            .flat_map(|bucket| bucket.by_data.values())
            .map(|set| set.candidates.len())
            .sum()
    }

    /// The best available aggregate for `data`, if any attestation matching it has been seen.
    pub fn get_aggregate(&self, data: &AttestationData) -> Option<Attestation<T>> {
        self.buckets
            .get(&data.slot)?
            .by_data
            .get(&data.tree_hash_root())?
            .best()
            .cloned()
    }

    /// Returns up to `T::MaxAttestations` aggregates suitable for inclusion in a block proposed
    /// at `state.slot()`, preferring the largest aggregate available for each distinct
    /// `AttestationData` and favouring higher total coverage across the whole selection.
    ///
    /// Only slots in the inclusion window `[current_slot - slots_per_epoch, current_slot - 1]`
    /// (and no more recent than `min_attestation_inclusion_delay` slots old) are eligible.
    pub fn get_attestations(&self, state: &BeaconState<T>, spec: &ChainSpec) -> Vec<Attestation<T>> {
        let _timer = crate::metrics::start_timer(&crate::metrics::ATTESTATION_POOL_GET);
        let current_slot = state.slot();
        let lower_bound = current_slot.saturating_sub(Slot::new(spec.slots_per_epoch));
        let upper_bound = current_slot.saturating_sub(Slot::new(spec.min_attestation_inclusion_delay));

        let mut best: Vec<Attestation<T>> = self
            .buckets
            .iter()
            .filter(|(slot, _)| **slot >= lower_bound && **slot <= upper_bound)
            .flat_map(|(_, bucket)| bucket.by_data.values())
            .filter_map(|set| set.best())
            .cloned()
            .collect();

        best.sort_unstable_by_key(|a| std::cmp::Reverse(a.aggregation_bits.num_set_bits()));
        best.truncate(T::MaxAttestations::to_usize());
        best
    }

    /// Drops every attestation for a slot at or before the slot finalized by `state`, since it
    /// can never again be included in a block.
    pub fn prune(&mut self, finalized_state_slot: Slot) {
        self.buckets.retain(|slot, _| *slot > finalized_state_slot);
    }

    /// Every candidate aggregate currently held, flattened for persistence. Bucket structure is
    /// not preserved; reinserting each one rebuilds it.
    pub fn snapshot(&self) -> Vec<Attestation<T>> {
        self.buckets
            .values()
            .flat_map(|bucket| bucket.by_data.values())
            .flat_map(|set| set.candidates.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{AggregateSignature, BitList, Checkpoint, Epoch, MainnetEthSpec};

    type E = MainnetEthSpec;

    fn make_attestation(slot: Slot, index: u64, bits: &[usize]) -> Attestation<E> {
        let mut aggregation_bits: BitList<<E as EthSpec>::MaxValidatorsPerCommittee> =
            BitList::with_capacity(16).unwrap();
        for bit in bits {
            aggregation_bits.set(*bit, true).unwrap();
        }
        Attestation {
            aggregation_bits,
            data: AttestationData {
                slot,
                index,
                beacon_block_root: Hash256::zero(),
                source: Checkpoint {
                    epoch: Epoch::new(0),
                    root: Hash256::zero(),
                },
                target: Checkpoint {
                    epoch: Epoch::new(1),
                    root: Hash256::zero(),
                },
            },
            signature: AggregateSignature::infinity(),
        }
    }

    #[test]
    fn disjoint_attestations_aggregate() {
        let mut pool = AttestationPool::<E>::new();
        pool.insert(make_attestation(Slot::new(1), 0, &[0])).unwrap();
        pool.insert(make_attestation(Slot::new(1), 0, &[1])).unwrap();
        assert_eq!(pool.num_attestations(), 1);

        let data = make_attestation(Slot::new(1), 0, &[]).data;
        let aggregate = pool.get_aggregate(&data).unwrap();
        assert_eq!(aggregate.aggregation_bits.num_set_bits(), 2);
    }

    #[test]
    fn duplicate_insert_is_idempotent() {
        let mut pool = AttestationPool::<E>::new();
        pool.insert(make_attestation(Slot::new(1), 0, &[0, 1])).unwrap();
        pool.insert(make_attestation(Slot::new(1), 0, &[0])).unwrap();

        let data = make_attestation(Slot::new(1), 0, &[]).data;
        let aggregate = pool.get_aggregate(&data).unwrap();
        assert_eq!(aggregate.aggregation_bits.num_set_bits(), 2);
    }

    #[test]
    fn overlapping_keeps_larger_coverage() {
        let mut pool = AttestationPool::<E>::new();
        pool.insert(make_attestation(Slot::new(1), 0, &[0, 1])).unwrap();
        pool.insert(make_attestation(Slot::new(1), 0, &[1, 2])).unwrap();

        let data = make_attestation(Slot::new(1), 0, &[]).data;
        let aggregate = pool.get_aggregate(&data).unwrap();
        assert_eq!(aggregate.aggregation_bits.num_set_bits(), 2);
    }

    #[test]
    fn prune_drops_old_slots() {
        let mut pool = AttestationPool::<E>::new();
        pool.insert(make_attestation(Slot::new(1), 0, &[0])).unwrap();
        pool.insert(make_attestation(Slot::new(5), 0, &[0])).unwrap();
        pool.prune(Slot::new(2));
        assert_eq!(pool.num_attestations(), 1);
    }
}

//! Proposer- and attester-slashing pools: both are small, FIFO-ish collections keyed by the
//! validator index(es) a slashing proves guilty, so a second report of an already-known slashing
//! is a cheap no-op rather than a duplicate block inclusion.

use std::collections::HashMap;
use types::typenum::Unsigned;
use types::{AttesterSlashing, BeaconState, EthSpec, IndexedAttestation, ProposerSlashing};

#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    /// The two signed headers don't actually prove a double-proposal (different slot or
    /// proposer, or an identical header twice).
    NotSlashable,
}

fn validate_proposer_slashing(slashing: &ProposerSlashing) -> Result<(), Error> {
    let header_1 = &slashing.signed_header_1.message;
    let header_2 = &slashing.signed_header_2.message;
    if header_1.slot == header_2.slot
        && header_1.proposer_index == header_2.proposer_index
        && header_1 != header_2
    {
        Ok(())
    } else {
        Err(Error::NotSlashable)
    }
}

/// The validator indices proven slashable by two conflicting indexed attestations: those
/// attesting in both, if the pair actually constitutes a double-vote or surround-vote.
fn slashable_indices<T: EthSpec>(
    attestation_1: &IndexedAttestation<T>,
    attestation_2: &IndexedAttestation<T>,
) -> Result<Vec<u64>, Error> {
    if !(attestation_1.is_double_vote(attestation_2) || attestation_1.is_surround_vote(attestation_2))
    {
        return Err(Error::NotSlashable);
    }

    let indices_2: std::collections::HashSet<u64> =
        attestation_2.attesting_indices.iter().copied().collect();
    let mut indices: Vec<u64> = attestation_1
        .attesting_indices
        .iter()
        .copied()
        .filter(|i| indices_2.contains(i))
        .collect();
    indices.sort_unstable();
    if indices.is_empty() {
        return Err(Error::NotSlashable);
    }
    Ok(indices)
}

#[derive(Default)]
pub struct ProposerSlashingPool {
    by_proposer: HashMap<u64, ProposerSlashing>,
}

impl ProposerSlashingPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, slashing: ProposerSlashing) -> Result<(), Error> {
        validate_proposer_slashing(&slashing)?;
        self.by_proposer
            .entry(slashing.signed_header_1.message.proposer_index)
            .or_insert(slashing);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.by_proposer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_proposer.is_empty()
    }

    /// Up to `T::MaxProposerSlashings` slashings whose proposer is still active and not yet
    /// slashed in `state`.
    pub fn get_slashings<T: EthSpec>(&self, state: &BeaconState<T>) -> Vec<ProposerSlashing> {
        self.by_proposer
            .values()
            .filter(|slashing| {
                state
                    .validators()
                    .get(slashing.signed_header_1.message.proposer_index as usize)
                    .map_or(false, |v| !v.slashed)
            })
            .take(T::MaxProposerSlashings::to_usize())
            .cloned()
            .collect()
    }

    /// Drops slashings whose proposer has already been slashed in `state` (they are now
    /// redundant to include in any future block).
    pub fn prune<T: EthSpec>(&mut self, state: &BeaconState<T>) {
        self.by_proposer.retain(|proposer_index, _| {
            state
                .validators()
                .get(*proposer_index as usize)
                .map_or(false, |v| !v.slashed)
        });
    }

    pub fn snapshot(&self) -> Vec<ProposerSlashing> {
        self.by_proposer.values().cloned().collect()
    }
}

#[derive(Default)]
pub struct AttesterSlashingPool<T: EthSpec> {
    by_indices: HashMap<Vec<u64>, AttesterSlashing<T>>,
}

impl<T: EthSpec> AttesterSlashingPool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, slashing: AttesterSlashing<T>) -> Result<(), Error> {
        let indices = slashable_indices(&slashing.attestation_1, &slashing.attestation_2)?;
        self.by_indices.entry(indices).or_insert(slashing);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.by_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_indices.is_empty()
    }

    /// Up to `T::MaxAttesterSlashings` slashings with at least one not-yet-slashed validator in
    /// their intersection.
    pub fn get_slashings(&self, state: &BeaconState<T>) -> Vec<AttesterSlashing<T>> {
        self.by_indices
            .iter()
            .filter(|(indices, _)| {
                indices.iter().any(|i| {
                    state
                        .validators()
                        .get(*i as usize)
                        .map_or(false, |v| !v.slashed)
                })
            })
            .take(T::MaxAttesterSlashings::to_usize())
            .map(|(_, slashing)| slashing.clone())
            .collect()
    }

    pub fn prune(&mut self, state: &BeaconState<T>) {
        self.by_indices.retain(|indices, _| {
            indices.iter().any(|i| {
                state
                    .validators()
                    .get(*i as usize)
                    .map_or(false, |v| !v.slashed)
            })
        });
    }

    pub fn snapshot(&self) -> Vec<AttesterSlashing<T>> {
        self.by_indices.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{
        AggregateSignature, BeaconBlockHeader, Checkpoint, Hash256, MainnetEthSpec, Signature,
        SignedBeaconBlockHeader, Slot, VariableList,
    };

    type E = MainnetEthSpec;

    fn header(slot: u64, proposer_index: u64, root_byte: u8) -> SignedBeaconBlockHeader {
        SignedBeaconBlockHeader {
            message: BeaconBlockHeader {
                slot: Slot::new(slot),
                proposer_index,
                parent_root: Hash256::zero(),
                state_root: Hash256::from_slice(&[root_byte; 32]),
                body_root: Hash256::zero(),
            },
            signature: Signature::empty(),
        }
    }

    #[test]
    fn proposer_slashing_requires_conflicting_headers() {
        let mut pool = ProposerSlashingPool::new();
        let slashing = ProposerSlashing {
            signed_header_1: header(1, 7, 1),
            signed_header_2: header(1, 7, 2),
        };
        pool.insert(slashing).unwrap();
        assert_eq!(pool.len(), 1);

        let bad = ProposerSlashing {
            signed_header_1: header(1, 7, 1),
            signed_header_2: header(2, 7, 2),
        };
        assert_eq!(pool.insert(bad), Err(Error::NotSlashable));
    }

    fn indexed_attestation(indices: &[u64], source: u64, target: u64) -> IndexedAttestation<E> {
        IndexedAttestation {
            attesting_indices: VariableList::new(indices.to_vec()).unwrap(),
            data: types::AttestationData {
                slot: Slot::new(1),
                index: 0,
                beacon_block_root: Hash256::zero(),
                source: Checkpoint {
                    epoch: types::Epoch::new(source),
                    root: Hash256::zero(),
                },
                target: Checkpoint {
                    epoch: types::Epoch::new(target),
                    root: Hash256::zero(),
                },
            },
            signature: AggregateSignature::infinity(),
        }
    }

    #[test]
    fn attester_slashing_double_vote_detected() {
        let mut pool = AttesterSlashingPool::<E>::new();
        let a1 = indexed_attestation(&[1, 2, 3], 0, 1);
        let mut a2 = indexed_attestation(&[2, 3, 4], 0, 1);
        a2.data.beacon_block_root = Hash256::from_slice(&[9; 32]);
        let slashing = AttesterSlashing {
            attestation_1: a1,
            attestation_2: a2,
        };
        pool.insert(slashing).unwrap();
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn attester_slashing_rejects_non_conflicting() {
        let mut pool = AttesterSlashingPool::<E>::new();
        let a1 = indexed_attestation(&[1, 2], 0, 1);
        let a2 = indexed_attestation(&[1, 2], 0, 1);
        let slashing = AttesterSlashing {
            attestation_1: a1,
            attestation_2: a2,
        };
        assert_eq!(pool.insert(slashing), Err(Error::NotSlashable));
    }
}

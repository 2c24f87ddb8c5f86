//! Gossip-style verification for unaggregated `Attestation`s before they are admitted to the
//! operation pool or handed to fork choice. Scoped to the single-attestation flow
//! `BeaconChain::process_attestation` actually drives; this workspace has no separate aggregate
//! (`SignedAggregateAndProof`) gossip topic or validator-side aggregation duty, so there is nothing
//! here to verify a selection proof or an aggregator index against.

use crate::beacon_chain::MAXIMUM_GOSSIP_CLOCK_DISPARITY;
use crate::{BeaconChain, BeaconChainError, BeaconChainTypes};
use slot_clock::SlotClock;
use types::{Attestation, Domain, Epoch, EthSpec, Hash256, IndexedAttestation, Slot};

#[derive(Debug, PartialEq)]
pub enum Error {
    /// The attestation is from a slot later than the current slot (within gossip clock
    /// disparity).
    FutureSlot {
        attestation_slot: Slot,
        latest_permissible_slot: Slot,
    },
    /// The attestation is from a slot earlier than the earliest permissible slot (within gossip
    /// clock disparity).
    PastSlot {
        attestation_slot: Slot,
        earliest_permissible_slot: Slot,
    },
    /// The unaggregated attestation doesn't have exactly one aggregation bit set.
    NotExactlyOneAggregationBitSet(usize),
    /// The `attestation.data.beacon_block_root` block is unknown to the DAG.
    UnknownHeadBlock { beacon_block_root: Hash256 },
    /// There is no committee for the slot and committee index of this attestation.
    NoCommitteeForSlotAndIndex { slot: Slot, index: u64 },
    /// The attestation is for an epoch in the future (with respect to the gossip clock
    /// disparity).
    FutureEpoch {
        attestation_epoch: Epoch,
        current_epoch: Epoch,
    },
    /// The attestation is for an epoch in the past (with respect to the gossip clock disparity).
    PastEpoch {
        attestation_epoch: Epoch,
        current_epoch: Epoch,
    },
    /// A signature on the attestation is invalid.
    InvalidSignature,
    BeaconChainError(BeaconChainError),
}

impl From<BeaconChainError> for Error {
    fn from(e: BeaconChainError) -> Self {
        Error::BeaconChainError(e)
    }
}

/// An `Attestation` that has passed gossip validation: exactly one aggregation bit set, within
/// the propagation slot range, attesting to a block this chain already knows, and carrying a
/// valid BLS signature from the attester it claims to be from.
pub struct VerifiedUnaggregatedAttestation<T: BeaconChainTypes> {
    attestation: Attestation<T::EthSpec>,
    indexed_attestation: IndexedAttestation<T::EthSpec>,
}

impl<T: BeaconChainTypes> VerifiedUnaggregatedAttestation<T> {
    /// Returns `Ok(Self)` if `attestation` is valid to be republished on the gossip network and
    /// applied to the operation pool / fork choice.
    pub fn verify(
        attestation: Attestation<T::EthSpec>,
        chain: &BeaconChain<T>,
    ) -> Result<Self, Error> {
        verify_propagation_slot_range(chain, &attestation)?;

        let num_set_bits = attestation.aggregation_bits.num_set_bits();
        if num_set_bits != 1 {
            return Err(Error::NotExactlyOneAggregationBitSet(num_set_bits));
        }

        if !chain.dag.read().contains(&attestation.data.beacon_block_root) {
            return Err(Error::UnknownHeadBlock {
                beacon_block_root: attestation.data.beacon_block_root,
            });
        }

        let head = chain.head();
        let indexed_attestation =
            build_indexed_attestation(&head.beacon_state, &attestation)?;
        verify_attestation_epoch(&indexed_attestation, &head.beacon_state)?;

        let fork = head.beacon_state.fork().clone();
        let genesis_validators_root = chain.genesis_validators_root;
        let domain = chain
            .spec
            .get_domain(
                indexed_attestation.data.target.epoch,
                Domain::BeaconAttester,
                &fork,
                genesis_validators_root,
            );
        drop(head);

        if !verify_indexed_attestation_signature(chain, &indexed_attestation, domain)? {
            return Err(Error::InvalidSignature);
        }

        Ok(Self {
            attestation,
            indexed_attestation,
        })
    }

    pub fn attestation(&self) -> &Attestation<T::EthSpec> {
        &self.attestation
    }

    pub fn indexed_attestation(&self) -> &IndexedAttestation<T::EthSpec> {
        &self.indexed_attestation
    }

    pub fn into_attestation(self) -> Attestation<T::EthSpec> {
        self.attestation
    }
}

/// Verifies that `attestation` is within the last `SLOTS_PER_EPOCH` slots of the current slot,
/// allowing `MAXIMUM_GOSSIP_CLOCK_DISPARITY` of leeway on either side for clock skew between
/// peers.
pub fn verify_propagation_slot_range<T: BeaconChainTypes>(
    chain: &BeaconChain<T>,
    attestation: &Attestation<T::EthSpec>,
) -> Result<(), Error> {
    let attestation_slot = attestation.data.slot;

    let latest_permissible_slot = chain
        .slot_clock
        .now()
        .ok_or(BeaconChainError::SlotClockDidNotStart)?
        + slots_from_disparity::<T>(&chain.slot_clock);
    if attestation_slot > latest_permissible_slot {
        return Err(Error::FutureSlot {
            attestation_slot,
            latest_permissible_slot,
        });
    }

    let earliest_permissible_slot = chain
        .slot_clock
        .now()
        .ok_or(BeaconChainError::SlotClockDidNotStart)?
        - T::EthSpec::slots_per_epoch();
    if attestation_slot < earliest_permissible_slot {
        return Err(Error::PastSlot {
            attestation_slot,
            earliest_permissible_slot,
        });
    }

    Ok(())
}

/// `MAXIMUM_GOSSIP_CLOCK_DISPARITY` expressed in whole slots, rounding up so a fraction of a slot
/// of disparity still buys the full next slot of leeway.
fn slots_from_disparity<T: BeaconChainTypes>(slot_clock: &T::SlotClock) -> u64 {
    let slot_duration = slot_clock.slot_duration();
    if slot_duration.is_zero() {
        return 0;
    }
    let whole_slots = MAXIMUM_GOSSIP_CLOCK_DISPARITY.as_nanos() / slot_duration.as_nanos().max(1);
    whole_slots as u64 + 1
}

fn verify_attestation_epoch<T: EthSpec>(
    indexed_attestation: &IndexedAttestation<T>,
    state: &types::BeaconState<T>,
) -> Result<(), Error> {
    let attestation_epoch = indexed_attestation.data.slot.epoch(T::slots_per_epoch());
    let current_epoch = state.current_epoch();

    if attestation_epoch > current_epoch {
        Err(Error::FutureEpoch {
            attestation_epoch,
            current_epoch,
        })
    } else if attestation_epoch + 1 < current_epoch {
        Err(Error::PastEpoch {
            attestation_epoch,
            current_epoch,
        })
    } else {
        Ok(())
    }
}

/// Builds the validator-indexed form of `attestation` by looking up its committee against
/// `state`, the same committee-lookup-then-filter shape used by
/// `crate::beacon_chain::indexed_attestation` (kept separate here since gossip validation needs
/// its own `Error` type rather than `BeaconChainError`).
fn build_indexed_attestation<T: EthSpec>(
    state: &types::BeaconState<T>,
    attestation: &Attestation<T>,
) -> Result<IndexedAttestation<T>, Error> {
    let committee = state
        .get_beacon_committee(attestation.data.slot, attestation.data.index)
        .map_err(|_| Error::NoCommitteeForSlotAndIndex {
            slot: attestation.data.slot,
            index: attestation.data.index,
        })?;

    let mut attesting_indices: Vec<u64> = committee
        .committee
        .iter()
        .enumerate()
        .filter(|(i, _)| attestation.aggregation_bits.get(*i).unwrap_or(false))
        .map(|(_, &validator_index)| validator_index as u64)
        .collect();
    attesting_indices.sort_unstable();

    Ok(IndexedAttestation {
        attesting_indices: types::VariableList::new(attesting_indices)
            .unwrap_or_else(|_| types::VariableList::empty()),
        data: attestation.data.clone(),
        signature: attestation.signature.clone(),
    })
}

fn verify_indexed_attestation_signature<T: BeaconChainTypes>(
    chain: &BeaconChain<T>,
    indexed_attestation: &IndexedAttestation<T::EthSpec>,
    domain: Hash256,
) -> Result<bool, Error> {
    use types::SignedRoot;

    let head = chain.head();
    let pubkeys: Result<Vec<bls::PublicKey>, Error> = indexed_attestation
        .attesting_indices
        .iter()
        .map(|&index| {
            head.beacon_state
                .get_validator(index as usize)
                .map_err(|e| BeaconChainError::from(e).into())
                .and_then(|validator| {
                    validator
                        .pubkey
                        .decompress()
                        .map_err(|_| Error::InvalidSignature)
                })
        })
        .collect();
    let pubkeys = pubkeys?;
    drop(head);

    let message = indexed_attestation.data.signing_root(domain);
    let pubkey_refs: Vec<&bls::PublicKey> = pubkeys.iter().collect();
    Ok(indexed_attestation
        .signature
        .fast_aggregate_verify(message.as_bytes(), &pubkey_refs))
}

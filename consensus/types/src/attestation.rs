use crate::test_utils::TestRandom;
use test_random_derive::TestRandom;
use crate::{Checkpoint, EthSpec, Hash256, Slot, SignedRoot};
use bls::AggregateSignature;
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use ssz_types::{BitList, VariableList};
use tree_hash_derive::TreeHash;

/// The content a committee member votes on: a head-block root plus source/target checkpoints.
/// Identical `AttestationData` across validators is what lets signatures over it be aggregated.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Hash,
    Serialize,
    Deserialize,
    Encode,
    Decode,
    TreeHash,
    TestRandom,
)]
pub struct AttestationData {
    pub slot: Slot,
    pub index: u64,
    pub beacon_block_root: Hash256,
    pub source: Checkpoint,
    pub target: Checkpoint,
}

impl SignedRoot for AttestationData {}

/// The gossip/block-body form: a disjoint bit-set over the committee plus one aggregated
/// signature. `aggregation_bits` is what the attestation pool (C7) uses to detect overlap
/// between two attestations for the same `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash, TestRandom)]
#[serde(bound = "T: EthSpec")]
pub struct Attestation<T: EthSpec> {
    pub aggregation_bits: BitList<T::MaxValidatorsPerCommittee>,
    pub data: AttestationData,
    pub signature: AggregateSignature,
}

impl<T: EthSpec> Attestation<T> {
    /// True if `self` and `other` share no aggregation-bit in common, i.e. they can be combined
    /// into one wider aggregate without double-counting a signer.
    pub fn signers_disjoint_from(&self, other: &Self) -> bool {
        self.aggregation_bits
            .intersection(&other.aggregation_bits)
            .is_zero()
    }

    /// Combines `other` into `self` in place; callers must have already checked
    /// `signers_disjoint_from`.
    pub fn aggregate(&mut self, other: &Self) {
        self.aggregation_bits = self.aggregation_bits.union(&other.aggregation_bits);
        self.signature.add_assign_aggregate(&other.signature);
    }
}

/// The expanded, validator-index form used by fork choice and by `AttesterSlashing`: the
/// committee bitfield resolved into concrete global validator indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash, TestRandom)]
#[serde(bound = "T: EthSpec")]
pub struct IndexedAttestation<T: EthSpec> {
    pub attesting_indices: VariableList<u64, T::MaxValidatorsPerCommittee>,
    pub data: AttestationData,
    pub signature: AggregateSignature,
}

impl<T: EthSpec> IndexedAttestation<T> {
    /// Two indexed attestations are a slashable double-vote if they share the same target epoch
    /// but disagree on the data, and a slashable surround if one's (source, target) range
    /// strictly contains the other's.
    pub fn is_double_vote(&self, other: &Self) -> bool {
        self.data.target.epoch == other.data.target.epoch && self.data != other.data
    }

    pub fn is_surround_vote(&self, other: &Self) -> bool {
        let source_surrounds = self.data.source.epoch < other.data.source.epoch;
        let target_surrounds = other.data.target.epoch < self.data.target.epoch;
        source_surrounds && target_surrounds
    }
}

/// A historical attestation retained in `BeaconState.{previous,current}_epoch_attestations`
/// pre-altair; altair/bellatrix states replace this with a `ParticipationFlags` vector and no
/// longer carry it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash, TestRandom)]
#[serde(bound = "T: EthSpec")]
pub struct PendingAttestation<T: EthSpec> {
    pub aggregation_bits: BitList<T::MaxValidatorsPerCommittee>,
    pub data: AttestationData,
    pub inclusion_delay: u64,
    pub proposer_index: u64,
}

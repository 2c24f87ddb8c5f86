use crate::test_utils::TestRandom;
use test_random_derive::TestRandom;
use crate::{Epoch, SignedRoot};
use bls::Signature;
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// A validator's signed request to leave the active set. Refused by the duty engine's own
/// slashing-protection store only indirectly (exits aren't slashable); the refusal rules in
/// spec.md §4.11 apply to proposals and attestations.
#[derive(
    Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Encode, Decode, TreeHash, TestRandom,
)]
pub struct VoluntaryExit {
    pub epoch: Epoch,
    pub validator_index: u64,
}

impl SignedRoot for VoluntaryExit {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash, TestRandom)]
pub struct SignedVoluntaryExit {
    pub message: VoluntaryExit,
    pub signature: Signature,
}

use crate::test_utils::TestRandom;
use test_random_derive::TestRandom;
use crate::{IndexedAttestation, EthSpec};
use crate::beacon_block_header::SignedBeaconBlockHeader;
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// Two conflicting signed headers from the same proposer at the same slot: proof of a
/// double-proposal, processed by `process_block` to slash the offending validator.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash, TestRandom,
)]
pub struct ProposerSlashing {
    pub signed_header_1: SignedBeaconBlockHeader,
    pub signed_header_2: SignedBeaconBlockHeader,
}

/// Two conflicting indexed attestations (double-vote or surround-vote) from an overlapping set
/// of validators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash, TestRandom)]
#[serde(bound = "T: EthSpec")]
pub struct AttesterSlashing<T: EthSpec> {
    pub attestation_1: IndexedAttestation<T>,
    pub attestation_2: IndexedAttestation<T>,
}

use crate::test_utils::TestRandom;
use test_random_derive::TestRandom;
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash::Hash256;
use tree_hash_derive::TreeHash;

/// `state.fork`: the current and previous fork version, and the epoch of the last fork
/// transition. Carried in every state so that `get_domain` can salt signatures correctly across
/// a fork boundary without any process-wide mutable fork-schedule singleton (§9 "Global state").
#[derive(
    Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Encode, Decode, TreeHash, TestRandom,
)]
pub struct Fork {
    pub previous_version: [u8; 4],
    pub current_version: [u8; 4],
    pub epoch: crate::Epoch,
}

/// `genesis_validators_root` travels alongside `Fork` wherever a signing domain is computed.
pub type GenesisValidatorsRoot = Hash256;

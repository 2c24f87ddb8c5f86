use crate::test_utils::TestRandom;
use test_random_derive::TestRandom;
use crate::{Hash256, SignedRoot};
use bls::{PublicKeyBytes, SignatureBytes};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use ssz_types::{typenum::U33, FixedVector};
use tree_hash_derive::TreeHash;

/// The data signed by the depositing key; included verbatim in every `Deposit` so block
/// processing can verify it without touching the execution-layer deposit contract (out of scope
/// per spec.md §1 — deposits arrive pre-validated by the external collaborator).
#[derive(
    Debug, Clone, PartialEq, Default, Serialize, Deserialize, Encode, Decode, TreeHash, TestRandom,
)]
pub struct DepositData {
    pub pubkey: PublicKeyBytes,
    pub withdrawal_credentials: Hash256,
    pub amount: u64,
    pub signature: SignatureBytes,
}

impl SignedRoot for DepositData {}

/// One entry from the `deposits` list in a block body: the signed deposit data plus its Merkle
/// proof against the eth1 deposit-contract root known at block-proposal time.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash, TestRandom,
)]
pub struct Deposit {
    pub proof: FixedVector<Hash256, U33>,
    pub data: DepositData,
}

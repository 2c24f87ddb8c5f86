use crate::test_utils::TestRandom;
use test_random_derive::TestRandom;
use crate::{Attestation, ChainSpec, Domain, EthSpec, Fork, Hash256, SignedRoot};
use bls::{SecretKey, Signature};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// A validator's aggregate attestation plus the proof that it was selected to aggregate for this
/// committee/slot, broadcast on the `beacon_aggregate_and_proof` gossip topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash, TestRandom)]
#[serde(bound = "T: EthSpec")]
pub struct AggregateAndProof<T: EthSpec> {
    pub aggregator_index: u64,
    pub aggregate: Attestation<T>,
    pub selection_proof: Signature,
}

impl<T: EthSpec> SignedRoot for AggregateAndProof<T> {}

impl<T: EthSpec> AggregateAndProof<T> {
    pub fn from_aggregate(
        aggregator_index: u64,
        aggregate: Attestation<T>,
        selection_proof: Option<Signature>,
        secret_key: &SecretKey,
        fork: &Fork,
        genesis_validators_root: Hash256,
        spec: &ChainSpec,
    ) -> Self {
        let selection_proof = selection_proof.unwrap_or_else(|| {
            let domain = spec.get_domain(
                aggregate.data.slot.epoch(T::slots_per_epoch()),
                Domain::SelectionProof,
                fork,
                genesis_validators_root,
            );
            let message = aggregate.data.slot.signing_root(domain);
            secret_key.sign(message.as_bytes())
        });

        Self {
            aggregator_index,
            aggregate,
            selection_proof,
        }
    }

    /// True if `validator_pubkey` is the one who produced `self.selection_proof` over
    /// `self.aggregate.data.slot`, i.e. this aggregator really was selected for this slot.
    pub fn is_valid_selection_proof(
        &self,
        validator_pubkey: &bls::PublicKey,
        fork: &Fork,
        genesis_validators_root: Hash256,
        spec: &ChainSpec,
    ) -> bool {
        let target_epoch = self.aggregate.data.slot.epoch(T::slots_per_epoch());
        let domain = spec.get_domain(
            target_epoch,
            Domain::SelectionProof,
            fork,
            genesis_validators_root,
        );
        let message = self.aggregate.data.slot.signing_root(domain);
        self.selection_proof
            .verify(validator_pubkey, message.as_bytes())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash, TestRandom)]
#[serde(bound = "T: EthSpec")]
pub struct SignedAggregateAndProof<T: EthSpec> {
    pub message: AggregateAndProof<T>,
    pub signature: Signature,
}

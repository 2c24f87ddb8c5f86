use crate::test_utils::TestRandom;
use test_random_derive::TestRandom;
use crate::{
    Attestation, AttesterSlashing, Deposit, Eth1Data, EthSpec, Graffiti, ProposerSlashing,
    SignedVoluntaryExit, SyncAggregate,
};
use bls::Signature;
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use ssz_types::VariableList;
use superstruct::superstruct;
use tree_hash_derive::TreeHash;

/// The per-fork operation payload of a `BeaconBlock`. Base carries the phase0 operation lists;
/// Altair adds `sync_aggregate`; Bellatrix adds `execution_payload` on top of Altair. Modeled as
/// `superstruct` variants rather than one struct with `Option` fields, matching §9's "explicit
/// constructor functions, not implicit upcasts".
#[superstruct(
    variants(Base, Altair, Bellatrix),
    variant_attributes(derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash, TestRandom)),
    partial_getter_error(ty = "BeaconBlockBodyError", expr = "BeaconBlockBodyError::IncorrectVariant")
)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TreeHash, TestRandom)]
#[serde(bound = "T: EthSpec")]
#[tree_hash(enum_behaviour = "transparent")]
pub struct BeaconBlockBody<T: EthSpec> {
    pub randao_reveal: Signature,
    pub eth1_data: Eth1Data,
    pub graffiti: Graffiti,
    pub proposer_slashings: VariableList<ProposerSlashing, T::MaxProposerSlashings>,
    pub attester_slashings: VariableList<AttesterSlashing<T>, T::MaxAttesterSlashings>,
    pub attestations: VariableList<Attestation<T>, T::MaxAttestations>,
    pub deposits: VariableList<Deposit, T::MaxDeposits>,
    pub voluntary_exits: VariableList<SignedVoluntaryExit, T::MaxVoluntaryExits>,
    #[superstruct(only(Altair, Bellatrix))]
    pub sync_aggregate: SyncAggregate<T>,
    /// Out of scope per spec.md §1 ("the execution-layer JSON-RPC client" is an external
    /// collaborator); carried as an opaque root so bellatrix blocks still tree-hash correctly.
    #[superstruct(only(Bellatrix))]
    pub execution_payload_root: crate::Hash256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeaconBlockBodyError {
    IncorrectVariant,
}

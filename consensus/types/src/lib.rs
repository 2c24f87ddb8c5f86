//! Consensus data types shared by every other crate in the workspace: the structured
//! `BeaconState`, the forked `BeaconBlock` family, attestations, validators, the `ChainSpec`
//! fork schedule, and the `EthSpec` trait that parameterizes everything by preset
//! (mainnet/minimal).
//!
//! Nothing in here talks to a network or a disk; this crate is pure data plus the small amount
//! of pure-function logic (signing roots, committee shuffling, proposer selection) that every
//! consumer needs to agree on bit-for-bit.

mod aggregate_and_proof;
mod attestation;
mod beacon_block;
mod beacon_block_body;
mod beacon_block_header;
mod beacon_state;
mod block_summary;
mod chain_spec;
mod checkpoint;
pub mod consts;
mod deposit;
mod domain;
mod errors;
mod eth1_data;
mod eth_spec;
mod fork;
mod fork_name;
mod graffiti;
mod participation_flags;
mod signed_root;
mod slashings;
mod slot_epoch;
mod sync_committee;
mod validator;
mod voluntary_exit;

pub mod test_utils;

pub use crate::aggregate_and_proof::{AggregateAndProof, SignedAggregateAndProof};
pub use crate::attestation::{
    Attestation, AttestationData, IndexedAttestation, PendingAttestation,
};
pub use crate::beacon_block::{
    BeaconBlock, BeaconBlockAltair, BeaconBlockBase, BeaconBlockBellatrix, SignedBeaconBlock,
};
pub use crate::beacon_block_body::{
    BeaconBlockBody, BeaconBlockBodyAltair, BeaconBlockBodyBase, BeaconBlockBodyBellatrix,
    BeaconBlockBodyError,
};
pub use crate::beacon_block_header::{BeaconBlockHeader, SignedBeaconBlockHeader};
pub use crate::beacon_state::{
    AttestationDuty, BeaconCommittee, BeaconState, BeaconStateAltair, BeaconStateBase,
    BeaconStateBellatrix, CloneConfig, CommitteeCache, ExitCache, FoundationBeaconState,
    PubkeyCache,
};
pub use crate::block_summary::BlockSummary;
pub use crate::chain_spec::ChainSpec;
pub use crate::checkpoint::Checkpoint;
pub use crate::deposit::{Deposit, DepositData};
pub use crate::domain::Domain;
pub use crate::errors::{BeaconStateError, RelativeEpoch};
pub use crate::eth1_data::Eth1Data;
pub use crate::eth_spec::{EthSpec, MainnetEthSpec, MinimalEthSpec};
pub use crate::fork::{Fork, GenesisValidatorsRoot};
pub use crate::fork_name::{ForkName, InconsistentFork};
pub use crate::graffiti::Graffiti;
pub use crate::participation_flags::ParticipationFlags;
pub use crate::signed_root::SignedRoot;
pub use crate::slashings::{AttesterSlashing, ProposerSlashing};
pub use crate::slot_epoch::{Epoch, Slot, SyncCommitteePeriod};
pub use crate::sync_committee::{SyncAggregate, SyncCommittee};
pub use crate::validator::Validator;
pub use crate::voluntary_exit::{SignedVoluntaryExit, VoluntaryExit};

pub use bls::{AggregateSignature, Keypair, PublicKey, PublicKeyBytes, SecretKey, Signature, SignatureBytes};
pub use ethereum_types::H256 as Hash256;
pub use ssz_types::{BitList, BitVector, FixedVector, VariableList};
pub use typenum;

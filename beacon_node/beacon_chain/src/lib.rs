//! The consensus engine facade: everything a beacon node, validator client, or test harness needs
//! to import blocks and attestations, track fork choice, and produce new blocks lives behind
//! `BeaconChain` here.

#[macro_use]
extern crate lazy_static;

mod attestation_verification;
mod beacon_chain;
mod beacon_chain_builder;
mod beacon_fork_choice_store;
mod block_dag;
mod chain_config;
mod errors;
mod eth1_chain;
pub mod metrics;
mod naive_aggregation_pool;
mod quarantine;

pub use crate::attestation_verification::{
    Error as AttestationError, VerifiedUnaggregatedAttestation,
};
pub use crate::beacon_chain::{
    BeaconChain, BeaconChainTypes, BeaconForkChoice, BlockImportStatus, CheckPoint,
    MAXIMUM_GOSSIP_CLOCK_DISPARITY,
};
pub use crate::beacon_chain_builder::BeaconChainBuilder;
pub use crate::beacon_fork_choice_store::{
    BeaconForkChoiceStore, Error as ForkChoiceStoreError, ForkChoiceError,
};
pub use crate::block_dag::{BlockDag, Error as BlockDagError};
pub use crate::chain_config::ChainConfig;
pub use crate::errors::BeaconChainError;
pub use crate::eth1_chain::{Eth1Chain, InteropEth1Chain};
pub use crate::naive_aggregation_pool::{
    Error as NaiveAggregationError, InsertOutcome, NaiveAggregationPool,
};
pub use crate::quarantine::Quarantine;

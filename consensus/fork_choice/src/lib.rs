//! An implementation of the phase0 LMD-GHOST fork choice rule, built on top of `proto_array`'s
//! compact array-backed block DAG.
//!
//! `ForkChoiceStore` is the seam between this crate and whatever keeps the checkpoints and
//! balances durable (`beacon_chain`'s `BeaconForkChoiceStore`, typically backed by `store`);
//! `ForkChoice<T, E>` itself holds no opinion about persistence.

mod fork_choice;
mod fork_choice_store;

pub use crate::fork_choice::{
    Error, ForkChoice, InvalidAttestation, InvalidBlock, PersistedForkChoice, QueuedAttestation,
    SAFE_SLOTS_TO_UPDATE_JUSTIFIED,
};
pub use fork_choice_store::ForkChoiceStore;
pub use proto_array::Block as ProtoBlock;

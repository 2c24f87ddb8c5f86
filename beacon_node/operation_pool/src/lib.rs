//! Holding area for gossiped attestations, slashings and voluntary exits between the time they
//! arrive over the network and the time a proposer's block assembly picks them up (§4.7).
//!
//! [`OperationPool`] is the shared, lock-guarded entry point the block-production and gossip
//! handling paths both talk to. Each operation kind lives in its own sub-pool so that, for
//! example, pruning finalized attestations never touches the slashing pools.

mod attestation_pool;
mod exit_pool;
mod metrics;
mod slashing_pool;

pub use attestation_pool::{AttestationPool, Error as AttestationError};
pub use exit_pool::ExitPool;
pub use slashing_pool::{AttesterSlashingPool, Error as SlashingError, ProposerSlashingPool};

use parking_lot::RwLock;
use ssz::{Decode, Encode};
use ssz_derive::{Decode as SszDecode, Encode as SszEncode};
use std::marker::PhantomData;
use store::{DBColumn, Error as StoreError, SimpleStoreItem};
use types::{
    Attestation, AttesterSlashing, BeaconState, ChainSpec, EthSpec, ProposerSlashing,
    SignedVoluntaryExit,
};

#[derive(Debug)]
pub enum Error {
    Attestation(AttestationError),
    Slashing(SlashingError),
}

impl From<AttestationError> for Error {
    fn from(e: AttestationError) -> Self {
        Error::Attestation(e)
    }
}

impl From<SlashingError> for Error {
    fn from(e: SlashingError) -> Self {
        Error::Slashing(e)
    }
}

/// Everything a proposer needs when assembling a block body, plus the bookkeeping to keep each
/// sub-pool from growing without bound as the chain advances.
#[derive(Default)]
pub struct OperationPool<T: EthSpec> {
    attestations: RwLock<AttestationPool<T>>,
    proposer_slashings: RwLock<ProposerSlashingPool>,
    attester_slashings: RwLock<AttesterSlashingPool<T>>,
    voluntary_exits: RwLock<ExitPool>,
}

impl<T: EthSpec> OperationPool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_attestation(&self, attestation: Attestation<T>) -> Result<(), Error> {
        self.attestations.write().insert(attestation)?;
        metrics::set_gauge(
            &metrics::ATTESTATION_POOL_SIZE,
            self.attestations.read().num_attestations() as i64,
        );
        Ok(())
    }

    pub fn get_attestations(&self, state: &BeaconState<T>, spec: &ChainSpec) -> Vec<Attestation<T>> {
        self.attestations.read().get_attestations(state, spec)
    }

    pub fn insert_proposer_slashing(&self, slashing: ProposerSlashing) -> Result<(), Error> {
        self.proposer_slashings.write().insert(slashing)?;
        metrics::set_gauge(
            &metrics::PROPOSER_SLASHING_POOL_SIZE,
            self.proposer_slashings.read().len() as i64,
        );
        Ok(())
    }

    pub fn get_proposer_slashings(&self, state: &BeaconState<T>) -> Vec<ProposerSlashing> {
        self.proposer_slashings.read().get_slashings(state)
    }

    pub fn insert_attester_slashing(&self, slashing: AttesterSlashing<T>) -> Result<(), Error> {
        self.attester_slashings.write().insert(slashing)?;
        metrics::set_gauge(
            &metrics::ATTESTER_SLASHING_POOL_SIZE,
            self.attester_slashings.read().len() as i64,
        );
        Ok(())
    }

    pub fn get_attester_slashings(&self, state: &BeaconState<T>) -> Vec<AttesterSlashing<T>> {
        self.attester_slashings.read().get_slashings(state)
    }

    pub fn insert_voluntary_exit(&self, exit: SignedVoluntaryExit) {
        self.voluntary_exits.write().insert(exit);
        metrics::set_gauge(
            &metrics::VOLUNTARY_EXIT_POOL_SIZE,
            self.voluntary_exits.read().len() as i64,
        );
    }

    pub fn get_voluntary_exits(&self, state: &BeaconState<T>) -> Vec<SignedVoluntaryExit> {
        self.voluntary_exits.read().get_voluntary_exits(state)
    }

    /// Drops everything that can no longer matter to a future block once `finalized_state` has
    /// been finalized: attestations at or before its slot, and slashings/exits against
    /// validators already slashed or exited.
    pub fn prune_all(&self, finalized_state: &BeaconState<T>) {
        self.attestations.write().prune(finalized_state.slot());
        self.proposer_slashings.write().prune(finalized_state);
        self.attester_slashings.write().prune(finalized_state);
        self.voluntary_exits.write().prune(finalized_state);
    }

    /// Snapshots the pool's attestations, slashings and exits for on-disk persistence across a
    /// restart. Aggregated attestation state, bucket structure and anything not resubmitted in
    /// these lists is lost and must be re-gossiped.
    pub fn to_persisted(&self) -> PersistedOperationPool<T> {
        let attestations = self.attestations.read();
        let proposer_slashings = self.proposer_slashings.read().snapshot();
        let attester_slashings = self.attester_slashings.read().snapshot();
        let voluntary_exits = self.voluntary_exits.read().snapshot();
        PersistedOperationPool {
            attestations: attestations.snapshot(),
            proposer_slashings,
            attester_slashings,
            voluntary_exits,
            _phantom: PhantomData,
        }
    }

    pub fn from_persisted(persisted: PersistedOperationPool<T>) -> Result<Self, Error> {
        let pool = Self::new();
        for attestation in persisted.attestations {
            pool.insert_attestation(attestation)?;
        }
        for slashing in persisted.proposer_slashings {
            pool.insert_proposer_slashing(slashing)?;
        }
        for slashing in persisted.attester_slashings {
            pool.insert_attester_slashing(slashing)?;
        }
        for exit in persisted.voluntary_exits {
            pool.insert_voluntary_exit(exit);
        }
        Ok(pool)
    }
}

/// Flat, SSZ-encodable snapshot of an [`OperationPool`], stored whole under
/// [`DBColumn::OpPool`] the same way [`network`]'s DHT record is stored under its own column.
#[derive(Clone, SszEncode, SszDecode)]
pub struct PersistedOperationPool<T: EthSpec> {
    attestations: Vec<Attestation<T>>,
    proposer_slashings: Vec<ProposerSlashing>,
    attester_slashings: Vec<AttesterSlashing<T>>,
    voluntary_exits: Vec<SignedVoluntaryExit>,
    #[ssz(skip_serializing, skip_deserializing)]
    _phantom: PhantomData<T>,
}

/// 32-byte fixed key the pool's single snapshot is always stored under, mirroring
/// `network::persisted_dht::DHT_DB_KEY`.
pub const OP_POOL_DB_KEY: &str = "OPPOOLOPPOOLOPPOOLOPPOOLOPPOOLO";

impl<T: EthSpec> SimpleStoreItem for PersistedOperationPool<T> {
    fn db_column() -> DBColumn {
        DBColumn::OpPool
    }

    fn as_store_bytes(&self) -> Vec<u8> {
        self.as_ssz_bytes()
    }

    fn from_store_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        Self::from_ssz_bytes(bytes).map_err(StoreError::SszDecodeError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{MemoryStore, Store};
    use types::{Hash256, MainnetEthSpec};

    type E = MainnetEthSpec;

    #[test]
    fn new_pool_is_empty() {
        let pool: OperationPool<E> = OperationPool::new();
        let persisted = pool.to_persisted();
        assert!(persisted.attestations.is_empty());
        assert!(persisted.proposer_slashings.is_empty());
        assert!(persisted.attester_slashings.is_empty());
        assert!(persisted.voluntary_exits.is_empty());
    }

    #[test]
    fn persisted_pool_round_trips_through_store() {
        let store = MemoryStore::<E>::open();
        let pool: OperationPool<E> = OperationPool::new();
        let persisted = pool.to_persisted();

        let key = Hash256::from_slice(OP_POOL_DB_KEY.as_bytes());
        store.put(&key, &persisted).unwrap();

        let recovered: PersistedOperationPool<E> = store.get(&key).unwrap().unwrap();
        assert!(recovered.attestations.is_empty());
    }
}

//! The chain database (§4.2): a single embedded KV store addressed through logical column
//! prefixes, split so that the bulky, append-mostly part of a `BeaconState` (the validator
//! registry) is written once per validator rather than once per state.
//!
//! [`KeyValueStore`] is the raw byte-oriented backend (`LevelDB` on disk, `MemoryStore` for
//! tests). [`Store`] is the typed API every other crate consumes; [`HotColdDB`] is the only
//! production implementation, and does the column routing and validator/state splitting
//! described in §4.2's rationale. Blocks and full-fork states round-trip through
//! [`SimpleStoreItem`] for everything that doesn't need that split (DHT records, fixed
//! pointers, pool snapshots).

mod config;
mod hot_cold_store;
mod leveldb_store;
mod memory_store;
mod partial_beacon_state;

pub use config::StoreConfig;
pub use hot_cold_store::HotColdDB;
pub use leveldb_store::LevelDB;
pub use memory_store::MemoryStore;
pub use partial_beacon_state::{ImmutableValidator, PartialBeaconState, ValidatorMutable};

use ssz::{Decode, DecodeError, Encode};
use std::sync::Arc;
use types::{BeaconState, EthSpec, Hash256, Slot};

pub use types::SignedBeaconBlock;

/// One logical table from §4.2's schema. The byte prefix each maps to is an implementation
/// detail of the KV backend, not part of this crate's public contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DBColumn {
    /// `key_values`: fixed pointers (head, tail, genesis, finalized deposits checkpoint) plus
    /// any other caller-defined [`SimpleStoreItem`].
    BeaconMeta,
    /// `blocks[fork]`.
    BeaconBlock,
    /// `state_no_validators[fork]`: full restore-point states, minus the validator registry.
    BeaconState,
    /// `state_diffs`: the same shape as `BeaconState`, for slots between restore points.
    BeaconStateDiff,
    /// `immutable_validators`: append-only `(pubkey, withdrawal_credentials)` by index.
    BeaconImmutableValidator,
    /// `state_roots`: `(slot_be || block_root) -> state_root`.
    BeaconStateRoot,
    /// `summaries`: `block_root -> {slot, parent_root}`.
    BeaconStateSummary,
    /// `finalized_blocks`: dense `slot -> block_root`.
    BeaconFinalizedBlockRoots,
    /// The operation pool's persisted snapshot.
    OpPool,
    /// The eth1 deposit/block cache's persisted snapshot.
    Eth1Cache,
    /// Fork choice's persisted snapshot (proto-array + votes).
    ForkChoice,
    /// The libp2p DHT's persisted ENR set.
    DhtEnrs,
}

impl DBColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            DBColumn::BeaconMeta => "bmt",
            DBColumn::BeaconBlock => "blk",
            DBColumn::BeaconState => "ste",
            DBColumn::BeaconStateDiff => "bsd",
            DBColumn::BeaconImmutableValidator => "biv",
            DBColumn::BeaconStateRoot => "bsr",
            DBColumn::BeaconStateSummary => "bss",
            DBColumn::BeaconFinalizedBlockRoots => "bfr",
            DBColumn::OpPool => "opo",
            DBColumn::Eth1Cache => "etc",
            DBColumn::ForkChoice => "frk",
            DBColumn::DhtEnrs => "dht",
        }
    }
}

#[derive(Debug)]
pub enum Error {
    SszDecodeError(DecodeError),
    VectorError(ssz_types::Error),
    CompressionError(snap::Error),
    DBError { message: String },
    SerdeError(String),
    BeaconStateError(types::BeaconStateError),
    BlockNotFound(Hash256),
    StateNotFound(Hash256),
    NoContinuationData,
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Error {
        Error::SszDecodeError(e)
    }
}

impl From<ssz_types::Error> for Error {
    fn from(e: ssz_types::Error) -> Error {
        Error::VectorError(e)
    }
}

impl From<snap::Error> for Error {
    fn from(e: snap::Error) -> Error {
        Error::CompressionError(e)
    }
}

impl From<types::BeaconStateError> for Error {
    fn from(e: types::BeaconStateError) -> Error {
        Error::BeaconStateError(e)
    }
}

/// A batched mutation, collected by [`Store::with_many_writes`] and applied atomically by
/// [`Store::do_atomically`]. Mirrors §4.2's "writes within `with_many_writes(body)` form a
/// single transaction" contract.
pub enum StoreOp<E: EthSpec> {
    PutBlock(Hash256, Arc<SignedBeaconBlock<E>>),
    PutState(Hash256, Box<BeaconState<E>>),
    DeleteBlock(Hash256),
    DeleteState(Hash256, Slot),
}

/// Anything that can be stored as a single opaque blob under one [`DBColumn`], keyed by an
/// arbitrary 32-byte key (usually a real hash, sometimes a fixed well-known constant like the
/// DHT's persistence key).
pub trait SimpleStoreItem: Sized {
    fn db_column() -> DBColumn;
    fn as_store_bytes(&self) -> Vec<u8>;
    fn from_store_bytes(bytes: &[u8]) -> Result<Self, Error>;
}

/// Convenience for the common case of an SSZ-encodable type stored whole under `column`. Most
/// [`SimpleStoreItem`] impls outside this crate (persisted DHT, op pool snapshot, ...) are one
/// line of boilerplate around this.
pub fn ssz_item_as_store_bytes<T: Encode>(item: &T) -> Vec<u8> {
    item.as_ssz_bytes()
}

pub fn ssz_item_from_store_bytes<T: Decode>(bytes: &[u8]) -> Result<T, Error> {
    Ok(T::from_ssz_bytes(bytes)?)
}

/// The raw byte-oriented half of the database: column-scoped get/put/delete plus an atomic
/// batch primitive. Implemented once per physical backend ([`LevelDB`], [`MemoryStore`]).
pub trait KeyValueStore<E: EthSpec>: Sync + Send + Sized + 'static {
    fn get_bytes(&self, column: DBColumn, key: &[u8]) -> Result<Option<Vec<u8>>, Error>;
    fn put_bytes(&self, column: DBColumn, key: &[u8], value: &[u8]) -> Result<(), Error>;
    fn key_exists(&self, column: DBColumn, key: &[u8]) -> Result<bool, Error>;
    fn key_delete(&self, column: DBColumn, key: &[u8]) -> Result<(), Error>;
    fn do_atomically(&self, batch: Vec<KeyValueStoreOp>) -> Result<(), Error>;
}

pub enum KeyValueStoreOp {
    PutKeyValue(DBColumn, Vec<u8>, Vec<u8>),
    DeleteKeyValue(DBColumn, Vec<u8>),
}

/// The typed API every other crate in the workspace consumes. `put`/`get` round-trip any
/// [`SimpleStoreItem`]; `put_block`/`get_block`/`put_state`/`get_state` know how to route
/// through the column split described in §4.2.
pub trait Store<E: EthSpec>: Sync + Send + Sized + 'static {
    fn get_bytes(&self, column: DBColumn, key: &[u8]) -> Result<Option<Vec<u8>>, Error>;
    fn put_bytes(&self, column: DBColumn, key: &[u8], value: &[u8]) -> Result<(), Error>;
    fn key_exists(&self, column: DBColumn, key: &[u8]) -> Result<bool, Error>;
    fn key_delete(&self, column: DBColumn, key: &[u8]) -> Result<(), Error>;
    fn do_atomically(&self, batch: Vec<StoreOp<E>>) -> Result<(), Error>;

    fn put<I: SimpleStoreItem>(&self, key: &Hash256, item: &I) -> Result<(), Error> {
        self.put_bytes(I::db_column(), key.as_bytes(), &item.as_store_bytes())
    }

    fn get<I: SimpleStoreItem>(&self, key: &Hash256) -> Result<Option<I>, Error> {
        match self.get_bytes(I::db_column(), key.as_bytes())? {
            Some(bytes) => Ok(Some(I::from_store_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn exists<I: SimpleStoreItem>(&self, key: &Hash256) -> Result<bool, Error> {
        self.key_exists(I::db_column(), key.as_bytes())
    }

    fn with_many_writes<F>(&self, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Vec<StoreOp<E>>) -> Result<(), Error>,
    {
        let mut ops = vec![];
        f(&mut ops)?;
        self.do_atomically(ops)
    }

    fn put_block(&self, block_root: &Hash256, block: SignedBeaconBlock<E>) -> Result<(), Error>;
    fn get_block(&self, block_root: &Hash256) -> Result<Option<SignedBeaconBlock<E>>, Error>;
    fn delete_block(&self, block_root: &Hash256) -> Result<(), Error>;

    fn put_state(&self, state_root: &Hash256, state: &BeaconState<E>) -> Result<(), Error>;
    fn get_state(
        &self,
        state_root: &Hash256,
        slot: Option<Slot>,
    ) -> Result<Option<BeaconState<E>>, Error>;
}

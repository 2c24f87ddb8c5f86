//! `HotColdDB`: the production [`Store`] implementation. Named for the distinction real
//! beacon-chain stores draw between "hot" recent data (kept whole, read constantly) and "cold"
//! historic data (only the restore points are kept whole; everything else is a diff) — here
//! realized as logical column routing over one [`KeyValueStore`] backend rather than two
//! physical databases, which is what §4.2 actually specifies ("a single embedded ... KV store
//! with logical tables").
//!
//! Blocks go through Snappy (§4.2: frame-less for phase0/altair, framed for bellatrix+) straight
//! into the `BeaconBlock` column. States are split by [`PartialBeaconState`]: the validator
//! registry is appended once per never-before-seen validator into
//! `BeaconImmutableValidator`, and the remainder lands in `BeaconState` (restore points, every
//! `slots_per_restore_point`) or `BeaconStateDiff` (every other slot) per [`StoreConfig`].

use crate::{
    DBColumn, Error, ImmutableValidator, KeyValueStore, KeyValueStoreOp, PartialBeaconState,
    SignedBeaconBlock, Store, StoreConfig, StoreOp,
};
use lru::LruCache;
use parking_lot::Mutex;
use ssz::{Decode, Encode};
use std::marker::PhantomData;
use std::sync::Arc;
use types::{BeaconState, EthSpec, ForkName, Hash256, Slot};

/// Fixed, well-known keys into the `BeaconMeta` column. Never hashes, so they can't collide
/// with anything `Hash256`-keyed.
mod meta_keys {
    use types::Hash256;

    pub fn key(name: &str) -> Hash256 {
        use eth2_hashing::hash;
        Hash256::from_slice(&hash(name.as_bytes()))
    }
}

fn compress_block(fork: ForkName, bytes: &[u8]) -> Result<Vec<u8>, Error> {
    match fork {
        // §4.2: phase0/altair blocks are frame-less snappy.
        ForkName::Base | ForkName::Altair => {
            let mut encoder = snap::raw::Encoder::new();
            Ok(encoder.compress_vec(bytes)?)
        }
        // bellatrix+: framed ("SZ") snappy, needed once payload bodies get large.
        ForkName::Bellatrix => {
            let mut buf = vec![];
            let mut writer = snap::write::FrameEncoder::new(&mut buf);
            std::io::Write::write_all(&mut writer, bytes)
                .map_err(|e| Error::DBError { message: e.to_string() })?;
            drop(writer);
            Ok(buf)
        }
    }
}

fn decompress_block(fork: ForkName, bytes: &[u8]) -> Result<Vec<u8>, Error> {
    match fork {
        ForkName::Base | ForkName::Altair => {
            let mut decoder = snap::raw::Decoder::new();
            Ok(decoder.decompress_vec(bytes)?)
        }
        ForkName::Bellatrix => {
            let mut out = vec![];
            let mut reader = snap::read::FrameDecoder::new(bytes);
            std::io::Read::read_to_end(&mut reader, &mut out)
                .map_err(|e| Error::DBError { message: e.to_string() })?;
            Ok(out)
        }
    }
}

pub struct HotColdDB<E: EthSpec, S: KeyValueStore<E>> {
    cold_db: S,
    config: StoreConfig,
    block_cache: Mutex<LruCache<Hash256, Arc<SignedBeaconBlock<E>>>>,
    state_cache: Mutex<LruCache<Hash256, Arc<BeaconState<E>>>>,
    /// How many rows of `immutable_validators` exist, i.e. the next free index to append at.
    /// Protected by a lock rather than folded into `cold_db` because every state write needs to
    /// read-then-append it, and the KV backend has no compare-and-swap primitive.
    validator_count: Mutex<usize>,
    _phantom: PhantomData<E>,
}

impl<E: EthSpec, S: KeyValueStore<E>> HotColdDB<E, S> {
    pub fn open(cold_db: S, config: StoreConfig) -> Result<Self, Error> {
        let validator_count = Self::count_immutable_validators(&cold_db)?;
        Ok(Self {
            cold_db,
            block_cache: Mutex::new(LruCache::new(config.block_cache_size)),
            state_cache: Mutex::new(LruCache::new(config.state_cache_size)),
            config,
            validator_count: Mutex::new(validator_count),
            _phantom: PhantomData,
        })
    }

    fn count_immutable_validators(cold_db: &S) -> Result<usize, Error> {
        match cold_db.get_bytes(DBColumn::BeaconMeta, b"validator_count")? {
            Some(bytes) => Ok(u64::from_ssz_bytes(&bytes)? as usize),
            None => Ok(0),
        }
    }

    fn immutable_validator_key(index: usize) -> [u8; 8] {
        (index as u64).to_be_bytes()
    }

    fn get_immutable_validator(&self, index: usize) -> Result<ImmutableValidator, Error> {
        let key = Self::immutable_validator_key(index);
        let bytes = self
            .cold_db
            .get_bytes(DBColumn::BeaconImmutableValidator, &key)?
            .ok_or(Error::NoContinuationData)?;
        ImmutableValidator::from_ssz_bytes(&bytes).map_err(Error::from)
    }

    fn get_immutable_validators(&self, count: usize) -> Result<Vec<ImmutableValidator>, Error> {
        (0..count).map(|i| self.get_immutable_validator(i)).collect()
    }

    /// True for the states this config treats as full restore points rather than diffs.
    fn is_restore_point(&self, slot: Slot) -> bool {
        slot.as_u64() % self.config.slots_per_restore_point == 0
    }

    fn state_column(&self, slot: Slot) -> DBColumn {
        if self.is_restore_point(slot) {
            DBColumn::BeaconState
        } else {
            DBColumn::BeaconStateDiff
        }
    }

    fn set_root_pointer(&self, name: &str, root: Hash256) -> Result<(), Error> {
        self.cold_db
            .put_bytes(DBColumn::BeaconMeta, meta_keys::key(name).as_bytes(), root.as_bytes())
    }

    fn get_root_pointer(&self, name: &str) -> Result<Option<Hash256>, Error> {
        Ok(self
            .cold_db
            .get_bytes(DBColumn::BeaconMeta, meta_keys::key(name).as_bytes())?
            .map(|bytes| Hash256::from_slice(&bytes)))
    }

    /// The block root the chain currently considers canonical head.
    pub fn set_head(&self, root: Hash256) -> Result<(), Error> {
        self.set_root_pointer("head", root)
    }
    pub fn get_head(&self) -> Result<Option<Hash256>, Error> {
        self.get_root_pointer("head")
    }

    /// The earliest block root this database still retains full history back to.
    pub fn set_tail(&self, root: Hash256) -> Result<(), Error> {
        self.set_root_pointer("tail", root)
    }
    pub fn get_tail(&self) -> Result<Option<Hash256>, Error> {
        self.get_root_pointer("tail")
    }

    pub fn set_genesis(&self, root: Hash256) -> Result<(), Error> {
        self.set_root_pointer("genesis", root)
    }
    pub fn get_genesis(&self) -> Result<Option<Hash256>, Error> {
        self.get_root_pointer("genesis")
    }

    /// The deposit index up to which finalized deposits no longer need a Merkle proof replayed
    /// from the eth1 deposit contract (§4.2's "finalized deposits checkpoint" pointer).
    pub fn set_finalized_deposits_checkpoint(&self, deposit_index: u64) -> Result<(), Error> {
        self.cold_db.put_bytes(
            DBColumn::BeaconMeta,
            meta_keys::key("finalized_deposits_checkpoint").as_bytes(),
            &deposit_index.as_ssz_bytes(),
        )
    }
    pub fn get_finalized_deposits_checkpoint(&self) -> Result<Option<u64>, Error> {
        match self.cold_db.get_bytes(
            DBColumn::BeaconMeta,
            meta_keys::key("finalized_deposits_checkpoint").as_bytes(),
        )? {
            Some(bytes) => Ok(Some(u64::from_ssz_bytes(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl<E: EthSpec, S: KeyValueStore<E>> Store<E> for HotColdDB<E, S> {
    fn get_bytes(&self, column: DBColumn, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        self.cold_db.get_bytes(column, key)
    }

    fn put_bytes(&self, column: DBColumn, key: &[u8], value: &[u8]) -> Result<(), Error> {
        self.cold_db.put_bytes(column, key, value)
    }

    fn key_exists(&self, column: DBColumn, key: &[u8]) -> Result<bool, Error> {
        self.cold_db.key_exists(column, key)
    }

    fn key_delete(&self, column: DBColumn, key: &[u8]) -> Result<(), Error> {
        self.cold_db.key_delete(column, key)
    }

    /// Forms a single `do_atomically` batch over the underlying KV store (§4.2:
    /// "writes within `with_many_writes(body)` form a single transaction; on non-panic exit the
    /// transaction commits, otherwise it rolls back"). `KeyValueStore::do_atomically` is the
    /// commit point; nothing here is visible to a reader until it returns `Ok`.
    fn do_atomically(&self, batch: Vec<StoreOp<E>>) -> Result<(), Error> {
        let mut kv_ops = Vec::with_capacity(batch.len());
        for op in &batch {
            match op {
                StoreOp::PutBlock(root, block) => {
                    let fork = match &block.message {
                        types::BeaconBlock::Base(_) => ForkName::Base,
                        types::BeaconBlock::Altair(_) => ForkName::Altair,
                        types::BeaconBlock::Bellatrix(_) => ForkName::Bellatrix,
                    };
                    let raw = block.as_ssz_bytes();
                    let compressed = if self.config.compression {
                        compress_block(fork, &raw)?
                    } else {
                        raw
                    };
                    kv_ops.push(KeyValueStoreOp::PutKeyValue(
                        DBColumn::BeaconBlock,
                        root.as_bytes().to_vec(),
                        compressed,
                    ));
                }
                StoreOp::DeleteBlock(root) => {
                    kv_ops.push(KeyValueStoreOp::DeleteKeyValue(
                        DBColumn::BeaconBlock,
                        root.as_bytes().to_vec(),
                    ));
                }
                StoreOp::PutState(root, state) => {
                    let mut validator_count = self.validator_count.lock();
                    let (partial, new_immutable) =
                        PartialBeaconState::from_state(state, *validator_count);
                    for (offset, immutable) in new_immutable.iter().enumerate() {
                        let key = Self::immutable_validator_key(*validator_count + offset);
                        kv_ops.push(KeyValueStoreOp::PutKeyValue(
                            DBColumn::BeaconImmutableValidator,
                            key.to_vec(),
                            immutable.as_ssz_bytes(),
                        ));
                    }
                    *validator_count += new_immutable.len();
                    kv_ops.push(KeyValueStoreOp::PutKeyValue(
                        DBColumn::BeaconMeta,
                        b"validator_count".to_vec(),
                        (*validator_count as u64).as_ssz_bytes(),
                    ));
                    kv_ops.push(KeyValueStoreOp::PutKeyValue(
                        self.state_column(state.slot()),
                        root.as_bytes().to_vec(),
                        partial.as_ssz_bytes(),
                    ));
                }
                StoreOp::DeleteState(root, slot) => {
                    kv_ops.push(KeyValueStoreOp::DeleteKeyValue(
                        self.state_column(*slot),
                        root.as_bytes().to_vec(),
                    ));
                }
            }
        }

        self.cold_db.do_atomically(kv_ops)?;

        // Caches are only updated after the underlying commit succeeds, so a panic mid-batch
        // (rolled back by `do_atomically`) never leaves a cache pointing at unwritten data.
        for op in batch {
            match op {
                StoreOp::PutBlock(root, block) => {
                    self.block_cache.lock().put(root, block);
                }
                StoreOp::DeleteBlock(root) => {
                    self.block_cache.lock().pop(&root);
                }
                StoreOp::PutState(root, state) => {
                    self.state_cache.lock().put(root, Arc::new(*state));
                }
                StoreOp::DeleteState(root, _) => {
                    self.state_cache.lock().pop(&root);
                }
            }
        }
        Ok(())
    }

    fn put_block(&self, block_root: &Hash256, block: SignedBeaconBlock<E>) -> Result<(), Error> {
        self.with_many_writes(|ops| {
            ops.push(StoreOp::PutBlock(*block_root, Arc::new(block)));
            Ok(())
        })
    }

    fn get_block(&self, block_root: &Hash256) -> Result<Option<SignedBeaconBlock<E>>, Error> {
        if let Some(block) = self.block_cache.lock().get(block_root) {
            return Ok(Some((**block).clone()));
        }
        let compressed = match self.get_bytes(DBColumn::BeaconBlock, block_root.as_bytes())? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        // The fork isn't recoverable from the compressed bytes alone, so try each in turn; the
        // Snappy frame format differences between phase0/altair and bellatrix make at most one
        // succeed in practice, matching how `summaries`/`finalized_blocks` let callers establish
        // a block's fork out-of-band before this call in the common path.
        for fork in [ForkName::Base, ForkName::Altair, ForkName::Bellatrix] {
            let raw = if self.config.compression {
                match decompress_block(fork, &compressed) {
                    Ok(raw) => raw,
                    Err(_) => continue,
                }
            } else {
                compressed.clone()
            };
            if let Ok(block) = SignedBeaconBlock::<E>::from_ssz_bytes(&raw) {
                let block = Arc::new(block);
                self.block_cache.lock().put(*block_root, block.clone());
                return Ok(Some((*block).clone()));
            }
        }
        Err(Error::BlockNotFound(*block_root))
    }

    fn delete_block(&self, block_root: &Hash256) -> Result<(), Error> {
        self.with_many_writes(|ops| {
            ops.push(StoreOp::DeleteBlock(*block_root));
            Ok(())
        })
    }

    fn put_state(&self, state_root: &Hash256, state: &BeaconState<E>) -> Result<(), Error> {
        self.with_many_writes(|ops| {
            ops.push(StoreOp::PutState(*state_root, Box::new(state.clone())));
            Ok(())
        })
    }

    fn get_state(
        &self,
        state_root: &Hash256,
        _slot: Option<Slot>,
    ) -> Result<Option<BeaconState<E>>, Error> {
        if let Some(state) = self.state_cache.lock().get(state_root) {
            return Ok(Some((**state).clone()));
        }
        let bytes = match self.get_bytes(DBColumn::BeaconState, state_root.as_bytes())? {
            Some(bytes) => bytes,
            None => match self.get_bytes(DBColumn::BeaconStateDiff, state_root.as_bytes())? {
                Some(bytes) => bytes,
                None => return Ok(None),
            },
        };
        let partial = PartialBeaconState::<E>::from_ssz_bytes(&bytes)?;
        let validators = self.get_immutable_validators(partial.validators_mutable.len())?;
        let state = partial.into_state(&validators)?;
        self.state_cache
            .lock()
            .put(*state_root, Arc::new(state.clone()));
        Ok(Some(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[test]
    fn restore_point_routing() {
        let store: HotColdDB<types::MinimalEthSpec, MemoryStore<types::MinimalEthSpec>> =
            HotColdDB::open(MemoryStore::open(), StoreConfig::default()).unwrap();
        assert!(store.is_restore_point(Slot::new(0)));
        assert!(!store.is_restore_point(Slot::new(1)));
        assert!(store.is_restore_point(Slot::new(store.config.slots_per_restore_point)));
    }

    #[test]
    fn meta_key_is_stable() {
        assert_eq!(meta_keys::key("head"), meta_keys::key("head"));
        assert_ne!(meta_keys::key("head"), meta_keys::key("tail"));
    }

    #[test]
    fn head_tail_genesis_pointers_roundtrip() {
        let store: HotColdDB<types::MinimalEthSpec, MemoryStore<types::MinimalEthSpec>> =
            HotColdDB::open(MemoryStore::open(), StoreConfig::default()).unwrap();
        assert_eq!(store.get_head().unwrap(), None);

        let head = Hash256::repeat_byte(1);
        let tail = Hash256::repeat_byte(2);
        let genesis = Hash256::repeat_byte(3);
        store.set_head(head).unwrap();
        store.set_tail(tail).unwrap();
        store.set_genesis(genesis).unwrap();
        assert_eq!(store.get_head().unwrap(), Some(head));
        assert_eq!(store.get_tail().unwrap(), Some(tail));
        assert_eq!(store.get_genesis().unwrap(), Some(genesis));

        assert_eq!(store.get_finalized_deposits_checkpoint().unwrap(), None);
        store.set_finalized_deposits_checkpoint(42).unwrap();
        assert_eq!(store.get_finalized_deposits_checkpoint().unwrap(), Some(42));
    }
}

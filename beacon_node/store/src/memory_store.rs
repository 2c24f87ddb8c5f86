//! An in-process `KeyValueStore`/`Store` backed by a `HashMap`, for tests and the `lcli`-style
//! tools that don't want a real database on disk. Stores whole, unsplit `BeaconState`s (no
//! validator/diff routing) since nothing here cares about write amplification.

use crate::{DBColumn, Error, KeyValueStore, KeyValueStoreOp, SignedBeaconBlock, Store, StoreOp};
use parking_lot::RwLock;
use ssz::{Decode, Encode};
use std::collections::HashMap;
use std::marker::PhantomData;
use types::{BeaconState, EthSpec, Hash256, Slot};

fn column_key(column: DBColumn, key: &[u8]) -> Vec<u8> {
    let mut out = column.as_str().as_bytes().to_vec();
    out.extend_from_slice(key);
    out
}

pub struct MemoryStore<E: EthSpec> {
    db: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
    _phantom: PhantomData<E>,
}

impl<E: EthSpec> MemoryStore<E> {
    pub fn open() -> Self {
        Self {
            db: RwLock::new(HashMap::new()),
            _phantom: PhantomData,
        }
    }
}

impl<E: EthSpec> KeyValueStore<E> for MemoryStore<E> {
    fn get_bytes(&self, column: DBColumn, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.db.read().get(&column_key(column, key)).cloned())
    }

    fn put_bytes(&self, column: DBColumn, key: &[u8], value: &[u8]) -> Result<(), Error> {
        self.db
            .write()
            .insert(column_key(column, key), value.to_vec());
        Ok(())
    }

    fn key_exists(&self, column: DBColumn, key: &[u8]) -> Result<bool, Error> {
        Ok(self.db.read().contains_key(&column_key(column, key)))
    }

    fn key_delete(&self, column: DBColumn, key: &[u8]) -> Result<(), Error> {
        self.db.write().remove(&column_key(column, key));
        Ok(())
    }

    fn do_atomically(&self, batch: Vec<KeyValueStoreOp>) -> Result<(), Error> {
        let mut db = self.db.write();
        for op in batch {
            match op {
                KeyValueStoreOp::PutKeyValue(column, key, value) => {
                    db.insert(column_key(column, &key), value);
                }
                KeyValueStoreOp::DeleteKeyValue(column, key) => {
                    db.remove(&column_key(column, &key));
                }
            }
        }
        Ok(())
    }
}

impl<E: EthSpec> Store<E> for MemoryStore<E> {
    fn get_bytes(&self, column: DBColumn, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        KeyValueStore::<E>::get_bytes(self, column, key)
    }

    fn put_bytes(&self, column: DBColumn, key: &[u8], value: &[u8]) -> Result<(), Error> {
        KeyValueStore::<E>::put_bytes(self, column, key, value)
    }

    fn key_exists(&self, column: DBColumn, key: &[u8]) -> Result<bool, Error> {
        KeyValueStore::<E>::key_exists(self, column, key)
    }

    fn key_delete(&self, column: DBColumn, key: &[u8]) -> Result<(), Error> {
        KeyValueStore::<E>::key_delete(self, column, key)
    }

    fn do_atomically(&self, batch: Vec<StoreOp<E>>) -> Result<(), Error> {
        for op in batch {
            match op {
                StoreOp::PutBlock(root, block) => self.put_block(&root, (*block).clone())?,
                StoreOp::PutState(root, state) => self.put_state(&root, &state)?,
                StoreOp::DeleteBlock(root) => self.delete_block(&root)?,
                StoreOp::DeleteState(root, _slot) => {
                    self.key_delete(DBColumn::BeaconState, root.as_bytes())?
                }
            }
        }
        Ok(())
    }

    fn put_block(&self, block_root: &Hash256, block: SignedBeaconBlock<E>) -> Result<(), Error> {
        self.put_bytes(DBColumn::BeaconBlock, block_root.as_bytes(), &block.as_ssz_bytes())
    }

    fn get_block(&self, block_root: &Hash256) -> Result<Option<SignedBeaconBlock<E>>, Error> {
        match self.get_bytes(DBColumn::BeaconBlock, block_root.as_bytes())? {
            Some(bytes) => Ok(Some(SignedBeaconBlock::from_ssz_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn delete_block(&self, block_root: &Hash256) -> Result<(), Error> {
        self.key_delete(DBColumn::BeaconBlock, block_root.as_bytes())
    }

    fn put_state(&self, state_root: &Hash256, state: &BeaconState<E>) -> Result<(), Error> {
        let bytes = match state {
            BeaconState::Base(inner) => inner.as_ssz_bytes(),
            BeaconState::Altair(inner) => inner.as_ssz_bytes(),
            BeaconState::Bellatrix(inner) => inner.as_ssz_bytes(),
        };
        let mut tagged = vec![match state {
            BeaconState::Base(_) => 0u8,
            BeaconState::Altair(_) => 1u8,
            BeaconState::Bellatrix(_) => 2u8,
        }];
        tagged.extend_from_slice(&bytes);
        self.put_bytes(DBColumn::BeaconState, state_root.as_bytes(), &tagged)
    }

    fn get_state(
        &self,
        state_root: &Hash256,
        _slot: Option<Slot>,
    ) -> Result<Option<BeaconState<E>>, Error> {
        let tagged = match self.get_bytes(DBColumn::BeaconState, state_root.as_bytes())? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        let (tag, body) = tagged.split_first().ok_or(Error::NoContinuationData)?;
        let state = match tag {
            0 => BeaconState::Base(Decode::from_ssz_bytes(body)?),
            1 => BeaconState::Altair(Decode::from_ssz_bytes(body)?),
            2 => BeaconState::Bellatrix(Decode::from_ssz_bytes(body)?),
            _ => return Err(Error::NoContinuationData),
        };
        Ok(Some(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{Hash256 as H, MinimalEthSpec};

    #[test]
    fn put_get_roundtrip() {
        let store = MemoryStore::<MinimalEthSpec>::open();
        store
            .put_bytes(DBColumn::BeaconMeta, b"k", b"v")
            .unwrap();
        assert_eq!(
            store.get_bytes(DBColumn::BeaconMeta, b"k").unwrap(),
            Some(b"v".to_vec())
        );
        assert!(store.key_exists(DBColumn::BeaconMeta, b"k").unwrap());
        store.key_delete(DBColumn::BeaconMeta, b"k").unwrap();
        assert!(!store.key_exists(DBColumn::BeaconMeta, b"k").unwrap());
        let _ = H::zero();
    }
}

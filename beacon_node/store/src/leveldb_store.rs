//! On-disk backend: a `LevelDB` database with column membership folded into the key (the same
//! `"{column}{key}"` scheme `MemoryStore` uses in memory), and batched writes going through
//! `leveldb`'s own `Writebatch` so `do_atomically` is a single atomic commit.

use crate::{DBColumn, Error, KeyValueStore, KeyValueStoreOp};
use db_key::Key;
use leveldb::batch::{Batch, Writebatch};
use leveldb::database::kv::KV;
use leveldb::database::Database;
use leveldb::options::{Options, ReadOptions, WriteOptions};
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::path::Path;
use types::EthSpec;

/// `db-key`'s `Key` trait wants a type that round-trips through `&[u8]`; our keys are already
/// byte strings (`column prefix || hash/index`), so this is a thin pass-through wrapper.
#[derive(Clone)]
pub struct BytesKey(Vec<u8>);

impl Key for BytesKey {
    fn from_u8(bytes: &[u8]) -> Self {
        BytesKey(bytes.to_vec())
    }

    fn as_slice<T, F: Fn(&[u8]) -> T>(&self, f: F) -> T {
        f(&self.0)
    }
}

impl BytesKey {
    fn new(column: DBColumn, key: &[u8]) -> Self {
        let mut out = column.as_str().as_bytes().to_vec();
        out.extend_from_slice(key);
        BytesKey(out)
    }
}

pub struct LevelDB<E: EthSpec> {
    db: Mutex<Database<BytesKey>>,
    _phantom: PhantomData<E>,
}

impl<E: EthSpec> LevelDB<E> {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let mut options = Options::new();
        options.create_if_missing = true;

        let db = Database::open(path, options).map_err(|e| Error::DBError {
            message: format!("failed to open leveldb at {:?}: {:?}", path, e),
        })?;

        Ok(Self {
            db: Mutex::new(db),
            _phantom: PhantomData,
        })
    }
}

impl<E: EthSpec> KeyValueStore<E> for LevelDB<E> {
    fn get_bytes(&self, column: DBColumn, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        let key = BytesKey::new(column, key);
        self.db
            .lock()
            .get(ReadOptions::new(), key)
            .map_err(|e| Error::DBError {
                message: format!("leveldb get failed: {:?}", e),
            })
    }

    fn put_bytes(&self, column: DBColumn, key: &[u8], value: &[u8]) -> Result<(), Error> {
        let key = BytesKey::new(column, key);
        self.db
            .lock()
            .put(WriteOptions::new(), key, value)
            .map_err(|e| Error::DBError {
                message: format!("leveldb put failed: {:?}", e),
            })
    }

    fn key_exists(&self, column: DBColumn, key: &[u8]) -> Result<bool, Error> {
        Ok(self.get_bytes(column, key)?.is_some())
    }

    fn key_delete(&self, column: DBColumn, key: &[u8]) -> Result<(), Error> {
        let key = BytesKey::new(column, key);
        self.db
            .lock()
            .delete(WriteOptions::new(), key)
            .map_err(|e| Error::DBError {
                message: format!("leveldb delete failed: {:?}", e),
            })
    }

    fn do_atomically(&self, batch: Vec<KeyValueStoreOp>) -> Result<(), Error> {
        let mut writebatch = Writebatch::new();
        for op in batch {
            match op {
                KeyValueStoreOp::PutKeyValue(column, key, value) => {
                    writebatch.put(BytesKey::new(column, &key), &value);
                }
                KeyValueStoreOp::DeleteKeyValue(column, key) => {
                    writebatch.delete(BytesKey::new(column, &key));
                }
            }
        }
        self.db
            .lock()
            .write(WriteOptions::new(), &writebatch)
            .map_err(|e| Error::DBError {
                message: format!("leveldb batch write failed: {:?}", e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::MinimalEthSpec;

    #[test]
    fn put_get_delete_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let db: LevelDB<MinimalEthSpec> = LevelDB::open(dir.path()).unwrap();

        assert_eq!(db.get_bytes(DBColumn::BeaconMeta, b"k").unwrap(), None);
        db.put_bytes(DBColumn::BeaconMeta, b"k", b"v").unwrap();
        assert_eq!(
            db.get_bytes(DBColumn::BeaconMeta, b"k").unwrap(),
            Some(b"v".to_vec())
        );
        assert!(db.key_exists(DBColumn::BeaconMeta, b"k").unwrap());

        // Same key in a different column must not collide.
        assert_eq!(db.get_bytes(DBColumn::BeaconBlock, b"k").unwrap(), None);

        db.key_delete(DBColumn::BeaconMeta, b"k").unwrap();
        assert!(!db.key_exists(DBColumn::BeaconMeta, b"k").unwrap());
    }

    #[test]
    fn atomic_batch() {
        let dir = tempfile::tempdir().unwrap();
        let db: LevelDB<MinimalEthSpec> = LevelDB::open(dir.path()).unwrap();

        db.do_atomically(vec![
            KeyValueStoreOp::PutKeyValue(DBColumn::BeaconMeta, b"a".to_vec(), b"1".to_vec()),
            KeyValueStoreOp::PutKeyValue(DBColumn::BeaconMeta, b"b".to_vec(), b"2".to_vec()),
        ])
        .unwrap();
        assert_eq!(
            db.get_bytes(DBColumn::BeaconMeta, b"a").unwrap(),
            Some(b"1".to_vec())
        );
        assert_eq!(
            db.get_bytes(DBColumn::BeaconMeta, b"b").unwrap(),
            Some(b"2".to_vec())
        );
    }
}

//! Crash-consistent double-signing protection for the duty engine (spec.md §4.11). Every
//! proposal or vote a local key is about to sign must clear [`SlashingDatabase::check_and_insert_block_proposal`]
//! or [`SlashingDatabase::check_and_insert_attestation`] *before* the signature is produced: the
//! new high-water-mark is committed to SQLite first, and only a successful commit authorizes the
//! caller to go on and sign. A crash between the two never leaves the validator able to
//! double-sign, because the next process start reads the same committed row back.

mod signed_attestation;
mod signed_block;

#[cfg(test)]
mod attestation_tests;
#[cfg(test)]
mod block_tests;
#[cfg(test)]
mod parallel_tests;
#[cfg(test)]
mod test_utils;

pub use signed_attestation::SignedAttestation;
pub use signed_block::SignedBlock;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::path::Path;
use types::{AttestationData, Epoch, PublicKeyBytes, Slot};

type Pool = r2d2::Pool<SqliteConnectionManager>;

#[derive(Debug)]
pub enum Error {
    /// The proposed slot is not strictly greater than the last slot signed by this key.
    DoubleBlockProposal { existing_slot: Slot, proposed_slot: Slot },
    /// The vote repeats or is surrounded/surrounding a previously-signed vote.
    InvalidAttestation(InvalidAttestation),
    /// No row exists for this public key; it was never registered with `register_validator`.
    NotRegistered,
    SQLError(rusqlite::Error),
    R2D2Error(r2d2::Error),
    FileError(filesystem::Error),
}

#[derive(Debug, PartialEq, Eq)]
pub enum InvalidAttestation {
    /// `target_epoch` is not strictly greater than the last target this key voted for.
    DoubleVote { existing_target: Epoch, target: Epoch },
    /// The new vote would surround a previously signed one.
    NewSurroundsPrev { prev_target: Epoch },
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::SQLError(e)
    }
}

impl From<r2d2::Error> for Error {
    fn from(e: r2d2::Error) -> Self {
        Error::R2D2Error(e)
    }
}

/// SQLite-backed store of `(last_signed_block_slot, last_source_epoch, last_target_epoch)` per
/// registered validator. Every check-and-insert runs inside a `BEGIN IMMEDIATE` transaction, so
/// SQLite's own file locking is what makes concurrent signing requests for the same key
/// serialize rather than race.
pub struct SlashingDatabase {
    pool: Pool,
}

impl SlashingDatabase {
    /// Creates a fresh database at `path`, failing if one already exists there.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::new(manager)?;
        let db = Self { pool };
        db.pool.get()?.execute_batch(
            "CREATE TABLE validators (
                id INTEGER PRIMARY KEY,
                public_key BLOB NOT NULL UNIQUE,
                last_signed_block_slot INTEGER,
                last_signed_attestation_source_epoch INTEGER,
                last_signed_attestation_target_epoch INTEGER
            )",
        )?;
        filesystem::restrict_file_permissions(path).map_err(Error::FileError)?;
        Ok(db)
    }

    /// Opens an existing database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::new(manager)?;
        Ok(Self { pool })
    }

    /// Registers `public_key` with an empty signing history. A no-op if already registered.
    pub fn register_validator(&self, public_key: &PublicKeyBytes) -> Result<(), Error> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT OR IGNORE INTO validators (public_key) VALUES (?1)",
            params![public_key.as_bytes().to_vec()],
        )?;
        Ok(())
    }

    /// Returns `Ok(())` and commits `proposed_slot` as the new high-water-mark iff
    /// `proposed_slot` is strictly greater than the last block slot signed by `public_key`.
    pub fn check_and_insert_block_proposal(
        &self,
        public_key: &PublicKeyBytes,
        proposed: &SignedBlock,
    ) -> Result<(), Error> {
        let mut conn = self.pool.get()?;
        let txn = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let existing_slot: Option<i64> = txn
            .query_row(
                "SELECT last_signed_block_slot FROM validators WHERE public_key = ?1",
                params![public_key.as_bytes().to_vec()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(Error::NotRegistered)?;

        if let Some(existing_slot) = existing_slot {
            let existing_slot = Slot::new(existing_slot as u64);
            if proposed.slot <= existing_slot {
                return Err(Error::DoubleBlockProposal {
                    existing_slot,
                    proposed_slot: proposed.slot,
                });
            }
        }

        txn.execute(
            "UPDATE validators SET last_signed_block_slot = ?1 WHERE public_key = ?2",
            params![proposed.slot.as_u64() as i64, public_key.as_bytes().to_vec()],
        )?;
        txn.commit()?;
        Ok(())
    }

    /// Returns `Ok(())` and commits `data` as the new high-water-mark iff it neither repeats,
    /// surrounds, nor is surrounded by the last vote signed by `public_key`.
    pub fn check_and_insert_attestation(
        &self,
        public_key: &PublicKeyBytes,
        data: &AttestationData,
    ) -> Result<(), Error> {
        let proposed = SignedAttestation::from(data);
        let mut conn = self.pool.get()?;
        let txn = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let existing: Option<(Option<i64>, Option<i64>)> = txn
            .query_row(
                "SELECT last_signed_attestation_source_epoch, last_signed_attestation_target_epoch
                 FROM validators WHERE public_key = ?1",
                params![public_key.as_bytes().to_vec()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or(Error::NotRegistered)?;

        if let (Some(source), Some(target)) = existing {
            let prev = SignedAttestation::new(Epoch::new(source as u64), Epoch::new(target as u64));
            validate_attestation(&prev, &proposed)?;
        }

        txn.execute(
            "UPDATE validators
             SET last_signed_attestation_source_epoch = ?1, last_signed_attestation_target_epoch = ?2
             WHERE public_key = ?3",
            params![
                proposed.source_epoch.as_u64() as i64,
                proposed.target_epoch.as_u64() as i64,
                public_key.as_bytes().to_vec(),
            ],
        )?;
        txn.commit()?;
        Ok(())
    }
}

/// The three slashing conditions of spec.md §4.11, checked against the single previous vote this
/// store retains.
fn validate_attestation(prev: &SignedAttestation, new: &SignedAttestation) -> Result<(), Error> {
    // Catches an exact repeat, a non-increasing target, and "prev surrounds new" (prev.source <
    // new.source && prev.target > new.target) all at once: every one of those has
    // `new.target_epoch <= prev.target_epoch`.
    if new.target_epoch <= prev.target_epoch {
        return Err(Error::InvalidAttestation(InvalidAttestation::DoubleVote {
            existing_target: prev.target_epoch,
            target: new.target_epoch,
        }));
    }
    // Reaching here means new.target_epoch > prev.target_epoch, so a source that went backwards
    // means the new vote surrounds the previous one.
    if new.source_epoch < prev.source_epoch {
        return Err(Error::InvalidAttestation(InvalidAttestation::NewSurroundsPrev {
            prev_target: prev.target_epoch,
        }));
    }
    Ok(())
}

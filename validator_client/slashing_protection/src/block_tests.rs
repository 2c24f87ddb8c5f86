#![cfg(test)]

use crate::test_utils::pubkey;
use crate::{Error, SignedBlock, SlashingDatabase};
use tempfile::NamedTempFile;
use types::Slot;

pub fn block(slot: u64) -> SignedBlock {
    SignedBlock::new(Slot::new(slot))
}

#[test]
fn first_proposal_always_succeeds() {
    let file = NamedTempFile::new().unwrap();
    let db = SlashingDatabase::create(file.path()).unwrap();
    let pk = pubkey(0);
    db.register_validator(&pk).unwrap();

    db.check_and_insert_block_proposal(&pk, &block(10)).unwrap();
}

#[test]
fn strictly_increasing_slots_succeed() {
    let file = NamedTempFile::new().unwrap();
    let db = SlashingDatabase::create(file.path()).unwrap();
    let pk = pubkey(0);
    db.register_validator(&pk).unwrap();

    db.check_and_insert_block_proposal(&pk, &block(10)).unwrap();
    db.check_and_insert_block_proposal(&pk, &block(11)).unwrap();
    db.check_and_insert_block_proposal(&pk, &block(20)).unwrap();
}

#[test]
fn repeat_slot_rejected() {
    let file = NamedTempFile::new().unwrap();
    let db = SlashingDatabase::create(file.path()).unwrap();
    let pk = pubkey(0);
    db.register_validator(&pk).unwrap();

    db.check_and_insert_block_proposal(&pk, &block(10)).unwrap();
    match db.check_and_insert_block_proposal(&pk, &block(10)) {
        Err(Error::DoubleBlockProposal { existing_slot, proposed_slot }) => {
            assert_eq!(existing_slot, Slot::new(10));
            assert_eq!(proposed_slot, Slot::new(10));
        }
        other => panic!("expected DoubleBlockProposal, got {:?}", other),
    }
}

#[test]
fn earlier_slot_rejected() {
    let file = NamedTempFile::new().unwrap();
    let db = SlashingDatabase::create(file.path()).unwrap();
    let pk = pubkey(0);
    db.register_validator(&pk).unwrap();

    db.check_and_insert_block_proposal(&pk, &block(10)).unwrap();
    assert!(db.check_and_insert_block_proposal(&pk, &block(9)).is_err());
}

#[test]
fn unregistered_key_rejected() {
    let file = NamedTempFile::new().unwrap();
    let db = SlashingDatabase::create(file.path()).unwrap();
    let pk = pubkey(0);

    match db.check_and_insert_block_proposal(&pk, &block(10)) {
        Err(Error::NotRegistered) => {}
        other => panic!("expected NotRegistered, got {:?}", other),
    }
}

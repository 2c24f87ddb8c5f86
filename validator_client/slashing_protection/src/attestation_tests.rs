#![cfg(test)]

use crate::test_utils::{attestation_data_builder, pubkey};
use crate::{Error, InvalidAttestation, SlashingDatabase};
use tempfile::NamedTempFile;
use types::Epoch;

#[test]
fn first_vote_always_succeeds() {
    let file = NamedTempFile::new().unwrap();
    let db = SlashingDatabase::create(file.path()).unwrap();
    let pk = pubkey(0);
    db.register_validator(&pk).unwrap();

    db.check_and_insert_attestation(&pk, &attestation_data_builder(0, 1))
        .unwrap();
}

#[test]
fn increasing_source_and_target_succeed() {
    let file = NamedTempFile::new().unwrap();
    let db = SlashingDatabase::create(file.path()).unwrap();
    let pk = pubkey(0);
    db.register_validator(&pk).unwrap();

    db.check_and_insert_attestation(&pk, &attestation_data_builder(0, 1))
        .unwrap();
    db.check_and_insert_attestation(&pk, &attestation_data_builder(1, 2))
        .unwrap();
    db.check_and_insert_attestation(&pk, &attestation_data_builder(5, 10))
        .unwrap();
}

#[test]
fn double_vote_same_target_rejected() {
    let file = NamedTempFile::new().unwrap();
    let db = SlashingDatabase::create(file.path()).unwrap();
    let pk = pubkey(0);
    db.register_validator(&pk).unwrap();

    db.check_and_insert_attestation(&pk, &attestation_data_builder(0, 5))
        .unwrap();
    match db.check_and_insert_attestation(&pk, &attestation_data_builder(1, 5)) {
        Err(Error::InvalidAttestation(InvalidAttestation::DoubleVote { existing_target, target })) => {
            assert_eq!(existing_target, Epoch::new(5));
            assert_eq!(target, Epoch::new(5));
        }
        other => panic!("expected DoubleVote, got {:?}", other),
    }
}

#[test]
fn new_surrounds_prev_rejected() {
    let file = NamedTempFile::new().unwrap();
    let db = SlashingDatabase::create(file.path()).unwrap();
    let pk = pubkey(0);
    db.register_validator(&pk).unwrap();

    db.check_and_insert_attestation(&pk, &attestation_data_builder(3, 4))
        .unwrap();
    // source 1 < 3, target 10 > 4: new vote surrounds the old one.
    match db.check_and_insert_attestation(&pk, &attestation_data_builder(1, 10)) {
        Err(Error::InvalidAttestation(InvalidAttestation::NewSurroundsPrev { prev_target })) => {
            assert_eq!(prev_target, Epoch::new(4));
        }
        other => panic!("expected NewSurroundsPrev, got {:?}", other),
    }
}

#[test]
fn prev_surrounds_new_rejected() {
    let file = NamedTempFile::new().unwrap();
    let db = SlashingDatabase::create(file.path()).unwrap();
    let pk = pubkey(0);
    db.register_validator(&pk).unwrap();

    db.check_and_insert_attestation(&pk, &attestation_data_builder(0, 10))
        .unwrap();
    // source 1 > 0, target 5 < 10: the already-signed vote surrounds this one.
    assert!(db
        .check_and_insert_attestation(&pk, &attestation_data_builder(1, 5))
        .is_err());
}

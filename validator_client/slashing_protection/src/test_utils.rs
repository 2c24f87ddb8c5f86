#![cfg(test)]

use types::{AttestationData, Checkpoint, Epoch, Hash256, PublicKeyBytes, Slot};

/// A deterministic, distinct public key for validator `i`. Not a real BLS key — the store never
/// verifies a signature, only the epochs/slots attached to it.
pub fn pubkey(i: u64) -> PublicKeyBytes {
    let mut bytes = [0u8; 48];
    bytes[..8].copy_from_slice(&i.to_le_bytes());
    PublicKeyBytes::from(bytes)
}

/// Builds `AttestationData` with the given source/target epochs and an otherwise-arbitrary slot
/// and root, for tests that only care about the epoch pair.
pub fn attestation_data_builder(source_epoch: u64, target_epoch: u64) -> AttestationData {
    AttestationData {
        slot: Slot::new(target_epoch),
        index: 0,
        beacon_block_root: Hash256::zero(),
        source: Checkpoint::new(Epoch::new(source_epoch), Hash256::zero()),
        target: Checkpoint::new(Epoch::new(target_epoch), Hash256::zero()),
    }
}

use crate::consts::altair::NUM_FLAG_INDICES;
use crate::test_utils::TestRandom;
use rand::RngCore;
use safe_arith::ArithError;
use serde_derive::{Deserialize, Serialize};
use ssz::{Decode, DecodeError, Encode};
use tree_hash::TreeHash;

/// A single validator's per-epoch attestation participation, altair-onward: three timeliness
/// flags (source, target, head) packed into one byte rather than a `PendingAttestation` per
/// validator per epoch.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ParticipationFlags {
    bits: u8,
}

impl ParticipationFlags {
    pub fn has_flag(&self, flag_index: usize) -> Result<bool, ArithError> {
        if flag_index >= NUM_FLAG_INDICES {
            return Err(ArithError::Overflow);
        }
        Ok(self.bits & (1 << flag_index) != 0)
    }

    pub fn add_flag(&mut self, flag_index: usize) -> Result<(), ArithError> {
        if flag_index >= NUM_FLAG_INDICES {
            return Err(ArithError::Overflow);
        }
        self.bits |= 1 << flag_index;
        Ok(())
    }
}

impl From<u8> for ParticipationFlags {
    fn from(bits: u8) -> Self {
        Self { bits }
    }
}

impl From<ParticipationFlags> for u8 {
    fn from(flags: ParticipationFlags) -> Self {
        flags.bits
    }
}

impl Encode for ParticipationFlags {
    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        1
    }

    fn ssz_bytes_len(&self) -> usize {
        1
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        buf.push(self.bits);
    }
}

impl Decode for ParticipationFlags {
    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        1
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != 1 {
            return Err(DecodeError::InvalidByteLength {
                len: bytes.len(),
                expected: 1,
            });
        }
        Ok(Self { bits: bytes[0] })
    }
}

impl TreeHash for ParticipationFlags {
    fn tree_hash_type() -> tree_hash::TreeHashType {
        u8::tree_hash_type()
    }

    fn tree_hash_packed_encoding(&self) -> tree_hash::PackedEncoding {
        self.bits.tree_hash_packed_encoding()
    }

    fn tree_hash_packing_factor() -> usize {
        u8::tree_hash_packing_factor()
    }

    fn tree_hash_root(&self) -> tree_hash::Hash256 {
        self.bits.tree_hash_root()
    }
}

impl TestRandom for ParticipationFlags {
    fn random_for_test(rng: &mut impl RngCore) -> Self {
        Self {
            bits: u8::random_for_test(rng),
        }
    }
}

use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};
use ssz::{Decode, DecodeError, Encode};
use std::fmt;
use tree_hash::TreeHash;

pub const GRAFFITI_BYTES_LEN: usize = 32;

/// 32 free-form bytes a proposer may stamp into a block; purely cosmetic, never interpreted by
/// consensus logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Graffiti(pub [u8; GRAFFITI_BYTES_LEN]);

impl Graffiti {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut graffiti = [0; GRAFFITI_BYTES_LEN];
        let len = std::cmp::min(bytes.len(), GRAFFITI_BYTES_LEN);
        graffiti[..len].copy_from_slice(&bytes[..len]);
        Self(graffiti)
    }
}

impl fmt::Display for Graffiti {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0[..]))
    }
}

impl Serialize for Graffiti {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Graffiti {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(D::Error::custom)?;
        if bytes.len() != GRAFFITI_BYTES_LEN {
            return Err(D::Error::custom("graffiti must be 32 bytes"));
        }
        Ok(Graffiti::from_bytes(&bytes))
    }
}

impl Encode for Graffiti {
    fn is_ssz_fixed_len() -> bool {
        true
    }
    fn ssz_fixed_len() -> usize {
        GRAFFITI_BYTES_LEN
    }
    fn ssz_append(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.0);
    }
}

impl Decode for Graffiti {
    fn is_ssz_fixed_len() -> bool {
        true
    }
    fn ssz_fixed_len() -> usize {
        GRAFFITI_BYTES_LEN
    }
    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != GRAFFITI_BYTES_LEN {
            return Err(DecodeError::InvalidByteLength {
                len: bytes.len(),
                expected: GRAFFITI_BYTES_LEN,
            });
        }
        Ok(Graffiti::from_bytes(bytes))
    }
}

impl TreeHash for Graffiti {
    fn tree_hash_type() -> tree_hash::TreeHashType {
        tree_hash::TreeHashType::Vector
    }
    fn tree_hash_packed_encoding(&self) -> tree_hash::PackedEncoding {
        unreachable!("Graffiti is composite, not packed")
    }
    fn tree_hash_packing_factor() -> usize {
        unreachable!("Graffiti is composite, not packed")
    }
    fn tree_hash_root(&self) -> tree_hash::Hash256 {
        tree_hash::merkle_root(&self.0, 0)
    }
}

impl crate::test_utils::TestRandom for Graffiti {
    fn random_for_test(rng: &mut impl rand::RngCore) -> Self {
        let mut bytes = [0u8; GRAFFITI_BYTES_LEN];
        rng.fill_bytes(&mut bytes);
        Graffiti(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_input() {
        let g = Graffiti::from_bytes(&[1u8; 64]);
        assert_eq!(g.0.len(), GRAFFITI_BYTES_LEN);
    }
}

use crate::{Error, PublicKey};
use serde::{Deserialize, Serialize};
use ssz::{Decode, DecodeError, Encode};
use std::hash::{Hash, Hasher};
use tree_hash::TreeHash;

/// The compressed bytes of a BLS public key, kept around uninflated.
///
/// The validator registry stores millions of these; inflating each one to a `PublicKey` (which
/// validates the point is on-curve) up front would be wasted work for the vast majority that are
/// never used in a signature check during a given epoch.
#[derive(Clone, Copy)]
pub struct PublicKeyBytes([u8; 48]);

impl PublicKeyBytes {
    pub fn as_bytes(&self) -> &[u8; 48] {
        &self.0
    }

    pub fn decompress(&self) -> Result<PublicKey, Error> {
        PublicKey::deserialize(&self.0)
    }
}

impl From<&PublicKey> for PublicKeyBytes {
    fn from(pubkey: &PublicKey) -> Self {
        Self(pubkey.serialize())
    }
}

impl From<[u8; 48]> for PublicKeyBytes {
    fn from(bytes: [u8; 48]) -> Self {
        Self(bytes)
    }
}

impl Default for PublicKeyBytes {
    fn default() -> Self {
        Self([0u8; 48])
    }
}

impl PartialEq for PublicKeyBytes {
    fn eq(&self, other: &Self) -> bool {
        self.0[..] == other.0[..]
    }
}
impl Eq for PublicKeyBytes {}

impl Hash for PublicKeyBytes {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl std::fmt::Debug for PublicKeyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..]))
    }
}

impl Serialize for PublicKeyBytes {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(&self.0[..])))
    }
}

impl<'de> Deserialize<'de> for PublicKeyBytes {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        if bytes.len() != 48 {
            return Err(serde::de::Error::custom("invalid public key length"));
        }
        let mut out = [0u8; 48];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl Encode for PublicKeyBytes {
    fn is_ssz_fixed_len() -> bool {
        true
    }
    fn ssz_fixed_len() -> usize {
        48
    }
    fn ssz_append(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.0);
    }
}

impl Decode for PublicKeyBytes {
    fn is_ssz_fixed_len() -> bool {
        true
    }
    fn ssz_fixed_len() -> usize {
        48
    }
    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != 48 {
            return Err(DecodeError::InvalidByteLength {
                len: bytes.len(),
                expected: 48,
            });
        }
        let mut out = [0u8; 48];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }
}

impl TreeHash for PublicKeyBytes {
    fn tree_hash_type() -> tree_hash::TreeHashType {
        tree_hash::TreeHashType::Vector
    }
    fn tree_hash_packed_encoding(&self) -> tree_hash::PackedEncoding {
        unreachable!("PublicKeyBytes is composite, not packed")
    }
    fn tree_hash_packing_factor() -> usize {
        unreachable!("PublicKeyBytes is composite, not packed")
    }
    fn tree_hash_root(&self) -> tree_hash::Hash256 {
        tree_hash::merkle_root(&self.0, 0)
    }
}

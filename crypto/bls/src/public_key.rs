use crate::Error;
use blst::min_pk as blst_core;
use serde::{Deserialize, Serialize};
use ssz::{Decode, DecodeError, Encode};
use std::hash::{Hash, Hasher};
use tree_hash::TreeHash;

/// A compressed, validated BLS12-381 public key.
#[derive(Clone)]
pub struct PublicKey(blst_core::PublicKey);

impl PublicKey {
    pub(crate) fn from_raw(raw: blst_core::PublicKey) -> Self {
        Self(raw)
    }

    pub fn serialize(&self) -> [u8; 48] {
        self.0.compress()
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != 48 {
            return Err(Error::InvalidByteLength {
                got: bytes.len(),
                expected: 48,
            });
        }
        blst_core::PublicKey::from_bytes(bytes)
            .map(Self)
            .map_err(|_| Error::InvalidPublicKeyBytes)
    }

    pub(crate) fn raw(&self) -> &blst_core::PublicKey {
        &self.0
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.serialize() == other.serialize()
    }
}
impl Eq for PublicKey {}

impl Hash for PublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.serialize().hash(state)
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.serialize()))
    }
}

impl Serialize for PublicKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(self.serialize())))
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        PublicKey::deserialize(&bytes).map_err(|e| serde::de::Error::custom(format!("{:?}", e)))
    }
}

impl Encode for PublicKey {
    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        48
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.serialize());
    }
}

impl Decode for PublicKey {
    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        48
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        PublicKey::deserialize(bytes)
            .map_err(|_| DecodeError::BytesInvalid("invalid BLS public key".into()))
    }
}

impl TreeHash for PublicKey {
    fn tree_hash_type() -> tree_hash::TreeHashType {
        tree_hash::TreeHashType::Vector
    }

    fn tree_hash_packed_encoding(&self) -> tree_hash::PackedEncoding {
        unreachable!("PublicKey is composite, not packed")
    }

    fn tree_hash_packing_factor() -> usize {
        unreachable!("PublicKey is composite, not packed")
    }

    fn tree_hash_root(&self) -> tree_hash::Hash256 {
        tree_hash::merkle_root(&self.serialize(), 0)
    }
}

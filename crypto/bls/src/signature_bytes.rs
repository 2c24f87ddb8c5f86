use crate::{Error, Signature};
use serde::{Deserialize, Serialize};
use ssz::{Decode, DecodeError, Encode};
use tree_hash::TreeHash;

/// The compressed bytes of a BLS signature, kept uninflated until verification is actually
/// attempted (e.g. a `DepositData.signature` that's never checked against mainnet consensus).
#[derive(Clone, Copy)]
pub struct SignatureBytes([u8; 96]);

impl SignatureBytes {
    pub fn as_bytes(&self) -> &[u8; 96] {
        &self.0
    }

    pub fn empty() -> Self {
        Self([0u8; 96])
    }

    pub fn decompress(&self) -> Result<Signature, Error> {
        Signature::deserialize(&self.0)
    }
}

impl From<&Signature> for SignatureBytes {
    fn from(sig: &Signature) -> Self {
        let mut out = [0u8; 96];
        out.copy_from_slice(&sig.serialize());
        Self(out)
    }
}

impl Default for SignatureBytes {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for SignatureBytes {
    fn eq(&self, other: &Self) -> bool {
        self.0[..] == other.0[..]
    }
}

impl std::fmt::Debug for SignatureBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..]))
    }
}

impl Serialize for SignatureBytes {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(&self.0[..])))
    }
}

impl<'de> Deserialize<'de> for SignatureBytes {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        if bytes.len() != 96 {
            return Err(serde::de::Error::custom("invalid signature length"));
        }
        let mut out = [0u8; 96];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl Encode for SignatureBytes {
    fn is_ssz_fixed_len() -> bool {
        true
    }
    fn ssz_fixed_len() -> usize {
        96
    }
    fn ssz_append(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.0);
    }
}

impl Decode for SignatureBytes {
    fn is_ssz_fixed_len() -> bool {
        true
    }
    fn ssz_fixed_len() -> usize {
        96
    }
    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != 96 {
            return Err(DecodeError::InvalidByteLength {
                len: bytes.len(),
                expected: 96,
            });
        }
        let mut out = [0u8; 96];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }
}

impl TreeHash for SignatureBytes {
    fn tree_hash_type() -> tree_hash::TreeHashType {
        tree_hash::TreeHashType::Vector
    }
    fn tree_hash_packed_encoding(&self) -> tree_hash::PackedEncoding {
        unreachable!("SignatureBytes is composite, not packed")
    }
    fn tree_hash_packing_factor() -> usize {
        unreachable!("SignatureBytes is composite, not packed")
    }
    fn tree_hash_root(&self) -> tree_hash::Hash256 {
        tree_hash::merkle_root(&self.0, 0)
    }
}

use crate::{Error, PublicKey};
use blst::min_pk as blst_core;
use blst::BLST_ERROR;
use serde::{Deserialize, Serialize};
use ssz::{Decode, DecodeError, Encode};
use tree_hash::TreeHash;

const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// `None` represents the conventional "empty" signature used to seed an unsigned placeholder
/// (e.g. the genesis block's `randao_reveal`, never verified); BLS has no valid curve point for
/// the all-zero byte string, so this cannot be represented as a real `blst_core::Signature`.
#[derive(Clone)]
pub struct Signature(Option<blst_core::Signature>);

impl Signature {
    pub(crate) fn from_raw(raw: blst_core::Signature) -> Self {
        Self(Some(raw))
    }

    /// A placeholder signature with no cryptographic meaning; `verify` always returns `false`.
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn verify(&self, pubkey: &PublicKey, msg: &[u8]) -> bool {
        match &self.0 {
            Some(sig) => matches!(
                sig.verify(true, msg, DST, &[], pubkey.raw(), true),
                BLST_ERROR::BLST_SUCCESS
            ),
            None => false,
        }
    }

    pub fn serialize(&self) -> [u8; 96] {
        match &self.0 {
            Some(sig) => sig.compress(),
            None => [0u8; 96],
        }
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != 96 {
            return Err(Error::InvalidByteLength {
                got: bytes.len(),
                expected: 96,
            });
        }
        if bytes.iter().all(|b| *b == 0) {
            return Ok(Self::empty());
        }
        blst_core::Signature::from_bytes(bytes)
            .map(|sig| Self(Some(sig)))
            .map_err(|_| Error::InvalidSignatureBytes)
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.serialize()[..] == other.serialize()[..]
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(&self.serialize()[..]))
    }
}

impl Serialize for Signature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(&self.serialize()[..])))
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        Signature::deserialize(&bytes).map_err(|e| serde::de::Error::custom(format!("{:?}", e)))
    }
}

impl Encode for Signature {
    fn is_ssz_fixed_len() -> bool {
        true
    }
    fn ssz_fixed_len() -> usize {
        96
    }
    fn ssz_append(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.serialize());
    }
}

impl Decode for Signature {
    fn is_ssz_fixed_len() -> bool {
        true
    }
    fn ssz_fixed_len() -> usize {
        96
    }
    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        Signature::deserialize(bytes)
            .map_err(|_| DecodeError::BytesInvalid("invalid BLS signature".into()))
    }
}

impl TreeHash for Signature {
    fn tree_hash_type() -> tree_hash::TreeHashType {
        tree_hash::TreeHashType::Vector
    }
    fn tree_hash_packed_encoding(&self) -> tree_hash::PackedEncoding {
        unreachable!("Signature is composite, not packed")
    }
    fn tree_hash_packing_factor() -> usize {
        unreachable!("Signature is composite, not packed")
    }
    fn tree_hash_root(&self) -> tree_hash::Hash256 {
        tree_hash::merkle_root(&self.serialize(), 0)
    }
}

/// Combines many individual signatures, each over a distinct message, into one.
///
/// Used for `SyncAggregate`/attestation aggregation where every signer attests to the same
/// message, and separately for the single combined block signature.
#[derive(Clone, Default)]
pub struct AggregateSignature(Option<blst_core::AggregateSignature>);

impl AggregateSignature {
    /// The identity element: aggregating zero signatures.
    pub fn infinity() -> Self {
        Self(None)
    }

    pub fn add_assign(&mut self, other: &Signature) {
        let other_raw = match &other.0 {
            Some(raw) => raw,
            None => return,
        };
        match &mut self.0 {
            Some(agg) => agg
                .add_signature(other_raw, true)
                .expect("aggregating a validated signature cannot fail"),
            None => self.0 = Some(blst_core::AggregateSignature::from_signature(other_raw)),
        }
    }

    /// Merges another aggregate's signers into `self`, used when combining two attestation
    /// aggregates that cover disjoint committee bit-sets into one wider aggregate.
    pub fn add_assign_aggregate(&mut self, other: &AggregateSignature) {
        let other_sig = match other.to_signature() {
            Some(sig) => sig,
            None => return,
        };
        self.add_assign(&other_sig);
    }

    pub fn to_signature(&self) -> Option<Signature> {
        self.0.as_ref().map(|agg| Signature(agg.to_signature()))
    }

    pub fn fast_aggregate_verify(&self, msg: &[u8], pubkeys: &[&PublicKey]) -> bool {
        if pubkeys.is_empty() {
            return false;
        }
        let raw_pubkeys: Vec<&blst_core::PublicKey> = pubkeys.iter().map(|pk| pk.raw()).collect();
        match self.to_signature() {
            Some(sig) => matches!(
                sig.0.fast_aggregate_verify(true, msg, DST, &raw_pubkeys),
                BLST_ERROR::BLST_SUCCESS
            ),
            None => false,
        }
    }
}

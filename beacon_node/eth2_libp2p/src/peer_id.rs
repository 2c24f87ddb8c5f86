//! A transport-agnostic stand-in for a libp2p `PeerId`: a multihash digest of a peer's public
//! key. The real transport (noise handshake, multihash encoding) lives on the other side of the
//! `Service` trait boundary; everything here only needs a peer identity to be hashable, orderable
//! and printable.

use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Byte length of the digest we key peers by (sha256 of their public key, truncated the way
/// libp2p's identity multihash does for ed25519/secp256k1 keys).
const PEER_ID_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(#[serde(with = "serde_bytes_fixed")] [u8; PEER_ID_BYTES]);

impl PeerId {
    pub fn from_bytes(bytes: [u8; PEER_ID_BYTES]) -> Self {
        PeerId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PEER_ID_BYTES] {
        &self.0
    }

    /// A peer id with no cryptographic meaning, for tests and default-construction.
    pub fn dummy(seed: u8) -> Self {
        PeerId([seed; PEER_ID_BYTES])
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "16U{}", hex::encode(&self.0[..4]))
    }
}

/// A `PeerId` as it appears in configuration files and CLI args (hex-encoded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerIdSerialized(#[serde(with = "serde_hex_string")] PeerId);

impl From<PeerIdSerialized> for PeerId {
    fn from(wrapped: PeerIdSerialized) -> Self {
        wrapped.0
    }
}

mod serde_bytes_fixed {
    use super::PEER_ID_BYTES;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; PEER_ID_BYTES], s: S) -> Result<S::Ok, S::Error> {
        hex::encode(bytes).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; PEER_ID_BYTES], D::Error> {
        let s = String::deserialize(d)?;
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        if bytes.len() != PEER_ID_BYTES {
            return Err(serde::de::Error::custom("wrong peer id length"));
        }
        let mut out = [0u8; PEER_ID_BYTES];
        out.copy_from_slice(&bytes);
        Ok(out)
    }
}

mod serde_hex_string {
    use super::PeerId;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &PeerId, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&id.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<PeerId, D::Error> {
        let s = String::deserialize(d)?;
        let bytes = hex::decode(s.trim_start_matches("16U")).map_err(serde::de::Error::custom)?;
        if bytes.len() != super::PEER_ID_BYTES {
            return Err(serde::de::Error::custom("wrong peer id length"));
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(PeerId(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_ids_are_distinct() {
        assert_ne!(PeerId::dummy(1), PeerId::dummy(2));
    }

    #[test]
    fn display_is_stable() {
        let id = PeerId::dummy(9);
        assert_eq!(id.to_string(), id.to_string());
    }
}

//! Gossip topic naming and the post-altair message-id scheme of spec.md §4.9: topics are
//! `/eth2/<fork_digest>/<topic>/ssz_snappy` and a message's id is the first 20 bytes of
//! `SHA256(domain_tag || topic_len-as-u64-le || topic || decoded_bytes)`.

use serde_derive::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use types::{ChainSpec, Hash256};

/// Domain tag prepended before hashing a valid (successfully decompressed) gossip message. The
/// "invalid snappy" domain from the spec is never used here since malformed messages are dropped
/// before message-id computation, not assigned an id.
const MESSAGE_DOMAIN_VALID_SNAPPY: [u8; 4] = [1, 0, 0, 0];

/// A subnet index for attestation-subnet gossip topics (`beacon_attestation_<id>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubnetId(u64);

impl SubnetId {
    pub fn new(id: u64) -> Self {
        SubnetId(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubnetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The named gossip topics this node subscribes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GossipKind {
    BeaconBlock,
    BeaconAggregateAndProof,
    Attestation(SubnetId),
    VoluntaryExit,
    ProposerSlashing,
    AttesterSlashing,
}

impl fmt::Display for GossipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GossipKind::Attestation(subnet_id) => {
                write!(f, "beacon_attestation_{}", subnet_id.id())
            }
            GossipKind::BeaconBlock => write!(f, "beacon_block"),
            GossipKind::BeaconAggregateAndProof => write!(f, "beacon_aggregate_and_proof"),
            GossipKind::VoluntaryExit => write!(f, "voluntary_exit"),
            GossipKind::ProposerSlashing => write!(f, "proposer_slashing"),
            GossipKind::AttesterSlashing => write!(f, "attester_slashing"),
        }
    }
}

impl FromStr for GossipKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beacon_block" => Ok(GossipKind::BeaconBlock),
            "beacon_aggregate_and_proof" => Ok(GossipKind::BeaconAggregateAndProof),
            "voluntary_exit" => Ok(GossipKind::VoluntaryExit),
            "proposer_slashing" => Ok(GossipKind::ProposerSlashing),
            "attester_slashing" => Ok(GossipKind::AttesterSlashing),
            _ => Err(()),
        }
    }
}

/// A fully-qualified gossip topic: `/eth2/<fork_digest>/<kind>/ssz_snappy`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GossipTopic {
    pub fork_digest: [u8; 4],
    pub kind: GossipKind,
}

const TOPIC_PREFIX: &str = "eth2";
const TOPIC_ENCODING_POSTFIX: &str = "ssz_snappy";

impl GossipTopic {
    pub fn new(kind: GossipKind, fork_digest: [u8; 4]) -> Self {
        GossipTopic { fork_digest, kind }
    }

    pub fn encode(&self) -> String {
        format!(
            "/{}/{}/{}/{}",
            TOPIC_PREFIX,
            hex::encode(self.fork_digest),
            self.kind,
            TOPIC_ENCODING_POSTFIX
        )
    }
}

impl fmt::Display for GossipTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl FromStr for GossipTopic {
    type Err = String;

    fn from_str(topic: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = topic.trim_start_matches('/').split('/').collect();
        if parts.len() != 4 || parts[0] != TOPIC_PREFIX || parts[3] != TOPIC_ENCODING_POSTFIX {
            return Err(format!("invalid gossip topic: {}", topic));
        }

        let mut fork_digest = [0u8; 4];
        let decoded = hex::decode(parts[1]).map_err(|e| e.to_string())?;
        if decoded.len() != 4 {
            return Err("fork digest must be 4 bytes".to_string());
        }
        fork_digest.copy_from_slice(&decoded);

        let kind = if let Some(id) = parts[2].strip_prefix("beacon_attestation_") {
            GossipKind::Attestation(SubnetId::new(
                id.parse().map_err(|_| "invalid subnet id".to_string())?,
            ))
        } else {
            GossipKind::from_str(parts[2]).map_err(|_| format!("unknown gossip kind: {}", parts[2]))?
        };

        Ok(GossipTopic { fork_digest, kind })
    }
}

/// `SHA256(current_fork_version || genesis_validators_root)[0..4]`, per the Ethereum consensus
/// networking spec. Computed once at startup and cached by callers since both inputs are fixed
/// after genesis.
pub fn compute_fork_digest(current_fork_version: [u8; 4], genesis_validators_root: Hash256) -> [u8; 4] {
    let mut hasher = Sha256::new();
    hasher.update(&current_fork_version);
    hasher.update(genesis_validators_root.as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

pub fn fork_digest_for_spec(spec: &ChainSpec, genesis_validators_root: Hash256) -> [u8; 4] {
    compute_fork_digest(spec.genesis_fork_version, genesis_validators_root)
}

/// The post-altair message-id scheme of spec.md §4.9: first 20 bytes of
/// `SHA256(domain_tag || topic_len_le_u64 || topic || decoded_bytes)`.
pub fn gossip_message_id(topic: &str, decoded_data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(&MESSAGE_DOMAIN_VALID_SNAPPY);
    hasher.update(&(topic.len() as u64).to_le_bytes());
    hasher.update(topic.as_bytes());
    hasher.update(decoded_data);
    hasher.finalize()[..20].to_vec()
}

/// The legacy (pre-altair) scheme: first 20 bytes of `SHA256(decoded_bytes)`, with no domain tag
/// or topic mixed in. Kept so historical/non-altair forks can still be validated.
pub fn gossip_message_id_legacy(decoded_data: &[u8]) -> Vec<u8> {
    Sha256::digest(decoded_data)[..20].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_round_trips() {
        let topic = GossipTopic::new(GossipKind::BeaconBlock, [1, 2, 3, 4]);
        let encoded = topic.encode();
        assert_eq!(encoded, "/eth2/01020304/beacon_block/ssz_snappy");
        assert_eq!(GossipTopic::from_str(&encoded).unwrap(), topic);
    }

    #[test]
    fn attestation_subnet_topic_round_trips() {
        let topic = GossipTopic::new(GossipKind::Attestation(SubnetId::new(7)), [0; 4]);
        let encoded = topic.encode();
        assert_eq!(GossipTopic::from_str(&encoded).unwrap(), topic);
    }

    #[test]
    fn message_id_is_20_bytes() {
        let id = gossip_message_id("/eth2/00000000/beacon_block/ssz_snappy", b"hello");
        assert_eq!(id.len(), 20);
    }
}

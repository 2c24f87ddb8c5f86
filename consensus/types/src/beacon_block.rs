use crate::beacon_block_body::{BeaconBlockBodyAltair, BeaconBlockBodyBase, BeaconBlockBodyBellatrix};
use crate::test_utils::TestRandom;
use test_random_derive::TestRandom;
use crate::{
    BeaconBlockHeader, ChainSpec, Domain, Eth1Data, EthSpec, Fork, Graffiti,
    GenesisValidatorsRoot, Hash256, Slot, SignedRoot,
};
use bls::{SecretKey, Signature};
use serde_derive::{Deserialize, Serialize};
use ssz::{Decode as _, Encode as _};
use ssz_derive::{Decode, Encode};
use ssz_types::VariableList;
use superstruct::superstruct;
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

/// A block of the beacon chain, tagged by fork (§3: "the design treats them as a tagged variant
/// discriminated by fork").
#[superstruct(
    variants(Base, Altair, Bellatrix),
    variant_attributes(derive(
        Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash, TestRandom
    )),
    map_ref_into(BeaconBlockHeader)
)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TreeHash, TestRandom)]
#[serde(bound = "T: EthSpec")]
#[tree_hash(enum_behaviour = "transparent")]
pub struct BeaconBlock<T: EthSpec> {
    #[superstruct(getter(copy))]
    pub slot: Slot,
    #[superstruct(getter(copy))]
    pub proposer_index: u64,
    #[superstruct(getter(copy))]
    pub parent_root: Hash256,
    #[superstruct(getter(copy))]
    pub state_root: Hash256,
    #[superstruct(only(Base))]
    pub body: BeaconBlockBodyBase<T>,
    #[superstruct(only(Altair))]
    pub body: BeaconBlockBodyAltair<T>,
    #[superstruct(only(Bellatrix))]
    pub body: BeaconBlockBodyBellatrix<T>,
}

impl<T: EthSpec> SignedRoot for BeaconBlock<T> {}

impl<T: EthSpec> BeaconBlock<T> {
    /// An empty base-fork block, used to seed genesis.
    pub fn empty(spec: &ChainSpec) -> Self {
        Self::Base(BeaconBlockBase {
            slot: spec.genesis_slot,
            proposer_index: 0,
            parent_root: Hash256::zero(),
            state_root: Hash256::zero(),
            body: BeaconBlockBodyBase {
                randao_reveal: Signature::empty(),
                eth1_data: Eth1Data::default(),
                graffiti: Graffiti::default(),
                proposer_slashings: VariableList::empty(),
                attester_slashings: VariableList::empty(),
                attestations: VariableList::empty(),
                deposits: VariableList::empty(),
                voluntary_exits: VariableList::empty(),
            },
        })
    }

    pub fn epoch(&self) -> crate::Epoch {
        self.slot().epoch(T::slots_per_epoch())
    }

    pub fn canonical_root(&self) -> Hash256 {
        self.tree_hash_root()
    }

    pub fn body_root(&self) -> Hash256 {
        match self {
            BeaconBlock::Base(block) => block.body.tree_hash_root(),
            BeaconBlock::Altair(block) => block.body.tree_hash_root(),
            BeaconBlock::Bellatrix(block) => block.body.tree_hash_root(),
        }
    }

    pub fn block_header(&self) -> BeaconBlockHeader {
        BeaconBlockHeader {
            slot: self.slot(),
            proposer_index: self.proposer_index(),
            parent_root: self.parent_root(),
            state_root: self.state_root(),
            body_root: self.body_root(),
        }
    }

    pub fn temporary_block_header(&self) -> BeaconBlockHeader {
        BeaconBlockHeader {
            state_root: Hash256::zero(),
            ..self.block_header()
        }
    }

    pub fn sign(
        self,
        secret_key: &SecretKey,
        fork: &Fork,
        genesis_validators_root: GenesisValidatorsRoot,
        spec: &ChainSpec,
    ) -> SignedBeaconBlock<T> {
        let domain = spec.get_domain(
            self.epoch(),
            Domain::BeaconProposer,
            fork,
            genesis_validators_root,
        );
        let message = self.signing_root(domain);
        let signature = secret_key.sign(message.as_bytes());
        SignedBeaconBlock {
            message: self,
            signature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TreeHash, TestRandom)]
#[serde(bound = "T: EthSpec")]
pub struct SignedBeaconBlock<T: EthSpec> {
    pub message: BeaconBlock<T>,
    pub signature: Signature,
}

impl<T: EthSpec> SignedBeaconBlock<T> {
    pub fn canonical_root(&self) -> Hash256 {
        self.message.canonical_root()
    }
}

/// The on-the-wire/on-disk encoding of a forked block is a one-byte fork tag followed by the
/// SSZ encoding of that fork's concrete variant (the same convention the store crate uses for
/// `BeaconState`). The fork isn't self-describing at the SSZ level in the protocol itself, but
/// tagging it this way keeps a `SignedBeaconBlock<T>` usable as an opaque, self-contained blob
/// wherever one is persisted (blocks table, gossip caches, tests).
impl<T: EthSpec> ssz::Encode for SignedBeaconBlock<T> {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        let tag: u8 = match &self.message {
            BeaconBlock::Base(_) => 0,
            BeaconBlock::Altair(_) => 1,
            BeaconBlock::Bellatrix(_) => 2,
        };
        buf.push(tag);
        match &self.message {
            BeaconBlock::Base(inner) => buf.extend_from_slice(&inner.as_ssz_bytes()),
            BeaconBlock::Altair(inner) => buf.extend_from_slice(&inner.as_ssz_bytes()),
            BeaconBlock::Bellatrix(inner) => buf.extend_from_slice(&inner.as_ssz_bytes()),
        }
        buf.extend_from_slice(&self.signature.as_ssz_bytes());
    }
}

impl<T: EthSpec> ssz::Decode for SignedBeaconBlock<T> {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, ssz::DecodeError> {
        let (tag, rest) = bytes.split_first().ok_or(ssz::DecodeError::InvalidByteLength {
            len: bytes.len(),
            expected: 1,
        })?;
        // The signature is the final, fixed-length 96 bytes; everything before it is the block.
        let sig_len = <Signature as ssz::Decode>::ssz_fixed_len();
        if rest.len() < sig_len {
            return Err(ssz::DecodeError::InvalidByteLength {
                len: rest.len(),
                expected: sig_len,
            });
        }
        let (block_bytes, sig_bytes) = rest.split_at(rest.len() - sig_len);
        let message = match tag {
            0 => BeaconBlock::Base(ssz::Decode::from_ssz_bytes(block_bytes)?),
            1 => BeaconBlock::Altair(ssz::Decode::from_ssz_bytes(block_bytes)?),
            2 => BeaconBlock::Bellatrix(ssz::Decode::from_ssz_bytes(block_bytes)?),
            _ => return Err(ssz::DecodeError::BytesInvalid(format!("unknown fork tag {}", tag))),
        };
        let signature = Signature::from_ssz_bytes(sig_bytes)?;
        Ok(SignedBeaconBlock { message, signature })
    }
}

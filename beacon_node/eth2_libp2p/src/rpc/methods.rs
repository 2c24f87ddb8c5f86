//! The concrete request/response payloads carried inside the framing of [`super::codec`].
//! Kept deliberately small: this workspace's sync manager only ever needs `Status`, `Ping`,
//! `MetaData` and block-range/by-root requests (spec.md §4.10/§4.9).

use ssz_derive::{Decode, Encode};
use ssz_types::VariableList;
use types::{EthSpec, Hash256, SignedBeaconBlock, Slot};

use super::protocol::Protocol;

/// Handshake exchanged once per connection and periodically thereafter to detect forked/stale
/// peers.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct StatusMessage {
    pub fork_digest: [u8; 4],
    pub finalized_root: Hash256,
    pub finalized_epoch: types::Epoch,
    pub head_root: Hash256,
    pub head_slot: Slot,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Encode, Decode)]
pub struct Ping {
    pub data: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MetaData {
    pub seq_number: u64,
    /// One bit per attestation subnet this peer is persistently subscribed to.
    pub attnets: VariableList<u8, typenum::U64>,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct BlocksByRangeRequest {
    pub start_slot: u64,
    pub count: u64,
    pub step: u64,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct BlocksByRootRequest {
    pub block_roots: VariableList<Hash256, typenum::U1024>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RPCRequest {
    Status(StatusMessage),
    Goodbye(u64),
    Ping(Ping),
    MetaData,
    BlocksByRange(BlocksByRangeRequest),
    BlocksByRoot(BlocksByRootRequest),
}

impl RPCRequest {
    pub fn protocol(&self) -> Protocol {
        match self {
            RPCRequest::Status(_) => Protocol::Status,
            RPCRequest::Goodbye(_) => Protocol::Goodbye,
            RPCRequest::Ping(_) => Protocol::Ping,
            RPCRequest::MetaData => Protocol::MetaData,
            RPCRequest::BlocksByRange(_) => Protocol::BlocksByRange,
            RPCRequest::BlocksByRoot(_) => Protocol::BlocksByRoot,
        }
    }

    /// `true` for requests like `BlocksByRange` whose response is a stream of zero-or-more
    /// chunks rather than exactly one.
    pub fn expect_multiple_responses(&self) -> bool {
        self.protocol().is_multiple_responses()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RPCResponse<E: EthSpec> {
    Status(StatusMessage),
    Pong(Ping),
    MetaData(MetaData),
    BlocksByRange(Box<SignedBeaconBlock<E>>),
    BlocksByRoot(Box<SignedBeaconBlock<E>>),
}

impl<E: EthSpec> RPCResponse<E> {
    pub fn protocol(&self) -> Protocol {
        match self {
            RPCResponse::Status(_) => Protocol::Status,
            RPCResponse::Pong(_) => Protocol::Ping,
            RPCResponse::MetaData(_) => Protocol::MetaData,
            RPCResponse::BlocksByRange(_) => Protocol::BlocksByRange,
            RPCResponse::BlocksByRoot(_) => Protocol::BlocksByRoot,
        }
    }
}

/// A single item read off a response stream: either a successful chunk, a final stream
/// terminator, or an application-level error response carrying a [`super::codec::ResponseCode`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseTermination {
    BlocksByRange,
    BlocksByRoot,
}

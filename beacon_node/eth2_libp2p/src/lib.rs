//! Protocol logic for the beacon node's peer-to-peer layer: peer identity, gossip topic naming
//! and message-id derivation, request/response wire framing, and the configuration those pieces
//! need. The actual libp2p transport (dialing, noise, yamux, gossipsub mesh, discv5) is not
//! implemented here; see [`service::Eth2LibP2pService`] for the boundary a real transport
//! implementation plugs into.

#[macro_use]
extern crate lazy_static;

pub mod config;
pub mod metrics;
mod peer_id;
pub mod rpc;
pub mod service;
pub mod types;

pub use config::Config;
pub use peer_id::{PeerId, PeerIdSerialized};

/// A peer's signed address/metadata record, keyed the way `discv5`/real libp2p discovery would
/// key it. Persisted verbatim by [`persisted_dht`]-style storage; this crate never constructs or
/// verifies one itself — that's discovery's job, on the far side of [`service::Eth2LibP2pService`].
pub type Enr = enr::Enr<enr::CombinedKey>;
pub use rpc::methods::{
    BlocksByRangeRequest, BlocksByRootRequest, MetaData, Ping, RPCRequest, RPCResponse,
    StatusMessage,
};
pub use rpc::{RPCError, ResponseCode};
pub use service::{Eth2LibP2pService, NetworkEvent};
pub use types::{compute_fork_digest, fork_digest_for_spec, GossipKind, GossipTopic, SubnetId};

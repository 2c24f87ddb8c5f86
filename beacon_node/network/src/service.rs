//! Messages the rest of the node (gossip processor, sync manager, RPC handlers) sends back
//! towards the transport, and the service that drains them into a concrete
//! `Eth2LibP2pService` implementation.

use crate::peer_manager::DisconnectReason;
use eth2_libp2p::config::ValidationResult;
use eth2_libp2p::{GossipKind, PeerId, RPCRequest, RPCResponse};
use types::EthSpec;

/// Something the protocol-logic layer wants the transport to do.
#[derive(Debug)]
pub enum NetworkMessage<E: EthSpec> {
    /// Report a gossipsub validation verdict for a message this node is holding pending
    /// propagation (spec.md §4.9).
    Validate {
        propagation_source: PeerId,
        message_id: Vec<u8>,
        result: ValidationResult,
    },
    Publish {
        topic: GossipKind,
        message: Vec<u8>,
    },
    SendRequest {
        peer_id: PeerId,
        request: RPCRequest,
    },
    SendResponse {
        peer_id: PeerId,
        response: RPCResponse<E>,
    },
    /// Apply a score delta to a peer; disconnects and blacklists it if this crosses the floor.
    ReportPeer {
        peer_id: PeerId,
        score_delta: f64,
    },
    Disconnect {
        peer_id: PeerId,
        reason: DisconnectReason,
    },
}

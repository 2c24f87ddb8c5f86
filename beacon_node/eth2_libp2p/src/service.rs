//! The trait boundary between this crate's protocol logic (peer scoring inputs, wire framing,
//! gossip validation verdicts — spec.md §4.8/§4.9) and an actual libp2p transport (TCP/QUIC
//! dialing, noise handshakes, yamux/mplex stream multiplexing, discv5 discovery, gossipsub mesh
//! maintenance). Production deployments plug in a real implementation of this trait; this
//! workspace provides no implementation of its own, matching the scoping in SPEC_FULL.md §A.

use crate::rpc::{Protocol, RPCError, RPCRequest, RPCResponse};
use crate::types::GossipKind;
use crate::{Enr, PeerId};
use types::EthSpec;

/// Something the network service emits: a transport-level event the rest of the node (router,
/// sync manager, peer manager) reacts to.
#[derive(Debug)]
pub enum NetworkEvent<E: EthSpec> {
    PeerConnected { peer_id: PeerId, num_established: usize },
    PeerDisconnected { peer_id: PeerId },
    RequestReceived { peer_id: PeerId, request: RPCRequest },
    ResponseReceived { peer_id: PeerId, response: RPCResponse<E> },
    RPCFailed { peer_id: PeerId, protocol: Protocol, error: RPCError },
    GossipMessage { source: PeerId, topic: String, message_id: Vec<u8>, decoded_data: Vec<u8> },
}

/// Everything the protocol-logic layer (peer manager, router, sync manager) needs a transport
/// implementation to provide. A production implementation owns an actual `libp2p::Swarm` wired
/// with noise/yamux/gossipsub/discv5; tests and local development can use an in-memory stub.
pub trait Eth2LibP2pService<E: EthSpec> {
    /// Poll for the next transport-level event. Analogous to `Stream::poll_next` on a libp2p
    /// `Swarm`; the event loop (`beacon_node/client`) drives this.
    fn poll_event(&mut self) -> Option<NetworkEvent<E>>;

    fn send_request(&mut self, peer_id: PeerId, request: RPCRequest);
    fn send_response(&mut self, peer_id: PeerId, protocol: Protocol, response: RPCResponse<E>);

    fn publish(&mut self, topic: GossipKind, ssz_snappy_payload: Vec<u8>);
    fn subscribe(&mut self, topic: GossipKind);

    /// Tells the transport to apply a gossipsub-level validation verdict to a message it is
    /// holding pending propagation (spec.md §4.9: `Accept` propagates, `Ignore` drops silently,
    /// `Reject` drops and penalizes the source).
    fn report_message_validation_result(
        &mut self,
        source: &PeerId,
        message_id: Vec<u8>,
        result: crate::config::ValidationResult,
    );

    /// Disconnects a peer with an on-wire reason code (spec.md §6: 1=shutdown, 2=irrelevant
    /// network, 3=fault, 237=low score).
    fn disconnect_peer(&mut self, peer_id: PeerId, reason_code: u8);

    fn local_enr(&self) -> Enr;
    fn local_peer_id(&self) -> PeerId;
}

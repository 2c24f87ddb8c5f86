//! Dispatches incoming [`eth2_libp2p::NetworkEvent`]s to the gossip processor (attestations) or
//! the sync manager (RPC requests/responses), the way the teacher's router module fans work out
//! to dedicated subsystems rather than handling everything inline in the main event loop.

pub mod gossip_processor;

pub use gossip_processor::{Event as GossipWork, GossipProcessor};

//! Protocol-level networking (spec.md §4.8–§4.10): the peer pool, gossip verification pipeline
//! and range-sync manager that sit between `eth2_libp2p`'s wire framing and the `BeaconChain`
//! facade. Scoped per SPEC_FULL.md §A — the actual libp2p transport is not implemented here; see
//! `eth2_libp2p::service::Eth2LibP2pService`.

#[macro_use]
extern crate lazy_static;

pub mod metrics;
pub mod peer_manager;
pub mod persisted_dht;
pub mod router;
pub mod service;
pub mod sync;

pub use peer_manager::{ConnectionDirection, ConnectionState, DisconnectReason, PeerManager};
pub use persisted_dht::PersistedDht;
pub use service::NetworkMessage;
pub use sync::{SyncManager, SyncMessage};

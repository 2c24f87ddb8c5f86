//! The peer pool (spec.md §4.8): tracks every peer's connection/score state, enforces
//! `target_peers`/`hard_max_peers` via a trimmer that prefers keeping subnet coverage, and
//! refreshes peer metadata on a fixed cadence, disconnecting peers that stop answering.

mod peer_info;
mod peerdb;
mod score;

pub use peer_info::{ConnectionDirection, ConnectionState, PeerInfo};
pub use peerdb::PeerDb;
pub use score::{DisconnectReason, Score, MAX_SCORE, MIN_SCORE};

use crate::metrics;
use eth2_libp2p::PeerId;
use futures::StreamExt;
use slog::{debug, warn, Logger};
use std::time::Duration;

/// Consecutive metadata-refresh failures tolerated before a peer is disconnected (spec.md §5).
const MAX_METADATA_FAILURES: u32 = 3;

/// Actions the event loop (`NetworkService`) should take in response to a peer manager tick or
/// score update — kept as plain data so the manager stays free of any transport dependency.
#[derive(Debug, Clone)]
pub enum PeerManagerEvent {
    DisconnectPeer(PeerId, DisconnectReason),
    PingMetadata(PeerId),
}

pub struct PeerManager {
    db: PeerDb,
    target_peers: usize,
    hard_max_peers: usize,
    metadata_refresh_interval: Duration,
    log: Logger,
}

impl PeerManager {
    pub fn new(target_peers: usize, hard_max_peers: usize, metadata_refresh_interval: Duration, log: Logger) -> Self {
        PeerManager {
            db: PeerDb::new(),
            target_peers,
            hard_max_peers,
            metadata_refresh_interval,
            log,
        }
    }

    pub fn db(&self) -> &PeerDb {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut PeerDb {
        &mut self.db
    }

    pub fn on_connect(&mut self, peer_id: PeerId, direction: ConnectionDirection) -> bool {
        let accepted = self.db.on_connect(peer_id, direction);
        metrics::set_gauge(&metrics::PEER_CONNECTED_PEERS, self.db.connected_peer_count() as i64);
        accepted
    }

    pub fn on_disconnect(&mut self, peer_id: &PeerId, reason: DisconnectReason) {
        self.db.on_disconnect(peer_id, reason);
        metrics::inc_counter(&metrics::PEER_DISCONNECTIONS_TOTAL);
        metrics::set_gauge(&metrics::PEER_CONNECTED_PEERS, self.db.connected_peer_count() as i64);
    }

    /// Applies a score delta and returns `Some(reason)` if the peer should now be disconnected.
    pub fn report_score(&mut self, peer_id: &PeerId, delta: f64) -> Option<DisconnectReason> {
        metrics::inc_counter(&metrics::PEER_SCORE_UPDATES_TOTAL);
        let reason = self.db.apply_score_delta(peer_id, delta);
        if reason.is_some() {
            metrics::inc_counter(&metrics::PEER_BANS_TOTAL);
            debug!(self.log, "Peer score crossed ban floor"; "peer_id" => peer_id.to_string());
        }
        reason
    }

    /// If over `hard_max_peers`, returns the peers to disconnect to get back down to
    /// `target_peers`, preferring to keep peers covering under-subscribed subnets.
    pub fn trim_excess_peers(&self, subscribed_subnets: &[u64]) -> Vec<PeerId> {
        let connected = self.db.connected_peer_count();
        if connected <= self.hard_max_peers {
            return Vec::new();
        }
        let excess = connected - self.target_peers;
        self.db
            .trim_candidates(subscribed_subnets)
            .into_iter()
            .take(excess)
            .collect()
    }

    /// Called when a metadata refresh request to `peer_id` times out or errors. Returns `Some`
    /// once the peer has failed enough times in a row to warrant disconnection.
    pub fn on_metadata_failure(&mut self, peer_id: &PeerId) -> Option<DisconnectReason> {
        let failures = self.db.record_metadata_failure(peer_id);
        if failures >= MAX_METADATA_FAILURES {
            warn!(
                self.log,
                "Peer unresponsive to metadata requests, disconnecting";
                "peer_id" => peer_id.to_string(),
                "failures" => failures,
            );
            Some(DisconnectReason::Fault)
        } else {
            None
        }
    }

    pub fn update_subnets(&mut self, peer_id: &PeerId, subnets: Vec<u64>) {
        self.db.update_subnets(peer_id, subnets);
    }

    pub fn metadata_refresh_interval(&self) -> Duration {
        self.metadata_refresh_interval
    }

    /// Polls the blacklist for peers whose ban has expired. Doesn't return anything actionable —
    /// an expired entry just stops being blacklisted; this exists so the event loop can drive the
    /// underlying `DelayQueue` forward.
    pub async fn poll_expired_bans(&mut self) {
        while self.db.blacklist_mut().next().await.is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slog::{o, Discard};

    fn test_logger() -> Logger {
        Logger::root(Discard, o!())
    }

    #[test]
    fn trims_down_to_target_when_over_hard_max() {
        let mut manager = PeerManager::new(2, 3, Duration::from_secs(1800), test_logger());
        for seed in 0..4u8 {
            manager.on_connect(PeerId::dummy(seed), ConnectionDirection::Outbound);
        }
        let to_drop = manager.trim_excess_peers(&[]);
        assert_eq!(to_drop.len(), 2);
    }

    #[test]
    fn metadata_failures_accumulate_to_disconnect() {
        let mut manager = PeerManager::new(5, 7, Duration::from_secs(1800), test_logger());
        let peer = PeerId::dummy(1);
        manager.on_connect(peer.clone(), ConnectionDirection::Inbound);
        assert!(manager.on_metadata_failure(&peer).is_none());
        assert!(manager.on_metadata_failure(&peer).is_none());
        assert!(manager.on_metadata_failure(&peer).is_some());
    }
}

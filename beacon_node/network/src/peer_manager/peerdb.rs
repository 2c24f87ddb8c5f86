//! The peer pool itself (spec.md §4.8): a table of [`PeerInfo`] keyed by [`PeerId`], plus the
//! blacklist ("seen table") of recently-disconnected peers a connection attempt should skip.

use super::peer_info::{ConnectionDirection, ConnectionState, PeerInfo};
use super::score::{DisconnectReason, Score};
use eth2_libp2p::PeerId;
use hashset_delay::HashSetDelay;
use std::collections::HashMap;

/// Default per-peer request budget, replenished by the peer manager's fixed-tick refill.
const DEFAULT_REQUEST_QUOTA: f64 = 10.0;

pub struct PeerDb {
    peers: HashMap<PeerId, PeerInfo>,
    /// Disconnected-and-blacklisted peers, each expiring (and becoming dialable again) after its
    /// disconnect reason's timeout.
    blacklist: HashSetDelay<PeerId>,
}

impl Default for PeerDb {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerDb {
    pub fn new() -> Self {
        PeerDb {
            peers: HashMap::new(),
            blacklist: HashSetDelay::new(),
        }
    }

    pub fn is_blacklisted(&self, peer_id: &PeerId) -> bool {
        self.blacklist.contains_key(peer_id)
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<&PeerInfo> {
        self.peers.get(peer_id)
    }

    pub fn connected_peer_ids(&self) -> impl Iterator<Item = &PeerId> {
        self.peers
            .iter()
            .filter(|(_, info)| info.connection_state == ConnectionState::Connected)
            .map(|(id, _)| id)
    }

    pub fn connected_peer_count(&self) -> usize {
        self.peers
            .values()
            .filter(|info| info.connection_state == ConnectionState::Connected)
            .count()
    }

    /// Registers a newly-connected peer. Refuses (returning `false`) if the peer is currently
    /// blacklisted.
    pub fn on_connect(&mut self, peer_id: PeerId, direction: ConnectionDirection) -> bool {
        if self.is_blacklisted(&peer_id) {
            return false;
        }
        let info = self
            .peers
            .entry(peer_id)
            .or_insert_with(|| PeerInfo::new(direction, DEFAULT_REQUEST_QUOTA));
        info.connection_state = ConnectionState::Connected;
        true
    }

    /// Marks a peer disconnected and, unless it's an ordinary shutdown-free disconnect, places it
    /// in the blacklist for the reason's configured duration.
    pub fn on_disconnect(&mut self, peer_id: &PeerId, reason: DisconnectReason) {
        if let Some(info) = self.peers.get_mut(peer_id) {
            info.connection_state = ConnectionState::Disconnected;
        }
        self.blacklist
            .insert_at(peer_id.clone(), reason.blacklist_duration());
    }

    /// Applies a score delta (spec.md §4.8: subtract on violations, cap on good responses).
    /// Returns the disconnect reason if the peer's score just crossed the ban floor.
    pub fn apply_score_delta(&mut self, peer_id: &PeerId, delta: f64) -> Option<DisconnectReason> {
        let info = self.peers.get_mut(peer_id)?;
        info.score.apply(delta);
        if info.score.is_banned() {
            Some(DisconnectReason::LowScore)
        } else {
            None
        }
    }

    pub fn score(&self, peer_id: &PeerId) -> Score {
        self.peers
            .get(peer_id)
            .map(|info| info.score)
            .unwrap_or_default()
    }

    pub fn update_subnets(&mut self, peer_id: &PeerId, subnets: Vec<u64>) {
        if let Some(info) = self.peers.get_mut(peer_id) {
            info.subnets = subnets;
            info.metadata_failures = 0;
        }
    }

    pub fn record_metadata_failure(&mut self, peer_id: &PeerId) -> u32 {
        match self.peers.get_mut(peer_id) {
            Some(info) => {
                info.metadata_failures += 1;
                info.metadata_failures
            }
            None => 0,
        }
    }

    /// Peers covering `subnet_id`, least-recently-useful first is not tracked here (no
    /// last-seen timestamp beyond `last_request_time`) — the trimmer uses this to decide who to
    /// keep when it must shed connections to get back under `hard_max_peers`.
    pub fn peers_on_subnet(&self, subnet_id: u64) -> Vec<PeerId> {
        self.peers
            .iter()
            .filter(|(_, info)| {
                info.connection_state == ConnectionState::Connected
                    && info.subnets.contains(&subnet_id)
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Connected peers not covering any of `subscribed_subnets`, lowest score first — the
    /// trimmer's preferred eviction order (spec.md §4.8: "preferring to retain peers covering
    /// under-subscribed gossip subnets").
    pub fn trim_candidates(&self, subscribed_subnets: &[u64]) -> Vec<PeerId> {
        let mut candidates: Vec<(PeerId, f64, bool)> = self
            .peers
            .iter()
            .filter(|(_, info)| info.connection_state == ConnectionState::Connected)
            .map(|(id, info)| {
                let covers_subnet = info.subnets.iter().any(|s| subscribed_subnets.contains(s));
                (id.clone(), info.score.value(), covers_subnet)
            })
            .collect();
        // Peers covering a subscribed subnet sort last (kept); within each group, lowest score first.
        candidates.sort_by(|a, b| {
            a.2.cmp(&b.2)
                .then(a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        });
        candidates.into_iter().map(|(id, _, _)| id).collect()
    }

    pub fn drain_expired_blacklist_entries(&mut self) {
        // HashSetDelay entries self-expire via Stream::poll_next; the peer manager drives that
        // poll and has no extra bookkeeping to do here beyond what on_disconnect already set up.
    }

    pub fn blacklist_mut(&mut self) -> &mut HashSetDelay<PeerId> {
        &mut self.blacklist
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blacklisted_peer_refused() {
        let mut db = PeerDb::new();
        let peer = PeerId::dummy(1);
        db.on_disconnect(&peer, DisconnectReason::Fault);
        assert!(!db.on_connect(peer, ConnectionDirection::Inbound));
    }

    #[test]
    fn score_floor_triggers_ban_reason() {
        let mut db = PeerDb::new();
        let peer = PeerId::dummy(2);
        db.on_connect(peer.clone(), ConnectionDirection::Outbound);
        assert!(db.apply_score_delta(&peer, -1000.0).is_some());
    }

    #[test]
    fn trim_candidates_prefers_keeping_subnet_coverage() {
        let mut db = PeerDb::new();
        let covers = PeerId::dummy(3);
        let bare = PeerId::dummy(4);
        db.on_connect(covers.clone(), ConnectionDirection::Outbound);
        db.on_connect(bare.clone(), ConnectionDirection::Outbound);
        db.update_subnets(&covers, vec![7]);

        let order = db.trim_candidates(&[7]);
        assert_eq!(order[0], bare);
        assert_eq!(order[1], covers);
    }
}

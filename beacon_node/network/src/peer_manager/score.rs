//! Peer scoring (spec.md §4.8). A positive baseline that violations subtract from and good
//! responses cap back up towards; crossing the floor triggers a disconnect and a
//! reason-dependent blacklist timeout.

use std::time::Duration;

/// New peers, and peers the local operator has explicitly trusted, start here.
pub const DEFAULT_SCORE: f64 = 0.0;
/// Below this, the peer manager disconnects and blacklists.
pub const MIN_SCORE: f64 = -100.0;
/// Good responses are capped here; scoring up doesn't erase a history of violations instantly.
pub const MAX_SCORE: f64 = 100.0;

/// Why a peer was disconnected; determines the blacklist ("seen table") expiry applied and the
/// on-wire reason code sent per spec.md §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// This node is shutting down.
    ClientShutdown,
    /// The peer is on a different fork / network.
    IrrelevantNetwork,
    /// The peer sent a malformed or protocol-violating message.
    Fault,
    /// The peer's score fell below [`MIN_SCORE`].
    LowScore,
}

impl DisconnectReason {
    /// On-wire disconnect reason byte (spec.md §6).
    pub fn as_u8(&self) -> u8 {
        match self {
            DisconnectReason::ClientShutdown => 1,
            DisconnectReason::IrrelevantNetwork => 2,
            DisconnectReason::Fault => 3,
            DisconnectReason::LowScore => 237,
        }
    }

    /// How long the peer is kept in the blacklist ("seen table") before it can be dialed again.
    pub fn blacklist_duration(&self) -> Duration {
        match self {
            DisconnectReason::ClientShutdown => Duration::from_secs(10 * 60),
            DisconnectReason::Fault => Duration::from_secs(10 * 60),
            DisconnectReason::IrrelevantNetwork => Duration::from_secs(24 * 60 * 60),
            DisconnectReason::LowScore => Duration::from_secs(60 * 60),
        }
    }
}

/// A single peer's running score, with the floor/ceiling behaviour spec.md §4.8 describes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score(f64);

impl Default for Score {
    fn default() -> Self {
        Score(DEFAULT_SCORE)
    }
}

impl Score {
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Applies `delta`, clamped to `[MIN_SCORE, MAX_SCORE]`. Negative deltas are violations,
    /// positive deltas are good responses.
    pub fn apply(&mut self, delta: f64) {
        self.0 = (self.0 + delta).clamp(MIN_SCORE, MAX_SCORE);
    }

    /// `true` once the score has crossed the disconnect floor.
    pub fn is_banned(&self) -> bool {
        self.0 <= MIN_SCORE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_to_floor_and_ceiling() {
        let mut score = Score::default();
        score.apply(-1000.0);
        assert_eq!(score.value(), MIN_SCORE);
        assert!(score.is_banned());

        let mut score = Score::default();
        score.apply(1000.0);
        assert_eq!(score.value(), MAX_SCORE);
    }

    #[test]
    fn reasons_carry_distinct_timeouts() {
        assert_eq!(
            DisconnectReason::IrrelevantNetwork.blacklist_duration(),
            Duration::from_secs(24 * 60 * 60)
        );
        assert_eq!(DisconnectReason::ClientShutdown.as_u8(), 1);
        assert_eq!(DisconnectReason::LowScore.as_u8(), 237);
    }
}

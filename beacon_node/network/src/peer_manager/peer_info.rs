//! Per-peer bookkeeping (spec.md §4.8): connection lifecycle, score, and the request quota the
//! wire-protocol rate limiter draws down.

use super::score::Score;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionDirection {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Known (e.g. from discovery or an ENR), never dialed or connected.
    None,
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
}

/// Everything the peer manager tracks about one peer.
#[derive(Debug, Clone)]
pub struct PeerInfo {
    pub direction: ConnectionDirection,
    pub score: Score,
    /// Bytes/sec, exponentially averaged over request/response throughput.
    pub throughput_avg: f64,
    pub connection_state: ConnectionState,
    /// Remaining request budget in the current window; wire-protocol requests draw this down.
    pub request_quota: f64,
    pub last_request_time: Option<Instant>,
    /// Attestation/sync subnets this peer advertises via its `MetaData`, refreshed by the
    /// metadata pinger.
    pub subnets: Vec<u64>,
    pub metadata_failures: u32,
}

impl PeerInfo {
    pub fn new(direction: ConnectionDirection, request_quota: f64) -> Self {
        PeerInfo {
            direction,
            score: Score::default(),
            throughput_avg: 0.0,
            connection_state: ConnectionState::Connecting,
            request_quota,
            last_request_time: None,
            subnets: Vec::new(),
            metadata_failures: 0,
        }
    }

    /// Exponential moving average with a fixed smoothing factor, folding a freshly observed
    /// `bytes_per_sec` sample into the running throughput estimate.
    pub fn record_throughput(&mut self, bytes_per_sec: f64) {
        const ALPHA: f64 = 0.2;
        self.throughput_avg = ALPHA * bytes_per_sec + (1.0 - ALPHA) * self.throughput_avg;
    }

    /// Consumes one unit of request quota if available, recording the request time. Returns
    /// `false` if the peer has exhausted its quota and the request should be refused.
    pub fn try_consume_request_quota(&mut self, now: Instant) -> bool {
        if self.request_quota < 1.0 {
            return false;
        }
        self.request_quota -= 1.0;
        self.last_request_time = Some(now);
        true
    }

    /// Replenishes the quota up to `max`, at `rate` units per `period` elapsed since the last
    /// refill (called on a fixed tick by the peer manager).
    pub fn refill_quota(&mut self, rate: f64, period: Duration, elapsed: Duration, max: f64) {
        let periods = elapsed.as_secs_f64() / period.as_secs_f64();
        self.request_quota = (self.request_quota + rate * periods).min(max);
    }
}

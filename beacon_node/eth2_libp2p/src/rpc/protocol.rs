//! Request/response protocol identifiers, per spec.md §6:
//! `/eth2/beacon_chain/req/<name>/<version>/ssz_snappy`.

use std::fmt;
use std::time::Duration;

/// TTFB: time allowed to wait for the first byte of a response. Whole-response: time allowed for
/// the entire response to arrive once it has started. Both are per-protocol since larger requests
/// (`BlocksByRange`) are allowed longer to complete than small ones (`Ping`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Status,
    Goodbye,
    BlocksByRange,
    BlocksByRoot,
    Ping,
    MetaData,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Status => "status",
            Protocol::Goodbye => "goodbye",
            Protocol::BlocksByRange => "beacon_blocks_by_range",
            Protocol::BlocksByRoot => "beacon_blocks_by_root",
            Protocol::Ping => "ping",
            Protocol::MetaData => "metadata",
        }
    }

    pub fn version(&self) -> &'static str {
        "1"
    }

    /// Whether a response to this request carries a 4-byte fork-digest context before its
    /// ssz_snappy payload (true for any response whose type can vary by fork).
    pub fn has_context_bytes(&self) -> bool {
        matches!(self, Protocol::BlocksByRange | Protocol::BlocksByRoot)
    }

    pub fn ttfb_timeout(&self) -> Duration {
        match self {
            Protocol::BlocksByRange | Protocol::BlocksByRoot => Duration::from_secs(10),
            _ => Duration::from_secs(5),
        }
    }

    pub fn response_timeout(&self) -> Duration {
        match self {
            Protocol::BlocksByRange | Protocol::BlocksByRoot => Duration::from_secs(20),
            _ => Duration::from_secs(10),
        }
    }

    /// Whether this protocol's responses are a stream of multiple chunks (rather than exactly
    /// one response chunk).
    pub fn is_multiple_responses(&self) -> bool {
        matches!(self, Protocol::BlocksByRange | Protocol::BlocksByRoot)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/eth2/beacon_chain/req/{}/{}/ssz_snappy",
            self.as_str(),
            self.version()
        )
    }
}

pub const STREAM_OPEN_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_RPC_SIZE: usize = 1_048_576 * 10;

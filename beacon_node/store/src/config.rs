use serde_derive::{Deserialize, Serialize};

/// Tunables for [`crate::HotColdDB`], independent of the on-disk schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// States at a slot that is a multiple of this are written as full restore points
    /// (`BeaconState` column); every other slot's state is written as a diff against the
    /// nearest earlier restore point (`BeaconStateDiff` column). Matches §4.2's "states may be
    /// stored sparsely (every epoch boundary; diffs between)".
    pub slots_per_restore_point: u64,
    /// Compress blocks with Snappy before writing (§4.2: frame-less for phase0/altair, framed
    /// for bellatrix+). Disabled only for the in-memory test backend.
    pub compression: bool,
    /// Capacity of the in-process block/state LRU caches sitting in front of the KV backend.
    pub block_cache_size: usize,
    pub state_cache_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            slots_per_restore_point: 32 * 32, // 32 epochs at mainnet's 32 slots/epoch
            compression: true,
            block_cache_size: 5,
            state_cache_size: 5,
        }
    }
}

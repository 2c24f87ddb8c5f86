//! The sliding window itself (spec.md §4.10): a `[from_slot, to_slot]` range advancing either
//! head-ward (`Forward`) or genesis-ward (`Backward`), requested in fixed-size chunks, with
//! out-of-order chunk responses buffered until they become contiguous.

use std::collections::BTreeMap;
use types::{EthSpec, SignedBeaconBlock, Slot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    /// Advancing towards the head of the chain.
    Forward,
    /// Backfilling towards genesis or a weak-subjectivity checkpoint.
    Backward,
}

/// A `[from_slot, to_slot]` range currently being synced, plus the out-of-order buffer of chunk
/// responses that have arrived ahead of the slot the window is actually waiting on.
pub struct SlidingWindow<E: EthSpec> {
    pub direction: SyncDirection,
    pub chunk_size: u64,
    /// The slot the window is currently waiting to receive contiguously.
    pub cursor: Slot,
    /// The far end of the window (head-ward target, or the genesis/WS-checkpoint floor).
    pub target: Slot,
    /// Chunk responses keyed by their start slot, buffered until `cursor` reaches them.
    buffered: BTreeMap<Slot, Vec<SignedBeaconBlock<E>>>,
}

impl<E: EthSpec> SlidingWindow<E> {
    pub fn new(direction: SyncDirection, cursor: Slot, target: Slot, chunk_size: u64) -> Self {
        SlidingWindow {
            direction,
            chunk_size,
            cursor,
            target,
            buffered: BTreeMap::new(),
        }
    }

    /// `true` once the window has reached its target and there's nothing buffered left to drain.
    pub fn is_complete(&self) -> bool {
        self.buffered.is_empty()
            && match self.direction {
                SyncDirection::Forward => self.cursor >= self.target,
                SyncDirection::Backward => self.cursor <= self.target,
            }
    }

    /// The `[from, to]` slot range for the next chunk request this window should send.
    pub fn next_request_range(&self) -> (Slot, Slot) {
        match self.direction {
            SyncDirection::Forward => {
                let to = Slot::new((self.cursor.as_u64() + self.chunk_size).min(self.target.as_u64()));
                (self.cursor, to)
            }
            SyncDirection::Backward => {
                let from = Slot::new(self.cursor.as_u64().saturating_sub(self.chunk_size).max(self.target.as_u64()));
                (from, self.cursor)
            }
        }
    }

    /// Buffers a chunk response keyed by its start slot. Returns the blocks ready to import in
    /// slot order, advancing `cursor` past them, once the buffer becomes contiguous with
    /// `cursor`. A response whose start slot doesn't match any outstanding request is ignored by
    /// the caller before this is reached.
    pub fn on_chunk_response(&mut self, start_slot: Slot, blocks: Vec<SignedBeaconBlock<E>>) -> Vec<SignedBeaconBlock<E>> {
        self.buffered.insert(start_slot, blocks);
        self.drain_contiguous()
    }

    fn drain_contiguous(&mut self) -> Vec<SignedBeaconBlock<E>> {
        let mut out = Vec::new();
        loop {
            let next_key = match self.direction {
                SyncDirection::Forward => self.buffered.keys().next().copied().filter(|&k| k == self.cursor),
                SyncDirection::Backward => self.buffered.keys().next_back().copied().filter(|&k| {
                    // A backward chunk's start slot is `cursor - chunk_size`; it's contiguous once
                    // its end reaches the current cursor.
                    k <= self.cursor
                }),
            };
            let Some(key) = next_key else { break };
            let Some(blocks) = self.buffered.remove(&key) else { break };
            let advance_to = match self.direction {
                SyncDirection::Forward => blocks
                    .last()
                    .map(|b| b.message.slot() + 1)
                    .unwrap_or(self.cursor),
                SyncDirection::Backward => key,
            };
            out.extend(blocks);
            self.cursor = advance_to;
        }
        out
    }

    /// A gap or ordering violation was detected downstream (e.g. `process_chain_segment` returned
    /// `MissingParent` for a block this window thought was contiguous). Rewinds the cursor back to
    /// `last_contiguous_slot` and discards anything buffered past it, so the window re-requests
    /// the range it thought it already had (spec.md §4.10).
    pub fn rewind_to(&mut self, last_contiguous_slot: Slot) {
        self.cursor = last_contiguous_slot;
        self.buffered.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::MinimalEthSpec;

    #[test]
    fn forward_window_drains_in_order() {
        let mut window: SlidingWindow<MinimalEthSpec> =
            SlidingWindow::new(SyncDirection::Forward, Slot::new(0), Slot::new(100), 10);
        assert_eq!(window.next_request_range(), (Slot::new(0), Slot::new(10)));
        let drained = window.on_chunk_response(Slot::new(0), vec![]);
        assert!(drained.is_empty());
        // No blocks in the chunk means nothing to advance the cursor past; still waiting on slot 0.
        assert_eq!(window.cursor, Slot::new(0));
    }

    #[test]
    fn rewind_clears_buffer_and_resets_cursor() {
        let mut window: SlidingWindow<MinimalEthSpec> =
            SlidingWindow::new(SyncDirection::Forward, Slot::new(20), Slot::new(100), 10);
        window.buffered.insert(Slot::new(30), vec![]);
        window.rewind_to(Slot::new(15));
        assert_eq!(window.cursor, Slot::new(15));
        assert!(window.buffered.is_empty());
    }
}

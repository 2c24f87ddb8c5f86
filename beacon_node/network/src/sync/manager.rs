//! Drives a [`SlidingWindow`] against a concrete `BeaconChain`: turns chunk responses into
//! `process_chain_segment` calls, and rewinds the window on the first import failure in a batch
//! (spec.md §4.10).

use super::range_sync::{SlidingWindow, SyncDirection};
use crate::metrics;
use beacon_chain::{BeaconChain, BeaconChainTypes, BlockImportStatus};
use eth2_libp2p::{BlocksByRangeRequest, PeerId};
use slog::{debug, warn, Logger};
use std::sync::Arc;
use types::{EthSpec, Hash256, SignedBeaconBlock, Slot};

/// Requests/responses the sync manager reacts to. The router hands these in from gossip or RPC
/// events; `NetworkService` owns sending the corresponding `BlocksByRangeRequest` out over the
/// wire.
#[derive(Debug)]
pub enum SyncMessage<E: EthSpec> {
    /// An attestation or block referenced a block root we don't have; ask the peer for it.
    UnknownBlockHash(PeerId, Hash256),
    /// A `BlocksByRange` response chunk arrived.
    BlocksByRangeResponse {
        peer_id: PeerId,
        start_slot: Slot,
        blocks: Vec<SignedBeaconBlock<E>>,
    },
}

/// An outbound action the sync manager wants `NetworkService` to perform.
#[derive(Debug)]
pub enum SyncRequest {
    BlocksByRange(PeerId, BlocksByRangeRequest),
}

pub struct SyncManager<T: BeaconChainTypes> {
    chain: Arc<BeaconChain<T>>,
    window: Option<SlidingWindow<T::EthSpec>>,
    chunk_size: u64,
    log: Logger,
}

impl<T: BeaconChainTypes> SyncManager<T> {
    pub fn new(chain: Arc<BeaconChain<T>>, chunk_size: u64, log: Logger) -> Self {
        SyncManager {
            chain,
            window: None,
            chunk_size,
            log,
        }
    }

    /// Starts (or restarts) a forward sync up to `target`, from our current head.
    pub fn start_forward_sync(&mut self, target: Slot) -> Option<SyncRequest> {
        let head = self.chain.slot().unwrap_or(Slot::new(0));
        if head >= target {
            self.window = None;
            return None;
        }
        self.window = Some(SlidingWindow::new(SyncDirection::Forward, head, target, self.chunk_size));
        metrics::set_gauge(&metrics::SYNC_TARGET_SLOT, target.as_u64() as i64);
        None
    }

    /// Starts a backfill down to `floor` (genesis, or a weak-subjectivity checkpoint slot).
    pub fn start_backward_sync(&mut self, from: Slot, floor: Slot) {
        self.window = Some(SlidingWindow::new(SyncDirection::Backward, from, floor, self.chunk_size));
    }

    pub fn handle_message(&mut self, peer_id: PeerId, message: SyncMessage<T::EthSpec>) {
        match message {
            SyncMessage::UnknownBlockHash(peer_id, root) => {
                debug!(self.log, "Unknown block root, would request via sync"; "peer_id" => peer_id.to_string(), "root" => format!("{:?}", root));
            }
            SyncMessage::BlocksByRangeResponse {
                peer_id,
                start_slot,
                blocks,
            } => self.on_range_response(peer_id, start_slot, blocks),
        }
    }

    fn on_range_response(&mut self, peer_id: PeerId, start_slot: Slot, blocks: Vec<SignedBeaconBlock<T::EthSpec>>) {
        let Some(window) = self.window.as_mut() else {
            return;
        };
        let ready = window.on_chunk_response(start_slot, blocks);
        if ready.is_empty() {
            return;
        }

        let last_contiguous_slot = window.cursor.saturating_sub(Slot::new(1));
        let results = self.chain.process_chain_segment(ready);
        for result in &results {
            match result {
                Ok(BlockImportStatus::Imported(_)) => {}
                Ok(BlockImportStatus::Quarantined(_)) | Err(_) => {
                    warn!(
                        self.log,
                        "Sync batch import failed, rewinding window";
                        "peer_id" => peer_id.to_string(),
                    );
                    window.rewind_to(last_contiguous_slot);
                    metrics::inc_counter(&metrics::SYNC_REWINDS_TOTAL);
                    return;
                }
            }
        }

        metrics::set_gauge(&metrics::SYNC_HEAD_SLOT, window.cursor.as_u64() as i64);
        if window.is_complete() {
            self.window = None;
        }
    }

    pub fn is_syncing(&self) -> bool {
        self.window.is_some()
    }
}

use crate::{Hash256, Slot};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// `{slot, parent_root}` — the minimum needed to reconstruct the block DAG at startup without
/// loading full bodies (§3). Stored under `summaries: block_root -> BlockSummary`; the DAG
/// rebuild in `beacon_chain` walks this table backward from the head to the tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct BlockSummary {
    pub slot: Slot,
    pub parent_root: Hash256,
}

impl BlockSummary {
    pub fn new(slot: Slot, parent_root: Hash256) -> Self {
        Self { slot, parent_root }
    }
}

use crate::error::Error;
use crate::proto_array::{Block, ProtoArray};
use crate::ssz_container::SszContainer;
use parking_lot::RwLock;
use serde_derive::{Deserialize, Serialize};
use ssz::{Decode, Encode};
use ssz_derive::{Decode as SszDecode, Encode as SszEncode};
use std::collections::HashMap;
use types::{Epoch, Hash256, Slot};

pub use crate::proto_array::Block as ProtoBlock;

/// A Vec-backed container indexed by validator index, growing on demand rather than requiring
/// the caller to pre-size it to the validator registry.
#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
pub struct ElasticList<T>(pub Vec<T>);

impl<T> Default for ElasticList<T> {
    fn default() -> Self {
        Self(vec![])
    }
}

impl<T> ElasticList<T>
where
    T: Default + Clone,
{
    fn ensure(&mut self, i: usize) {
        if self.0.len() <= i {
            self.0.resize(i + 1, T::default());
        }
    }

    pub fn get_mut(&mut self, i: usize) -> &mut T {
        self.ensure(i);
        &mut self.0[i]
    }
}

/// The latest vote seen from a validator: the block it currently votes for, the block it will
/// switch its vote to on the next `process_attestation` call that supersedes `next_epoch`, and
/// the target epoch of that pending vote.
#[derive(Clone, Copy, PartialEq, Debug, Default, Serialize, Deserialize, SszEncode, SszDecode)]
pub struct VoteTracker {
    pub current_root: Hash256,
    pub next_root: Hash256,
    pub next_epoch: Epoch,
}

/// Wraps `ProtoArray` with the validator vote/balance bookkeeping the LMD-GHOST weight function
/// needs: `votes` is every validator's most recent attestation target, `balances` is the
/// justified-state effective balances used the last time `find_head` ran. The difference between
/// consecutive `balances` snapshots and vote changes is what `find_head` turns into node-weight
/// deltas.
pub struct ProtoArrayForkChoice {
    pub(crate) proto_array: RwLock<ProtoArray>,
    pub(crate) votes: RwLock<ElasticList<VoteTracker>>,
    pub(crate) balances: RwLock<Vec<u64>>,
}

impl PartialEq for ProtoArrayForkChoice {
    fn eq(&self, other: &Self) -> bool {
        *self.proto_array.read() == *other.proto_array.read()
            && *self.votes.read() == *other.votes.read()
            && *self.balances.read() == *other.balances.read()
    }
}

impl ProtoArrayForkChoice {
    pub fn new(
        finalized_block_slot: Slot,
        finalized_block_state_root: Hash256,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
        finalized_root: Hash256,
    ) -> Result<Self, String> {
        let mut proto_array = ProtoArray {
            prune_threshold: DEFAULT_PRUNE_THRESHOLD,
            ffg_update_required: false,
            justified_epoch,
            finalized_epoch,
            nodes: Vec::with_capacity(1),
            indices: HashMap::with_capacity(1),
        };

        proto_array
            .on_new_block(Block {
                slot: finalized_block_slot,
                root: finalized_root,
                parent_root: None,
                target_root: finalized_root,
                state_root: finalized_block_state_root,
                justified_epoch,
                finalized_epoch,
            })
            .map_err(|e| format!("Failed to add finalized block to proto_array: {:?}", e))?;

        Ok(Self {
            proto_array: RwLock::new(proto_array),
            votes: RwLock::new(ElasticList::default()),
            balances: RwLock::new(vec![]),
        })
    }

    /// Registers `block` with the DAG. Does not itself apply any votes; it exists so fork choice
    /// can find a just-imported block as a head candidate before any attestation references it.
    pub fn process_block(&self, block: Block) -> Result<(), String> {
        if block.parent_root.is_none() {
            return Err("Block must have a parent root, only the finalized block can be parentless".to_string());
        }

        self.proto_array
            .write()
            .on_new_block(block)
            .map_err(|e| format!("process_block_error: {:?}", e))
    }

    /// Records that `validator_index` has attested to `block_root` as its target for
    /// `target_epoch`. The vote does not affect node weights until the next `find_head` call.
    pub fn process_attestation(
        &self,
        validator_index: usize,
        block_root: Hash256,
        target_epoch: Epoch,
    ) -> Result<(), String> {
        let mut votes = self.votes.write();
        let vote = votes.get_mut(validator_index);

        if target_epoch > vote.next_epoch || *vote == VoteTracker::default() {
            vote.next_root = block_root;
            vote.next_epoch = target_epoch;
        }

        Ok(())
    }

    /// Runs the LMD-GHOST weight function and returns the new head.
    ///
    /// `justified_balances` is the effective-balance vector of the state identified by
    /// `justified_root`; it becomes `self.balances` for the next call, against which the
    /// following call's balances are diffed.
    pub fn find_head(
        &self,
        justified_epoch: Epoch,
        justified_root: Hash256,
        finalized_epoch: Epoch,
        justified_balances: &[u64],
    ) -> Result<Hash256, String> {
        let mut proto_array = self.proto_array.write();
        let mut votes = self.votes.write();
        let mut old_balances = self.balances.write();

        let deltas = compute_deltas(
            &proto_array.indices,
            &mut votes,
            &old_balances,
            justified_balances,
        )
        .map_err(|e| format!("find_head compute_deltas failed: {:?}", e))?;

        proto_array
            .apply_score_changes(deltas, justified_epoch, finalized_epoch)
            .map_err(|e| format!("find_head apply_score_changes failed: {:?}", e))?;

        *old_balances = justified_balances.to_vec();

        proto_array
            .find_head(&justified_root)
            .map_err(|e| format!("find_head failed: {:?}", e))
    }

    pub fn maybe_prune(&self, finalized_root: Hash256) -> Result<(), String> {
        self.proto_array
            .write()
            .maybe_prune(finalized_root)
            .map_err(|e| format!("find_head maybe_prune failed: {:?}", e))
    }

    pub fn set_prune_threshold(&self, prune_threshold: usize) {
        self.proto_array.write().prune_threshold = prune_threshold;
    }

    pub fn len(&self) -> usize {
        self.proto_array.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_block(&self, block_root: &Hash256) -> bool {
        self.proto_array.read().indices.contains_key(block_root)
    }

    pub fn get_block(&self, block_root: &Hash256) -> Option<Block> {
        let proto_array = self.proto_array.read();
        let i = *proto_array.indices.get(block_root)?;
        let node = proto_array.nodes.get(i)?;

        let parent_root = node
            .parent
            .and_then(|parent_index| proto_array.nodes.get(parent_index))
            .map(|parent| parent.root);

        Some(Block {
            slot: node.slot,
            root: node.root,
            parent_root,
            target_root: node.target_root,
            state_root: node.state_root,
            justified_epoch: node.justified_epoch,
            finalized_epoch: node.finalized_epoch,
        })
    }

    /// Returns the latest-known vote target for `validator_index`, if any vote was ever
    /// registered for it.
    pub fn latest_message(&self, validator_index: usize) -> Option<(Hash256, Epoch)> {
        let votes = self.votes.read();

        if validator_index >= votes.0.len() {
            return None;
        }

        let vote = votes.0[validator_index];
        if vote == VoteTracker::default() {
            None
        } else {
            Some((vote.next_root, vote.next_epoch))
        }
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        SszContainer::from(self).as_ssz_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        let container = SszContainer::from_ssz_bytes(bytes)
            .map_err(|e| format!("Failed to decode ProtoArrayForkChoice bytes: {:?}", e))?;
        Ok(container.into())
    }
}

/// Do not attempt to prune the tree unless it has at least this many nodes. Small prunes simply
/// waste time.
const DEFAULT_PRUNE_THRESHOLD: usize = 256;

/// Converts `votes` and the balance diff into per-node weight deltas, in the indexing space of
/// `indices` (i.e. `deltas[indices[&root]]`).
///
/// ## Specification
///
/// Equivalent to `compute_deltas` in the LMD-GHOST fork choice reference implementation: every
/// validator's weight is removed from the node it voted for last round and added to the node it
/// votes for this round (which may be the same node, in which case only a balance change shows
/// up as a delta).
fn compute_deltas(
    indices: &HashMap<Hash256, usize>,
    votes: &mut ElasticList<VoteTracker>,
    old_balances: &[u64],
    new_balances: &[u64],
) -> Result<Vec<i64>, Error> {
    let mut deltas = vec![0_i64; indices.len()];

    for val_index in 0..votes.0.len() {
        let vote = &mut votes.0[val_index];

        // There is no need to create a delta for the zero-hash alias.
        if vote.current_root == Hash256::zero() && vote.next_root == Hash256::zero() {
            continue;
        }

        let old_balance = old_balances.get(val_index).copied().unwrap_or(0);
        let new_balance = new_balances.get(val_index).copied().unwrap_or(0);

        if vote.current_root != vote.next_root || old_balance != new_balance {
            if let Some(current_delta_index) = indices.get(&vote.current_root) {
                let delta = deltas
                    .get_mut(*current_delta_index)
                    .ok_or(Error::InvalidNodeDelta(*current_delta_index))?;
                *delta -= old_balance as i64;
            }

            if let Some(next_delta_index) = indices.get(&vote.next_root) {
                let delta = deltas
                    .get_mut(*next_delta_index)
                    .ok_or(Error::InvalidNodeDelta(*next_delta_index))?;
                *delta += new_balance as i64;
            }

            vote.current_root = vote.next_root;
        }
    }

    Ok(deltas)
}

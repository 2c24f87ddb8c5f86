//! C6: holding pen for blocks whose parent hasn't arrived yet. Bounded so a malicious peer can't
//! grow it without limit; once full, the oldest entry (by insertion order) is evicted to make
//! room, mirroring `beacon_chain::naive_aggregation_pool`'s own "cap it, evict the oldest" shape
//! for a different kind of unbounded-input problem.

use std::collections::HashMap;
use types::{EthSpec, Hash256, SignedBeaconBlock};

/// Above this many queued blocks, the oldest entry is evicted before a new one is admitted.
pub const DEFAULT_MAX_QUARANTINED: usize = 256;

pub struct Quarantine<E: EthSpec> {
    /// root -> the block itself, keyed by its own root.
    blocks: HashMap<Hash256, SignedBeaconBlock<E>>,
    /// parent_root -> every queued child waiting on it, for O(children) draining instead of a
    /// full scan when the parent finally arrives.
    children_of: HashMap<Hash256, Vec<Hash256>>,
    /// Insertion order, oldest first, for eviction.
    order: Vec<Hash256>,
    max_len: usize,
}

impl<E: EthSpec> Quarantine<E> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_QUARANTINED)
    }

    pub fn with_capacity(max_len: usize) -> Self {
        Self {
            blocks: HashMap::new(),
            children_of: HashMap::new(),
            order: Vec::new(),
            max_len,
        }
    }

    pub fn contains(&self, root: &Hash256) -> bool {
        self.blocks.contains_key(root)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Queues `block` under its own root, indexed by its parent so it can be found again once
    /// that parent is imported. If the quarantine is already at capacity, the single oldest entry
    /// is dropped first.
    pub fn insert(&mut self, root: Hash256, block: SignedBeaconBlock<E>) {
        if self.blocks.contains_key(&root) {
            return;
        }
        if self.order.len() >= self.max_len {
            if let Some(evicted) = self.order.first().copied() {
                self.remove(&evicted);
            }
        }
        let parent_root = block.message.parent_root();
        self.children_of.entry(parent_root).or_default().push(root);
        self.blocks.insert(root, block);
        self.order.push(root);
    }

    fn remove(&mut self, root: &Hash256) -> Option<SignedBeaconBlock<E>> {
        let block = self.blocks.remove(root)?;
        self.order.retain(|r| r != root);
        let parent_root = block.message.parent_root();
        if let Some(children) = self.children_of.get_mut(&parent_root) {
            children.retain(|r| r != root);
            if children.is_empty() {
                self.children_of.remove(&parent_root);
            }
        }
        Some(block)
    }

    /// Removes and returns every block directly waiting on `parent_root`, in the order they
    /// arrived, so the caller can import them in causal order as each newly-imported child
    /// potentially unblocks its own children in turn.
    pub fn drain_children(&mut self, parent_root: Hash256) -> Vec<(Hash256, SignedBeaconBlock<E>)> {
        let roots = self.children_of.remove(&parent_root).unwrap_or_default();
        roots
            .into_iter()
            .filter_map(|root| self.remove(&root).map(|block| (root, block)))
            .collect()
    }

    /// Drops every queued block descending (even indirectly) from `root`, because `root` turned
    /// out to be unviable and nothing quarantined behind it can ever be imported either.
    pub fn discard_descendants(&mut self, root: Hash256) {
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            let children = self.children_of.remove(&current).unwrap_or_default();
            for child_root in children {
                self.blocks.remove(&child_root);
                self.order.retain(|r| *r != child_root);
                stack.push(child_root);
            }
        }
    }
}

impl<E: EthSpec> Default for Quarantine<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{ChainSpec, MainnetEthSpec};

    type E = MainnetEthSpec;

    fn block_with_parent(parent_root: Hash256) -> SignedBeaconBlock<E> {
        let spec = ChainSpec::mainnet();
        let mut block = types::BeaconBlock::empty(&spec);
        *block.parent_root_mut() = parent_root;
        SignedBeaconBlock {
            message: block,
            signature: types::Signature::empty(),
        }
    }

    #[test]
    fn drains_children_of_newly_known_parent() {
        let mut q = Quarantine::<E>::new();
        let parent = Hash256::from_slice(&[1; 32]);
        let child_root = Hash256::from_slice(&[2; 32]);
        q.insert(child_root, block_with_parent(parent));
        assert_eq!(q.len(), 1);

        let drained = q.drain_children(parent);
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].0, child_root);
        assert!(q.is_empty());
    }

    #[test]
    fn eviction_drops_oldest_when_full() {
        let mut q = Quarantine::<E>::with_capacity(1);
        let parent = Hash256::from_slice(&[9; 32]);
        let first = Hash256::from_slice(&[1; 32]);
        let second = Hash256::from_slice(&[2; 32]);
        q.insert(first, block_with_parent(parent));
        q.insert(second, block_with_parent(parent));
        assert_eq!(q.len(), 1);
        assert!(!q.contains(&first));
        assert!(q.contains(&second));
    }

    #[test]
    fn discarding_descendants_removes_the_whole_subtree() {
        let mut q = Quarantine::<E>::new();
        let root = Hash256::from_slice(&[1; 32]);
        let child = Hash256::from_slice(&[2; 32]);
        let grandchild = Hash256::from_slice(&[3; 32]);
        q.insert(child, block_with_parent(root));
        q.insert(grandchild, block_with_parent(child));

        q.discard_descendants(root);
        assert!(q.is_empty());
    }
}

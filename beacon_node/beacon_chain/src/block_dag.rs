//! C4: the in-memory block DAG. Every viable block the node has imported is a node here, reachable
//! from the finalized tail. Unlike fork choice (C5), which forgets everything except the winning
//! path, this structure remembers every branch until it is pruned at finalization, so that
//! `is_ancestor_of`/`get_ancestor_at_slot` work for any block still within the unfinalized window.
//!
//! Rebuilt on startup by walking `store`'s blocks backward from the persisted head to the
//! persisted finalized root; the DAG itself is never separately persisted. Nodes are kept as
//! `types::BlockSummary` (`{slot, parent_root}`, the pre-existing `block_root -> BlockSummary`
//! shape documented on that type) rather than a bespoke struct, with the root itself carried only
//! as the map key.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use store::Store;
use types::{BlockSummary, EthSpec, Hash256, SignedBeaconBlock, Slot};

#[derive(Debug)]
pub enum Error {
    /// The parent block is not known to the DAG or the underlying store.
    MissingParent(Hash256),
    /// The block is already present.
    Duplicate(Hash256),
    /// The block conflicts with an already-finalized block and can never become canonical.
    Unviable,
    DBError(store::Error),
}

impl From<store::Error> for Error {
    fn from(e: store::Error) -> Self {
        Error::DBError(e)
    }
}

pub struct BlockDag<E: EthSpec> {
    nodes: HashMap<Hash256, BlockSummary>,
    /// Roots with no known child, i.e. every tip of every branch.
    heads: HashSet<Hash256>,
    /// Roots that fork-conflict with a finalized block (or descend from one) and must never be
    /// reprocessed, recorded so a re-gossiped copy is rejected without running state transition.
    unviable: HashSet<Hash256>,
    finalized_root: Hash256,
    _phantom: std::marker::PhantomData<E>,
}

impl<E: EthSpec> BlockDag<E> {
    pub fn new(finalized_root: Hash256, finalized_block: BlockSummary) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(finalized_root, finalized_block);
        let mut heads = HashSet::new();
        heads.insert(finalized_root);
        Self {
            nodes,
            heads,
            unviable: HashSet::new(),
            finalized_root,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Rebuilds the DAG on startup by walking backward from `head_root` through `store` until
    /// `finalized_root` (inclusive) is reached.
    pub fn rebuild<S: Store<E>>(
        store: &Arc<S>,
        head_root: Hash256,
        finalized_root: Hash256,
    ) -> Result<Self, Error> {
        let finalized_summary = block_summary(store, finalized_root)?;
        let mut dag = Self::new(finalized_root, finalized_summary);

        let mut chain = Vec::new();
        let mut cursor = head_root;
        while cursor != finalized_root {
            let summary = block_summary(store, cursor)?;
            let parent_root = summary.parent_root;
            chain.push((cursor, summary));
            cursor = parent_root;
        }

        // Insert in ancestor-to-descendant order so every parent is already present.
        for (root, summary) in chain.into_iter().rev() {
            dag.insert(root, summary)?;
        }

        Ok(dag)
    }

    fn insert(&mut self, root: Hash256, block: BlockSummary) -> Result<(), Error> {
        if self.nodes.contains_key(&root) {
            return Err(Error::Duplicate(root));
        }
        if !self.nodes.contains_key(&block.parent_root) {
            return Err(Error::MissingParent(block.parent_root));
        }
        if self.unviable.contains(&block.parent_root) {
            self.unviable.insert(root);
            return Err(Error::Unviable);
        }

        self.heads.remove(&block.parent_root);
        self.heads.insert(root);
        self.nodes.insert(root, block);
        Ok(())
    }

    /// Adds a block whose parent is already known. Returns `Error::MissingParent` if it isn't —
    /// the caller (block import) is expected to route those into the quarantine (C6) instead.
    pub fn add_block(&mut self, root: Hash256, slot: Slot, parent_root: Hash256) -> Result<(), Error> {
        if self.unviable.contains(&root) {
            return Err(Error::Unviable);
        }
        self.insert(root, BlockSummary::new(slot, parent_root))
    }

    pub fn contains(&self, root: &Hash256) -> bool {
        self.nodes.contains_key(root)
    }

    pub fn is_unviable(&self, root: &Hash256) -> bool {
        self.unviable.contains(root)
    }

    /// Marks `root` and every block that transitively descends from it as unviable, e.g. because
    /// `root` turned out to conflict with the finalized chain.
    pub fn mark_unviable_with_descendants(&mut self, root: Hash256) {
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            self.unviable.insert(current);
            let children: Vec<Hash256> = self
                .nodes
                .iter()
                .filter(|(_, summary)| summary.parent_root == current)
                .map(|(root, _)| *root)
                .collect();
            stack.extend(children);
        }
    }

    /// Walks parent pointers from `block_root` until it finds the ancestor at `ancestor_slot`
    /// (or the highest ancestor below it, if `ancestor_slot` was skipped).
    pub fn get_ancestor_at_slot(&self, block_root: Hash256, ancestor_slot: Slot) -> Option<Hash256> {
        let mut cursor_root = block_root;
        let mut cursor = self.nodes.get(&cursor_root)?;
        loop {
            if cursor.slot <= ancestor_slot || cursor_root == self.finalized_root {
                return Some(cursor_root);
            }
            cursor_root = cursor.parent_root;
            cursor = self.nodes.get(&cursor_root)?;
        }
    }

    /// True if `ancestor_root` is `descendant_root` itself or appears somewhere on its chain of
    /// parents.
    pub fn is_ancestor_of(&self, ancestor_root: Hash256, descendant_root: Hash256) -> bool {
        let mut cursor = descendant_root;
        loop {
            if cursor == ancestor_root {
                return true;
            }
            match self.nodes.get(&cursor) {
                Some(summary) if cursor != summary.parent_root => cursor = summary.parent_root,
                _ => return false,
            }
        }
    }

    /// Every block with no known child: the tip of every branch the DAG currently holds.
    pub fn heads(&self) -> Vec<Hash256> {
        self.heads.iter().copied().collect()
    }

    pub fn get(&self, root: &Hash256) -> Option<&BlockSummary> {
        self.nodes.get(root)
    }

    /// Drops every block not a descendant of `new_finalized_root`, and re-roots the DAG there.
    /// Mirrors §4.4's "prune_to" contract: anything on a competing branch, however deep, is
    /// forgotten rather than merely marked unviable, since it can never be reprocessed anyway once
    /// it is behind finality.
    pub fn prune_to(&mut self, new_finalized_root: Hash256) {
        let keep: HashSet<Hash256> = self
            .nodes
            .keys()
            .filter(|root| self.is_ancestor_of(new_finalized_root, **root))
            .copied()
            .collect();

        self.nodes.retain(|root, _| keep.contains(root));
        self.heads.retain(|root| keep.contains(root));
        self.unviable.retain(|root| keep.contains(root));
        self.finalized_root = new_finalized_root;
    }
}

fn block_summary<E: EthSpec, S: Store<E>>(
    store: &Arc<S>,
    root: Hash256,
) -> Result<BlockSummary, Error> {
    let block: SignedBeaconBlock<E> = store
        .get_block(&root)?
        .ok_or(Error::MissingParent(root))?;
    Ok(BlockSummary::new(block.message.slot(), block.message.parent_root()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::MainnetEthSpec;

    type E = MainnetEthSpec;

    fn root(byte: u8) -> Hash256 {
        Hash256::from_slice(&[byte; 32])
    }

    fn dag() -> BlockDag<E> {
        BlockDag::new(root(0), BlockSummary::new(Slot::new(0), Hash256::zero()))
    }

    #[test]
    fn linear_chain_ancestry() {
        let mut dag = dag();
        dag.add_block(root(1), Slot::new(1), root(0)).unwrap();
        dag.add_block(root(2), Slot::new(2), root(1)).unwrap();

        assert!(dag.is_ancestor_of(root(0), root(2)));
        assert!(dag.is_ancestor_of(root(1), root(2)));
        assert!(!dag.is_ancestor_of(root(2), root(1)));
        assert_eq!(dag.get_ancestor_at_slot(root(2), Slot::new(1)), Some(root(1)));
        assert_eq!(dag.heads(), vec![root(2)]);
    }

    #[test]
    fn missing_parent_is_rejected() {
        let mut dag = dag();
        let err = dag.add_block(root(5), Slot::new(1), root(99));
        assert!(matches!(err, Err(Error::MissingParent(_))));
    }

    #[test]
    fn fork_produces_two_heads() {
        let mut dag = dag();
        dag.add_block(root(1), Slot::new(1), root(0)).unwrap();
        dag.add_block(root(2), Slot::new(1), root(0)).unwrap();
        let mut heads = dag.heads();
        heads.sort();
        let mut expected = vec![root(1), root(2)];
        expected.sort();
        assert_eq!(heads, expected);
    }

    #[test]
    fn prune_drops_the_losing_branch() {
        let mut dag = dag();
        dag.add_block(root(1), Slot::new(1), root(0)).unwrap();
        dag.add_block(root(2), Slot::new(1), root(0)).unwrap();
        dag.add_block(root(3), Slot::new(2), root(1)).unwrap();

        dag.prune_to(root(1));
        assert!(dag.contains(&root(1)));
        assert!(dag.contains(&root(3)));
        assert!(!dag.contains(&root(2)));
    }

    #[test]
    fn marking_unviable_propagates_to_descendants() {
        let mut dag = dag();
        dag.add_block(root(1), Slot::new(1), root(0)).unwrap();
        dag.add_block(root(2), Slot::new(2), root(1)).unwrap();
        dag.mark_unviable_with_descendants(root(1));
        assert!(dag.is_unviable(&root(1)));
        assert!(dag.is_unviable(&root(2)));
    }
}
